//! Request dispatch.
//!
//! [`Http`] maps exact `(method, path)` routes to handlers and falls back to
//! serving pre-compressed static files from a document root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::http::error::HttpError;
use crate::http::mime::MimeType;
use crate::http::request::{Method, Request, Route};
use crate::http::response::{FileBody, Response, ResponseBuilder, StatusCode};

/// Where static documents live unless configured otherwise.
pub const DEFAULT_WWW_ROOT: &str = "/www";

const STATIC_PREFIXES: [&str; 4] = ["/css", "/js", "/favicon", "/img"];

/// A registered route handler.
///
/// Returning an [`HttpError`] (through `anyhow`) answers with that error's
/// status; any other error is answered with 500.
pub type Handler = Box<dyn Fn(&Request) -> anyhow::Result<Response> + Send + Sync>;

/// The router and static file server.
pub struct Http {
    handlers: HashMap<Route, Handler>,
    www_root: PathBuf,
}

impl Default for Http {
    fn default() -> Self {
        Self::new()
    }
}

impl Http {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            www_root: PathBuf::from(DEFAULT_WWW_ROOT),
        }
    }

    pub fn with_www_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_www_root(path);
        self
    }

    /// Sets the directory static documents are served from.
    pub fn set_www_root(&mut self, path: impl Into<PathBuf>) {
        self.www_root = path.into();
    }

    pub fn www_root(&self) -> &Path {
        &self.www_root
    }

    /// Registers `handler` for `(method, path)`.
    ///
    /// Returns `true` when an existing handler for the same route was replaced.
    pub fn register_handler<F>(&mut self, method: Method, path: impl Into<String>, handler: F) -> bool
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        let route = Route::new(method, path);
        let replaced = self.handlers.insert(route.clone(), Box::new(handler)).is_some();
        if replaced {
            debug!(route = %route, "Replaced existing handler");
        }
        replaced
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether a handler is registered for exactly this route.
    pub fn has_route(&self, route: &Route) -> bool {
        self.handlers.contains_key(route)
    }

    /// Dispatches a request to its handler or the static file server.
    pub fn handle(&self, request: &Request) -> Response {
        debug!(route = %request.route(), "Dispatching request");

        if let Some(handler) = self.handlers.get(request.route()) {
            return match handler(request) {
                Ok(response) => response,
                Err(err) => match err.downcast_ref::<HttpError>() {
                    Some(http_err) => Response::from_error(http_err),
                    None => {
                        warn!(route = %request.route(), error = %err, "Handler failed");
                        Response::internal_error(err.to_string())
                    }
                },
            };
        }

        if Self::is_static_route(request) {
            return self.serve_static(request.path());
        }

        Response::from_error(&HttpError::bad_request())
    }

    /// GET requests for `/`, `/index.html` and the asset directories.
    pub fn is_static_route(request: &Request) -> bool {
        let path = request.path();
        request.method() == Method::GET
            && (path == "/"
                || path == "/index.html"
                || STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)))
    }

    /// Serves a file below the document root.
    ///
    /// Documents, scripts and stylesheets are stored gzip-compressed, so those
    /// responses declare `Content-Encoding: gzip`.
    pub fn serve_static(&self, path: &str) -> Response {
        let gzip = path == "/" || path.ends_with(".js") || path.ends_with(".css");
        let path = if path == "/" { "/index.html" } else { path };

        if path.split('/').any(|segment| segment == "..") {
            warn!(path, "Rejected path outside document root");
            return Response::not_found(format!("{path} not found"));
        }

        let file_path = self.www_root.join(path.trim_start_matches('/'));
        let size = match std::fs::metadata(&file_path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                warn!(path = %file_path.display(), "Not a regular file");
                return Response::not_found(format!("{path} is not a file"));
            }
            Err(err) => {
                warn!(path = %file_path.display(), error = %err, "Static file unavailable");
                return Response::not_found(err.to_string());
            }
        };

        let mut builder = ResponseBuilder::new(StatusCode::Ok)
            .mime(MimeType::from_path(path))
            .header("Content-Length", size.to_string());
        if gzip {
            builder = builder.header("Content-Encoding", "gzip");
        }
        builder.file(FileBody::new(file_path, size)).build()
    }
}
