use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::http::error::HttpError;
use crate::http::mime::MimeType;
use crate::util::StringBuilder;

/// Value of the `Server` header added to every response.
pub const SERVER: &str = "SenceIt muWebServer/1.0";

/// Protocol version written on every status line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP status codes supported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 301 Moved Permanently
    MovedPermanently,
    /// 302 Moved Temporarily
    MovedTemporarily,
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl StatusCode {
    const ALL: [StatusCode; 12] = [
        StatusCode::Ok,
        StatusCode::Created,
        StatusCode::MovedPermanently,
        StatusCode::MovedTemporarily,
        StatusCode::BadRequest,
        StatusCode::Unauthorized,
        StatusCode::Forbidden,
        StatusCode::NotFound,
        StatusCode::MethodNotAllowed,
        StatusCode::InternalServerError,
        StatusCode::NotImplemented,
        StatusCode::HttpVersionNotSupported,
    ];

    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use senceit_node::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::HttpVersionNotSupported.as_u16(), 505);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::MovedPermanently => 301,
            StatusCode::MovedTemporarily => 302,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::MovedTemporarily => "Moved Temporarily",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Looks up a supported status by its numeric code.
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_u16() == code)
    }

    /// Parses a status line such as `HTTP/1.1 404 Not Found`.
    ///
    /// Returns `None` unless both the code and its exact reason phrase match
    /// a supported status.
    pub fn from_status_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut parts = line.splitn(3, ' ');
        let version = parts.next()?;
        if !version.starts_with("HTTP/") {
            return None;
        }
        let code = parts.next()?.parse::<u16>().ok()?;
        let reason = parts.next()?;

        Self::from_u16(code).filter(|s| s.reason_phrase() == reason)
    }
}

/// A static file body. The content is read and streamed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBody {
    path: PathBuf,
    size: u64,
}

impl FileBody {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    /// Streamed from disk after the head has been written.
    File(FileBody),
}

impl Body {
    fn encoded_len(&self) -> u64 {
        match self {
            Body::Json(value) => value.to_string().len() as u64,
            Body::Text(text) => text.len() as u64,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File(file) => file.size,
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// Immutable once built: `Server`, `Content-Type` and `Content-Length`
/// defaults are filled in at construction.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    mime: MimeType,
    headers: HashMap<String, String>,
    body: Option<Body>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// ```
/// # use senceit_node::http::response::{ResponseBuilder, StatusCode};
/// # use senceit_node::http::mime::MimeType;
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .mime(MimeType::Text)
///     .header("Cache-Control", "no-cache")
///     .text("hello")
///     .build();
/// assert_eq!(response.header("Content-Length"), Some("5"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    mime: MimeType,
    headers: HashMap<String, String>,
    body: Option<Body>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    ///
    /// The MIME type defaults to JSON.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            mime: MimeType::Json,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn mime(mut self, mime: MimeType) -> Self {
        self.mime = mime;
        self
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Text(text.into()));
        self
    }

    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(Body::Bytes(bytes));
        self
    }

    pub fn file(mut self, file: FileBody) -> Self {
        self.body = Some(Body::File(file));
        self
    }

    /// Builds the final Response.
    pub fn build(self) -> Response {
        Response::new(self.status, self.mime, self.headers, self.body)
    }
}

impl Response {
    /// Creates a response, injecting `Server`, `Content-Type` and, for a
    /// present body, `Content-Length` when they are absent.
    pub fn new(
        status: StatusCode,
        mime: MimeType,
        mut headers: HashMap<String, String>,
        body: Option<Body>,
    ) -> Self {
        headers
            .entry("Server".to_string())
            .or_insert_with(|| SERVER.to_string());
        headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| mime.as_str().to_string());
        if let Some(body) = &body {
            headers
                .entry("Content-Length".to_string())
                .or_insert_with(|| body.encoded_len().to_string());
        }

        Self {
            status,
            mime,
            headers,
            body,
        }
    }

    /// Creates a JSON response with the given status.
    pub fn json(status: StatusCode, value: Value) -> Self {
        ResponseBuilder::new(status).json(value).build()
    }

    /// Creates a JSON error response of the form `{"error": message}`.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }

    /// Creates the error response matching a protocol error.
    pub fn from_error(err: &HttpError) -> Self {
        Self::error(err.status(), err.to_string())
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(StatusCode::NotFound, message)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::error(StatusCode::InternalServerError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Whether the body must be streamed from disk after the head.
    pub fn has_stream(&self) -> bool {
        matches!(self.body, Some(Body::File(_)))
    }

    /// Serializes the status line, headers and the blank separator line.
    ///
    /// Headers are written in name order so the output is deterministic.
    pub fn head(&self) -> String {
        let mut names: Vec<&String> = self.headers.keys().collect();
        names.sort();

        let mut sb = StringBuilder::new()
            .add(HTTP_VERSION)
            .space()
            .add(self.status.as_u16())
            .space()
            .add(self.status.reason_phrase())
            .newline();
        for name in names {
            sb = sb
                .add(name)
                .add(":")
                .space()
                .add(&self.headers[name])
                .newline();
        }
        sb.newline().build()
    }

    /// The in-memory body bytes. `None` for file bodies and empty responses.
    pub fn body_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self.body.as_ref()? {
            Body::Json(value) => Some(Cow::Owned(value.to_string().into_bytes())),
            Body::Text(text) => Some(Cow::Borrowed(text.as_bytes())),
            Body::Bytes(bytes) => Some(Cow::Borrowed(bytes.as_slice())),
            Body::File(_) => None,
        }
    }

    /// Serializes the head and in-memory body. File content is not included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.head().into_bytes();
        if let Some(body) = self.body_bytes() {
            buf.extend_from_slice(&body);
        }
        buf
    }
}
