use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// HTTP request methods understood by the node.
///
/// Only the four verbs used by the provisioning API are supported. Anything
/// else is rejected by the parser with 405 Method Not Allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// PUT - Replace a resource
    PUT,
    /// POST - Create or submit data
    POST,
    /// DELETE - Delete a resource
    DELETE,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive, as on the wire.
    ///
    /// ```
    /// # use senceit_node::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("PATCH"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "PUT" => Some(Method::PUT),
            "POST" => Some(Method::POST),
            "DELETE" => Some(Method::DELETE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::PUT => "PUT",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(method, path)` pair, the key handlers are registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    method: Method,
    path: String,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.method, self.path)
    }
}

/// A fully parsed HTTP request.
///
/// Produced once by [`RequestStreamParser::get_request`] and read-only
/// afterwards. Only allow-listed headers are retained.
///
/// [`RequestStreamParser::get_request`]: crate::http::parser::RequestStreamParser::get_request
#[derive(Debug, Clone)]
pub struct Request {
    route: Route,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<Value>,
    protocol: Option<String>,
    domain: Option<String>,
}

/// Builder for constructing Request objects.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<Value>,
    protocol: Option<String>,
    domain: Option<String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            route: Route::new(
                self.method.ok_or("method missing")?,
                self.path.ok_or("path missing")?,
            ),
            headers: self.headers,
            query: self.query,
            body: self.body,
            protocol: self.protocol,
            domain: self.domain,
        })
    }
}

impl Request {
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn method(&self) -> Method {
        self.route.method
    }

    pub fn path(&self) -> &str {
        &self.route.path
    }

    /// Retrieves a retained header value by its exact name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Query parameters. Empty, never absent, when the target had no `?`.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// The JSON body, present only when a non-empty body was declared.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Scheme of an absolute-form target (`http` in `http://host/path`).
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Authority of an absolute-form target.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Retrieves the Content-Length header value and parses it as a usize.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}
