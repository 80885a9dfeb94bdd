use crate::http::response::StatusCode;

/// Protocol-level failures, each tied to the status code it is answered with.
///
/// Handlers may return an `HttpError` through `anyhow`; the router recovers it
/// by downcasting and answers with [`HttpError::status`] instead of 500.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Malformed request line, header value or misuse of the parser.
    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported HTTP Method")]
    MethodNotAllowed,

    #[error("HTTP Version Not Supported")]
    VersionNotSupported,

    /// No handler or file for the requested path.
    #[error("{0}")]
    NotFound(String),

    /// The declared body was not valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// A handler failed without a more specific status.
    #[error("{0}")]
    Handler(String),
}

impl HttpError {
    pub fn bad_request() -> Self {
        HttpError::BadRequest("Bad Request".to_string())
    }

    /// The status code this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BadRequest,
            HttpError::MethodNotAllowed => StatusCode::MethodNotAllowed,
            HttpError::VersionNotSupported => StatusCode::HttpVersionNotSupported,
            HttpError::NotFound(_) => StatusCode::NotFound,
            HttpError::InvalidBody(_) => StatusCode::BadRequest,
            HttpError::Handler(_) => StatusCode::InternalServerError,
        }
    }
}
