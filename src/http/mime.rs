//! MIME type detection based on file extensions.

use std::fmt;
use std::path::Path;

/// Content types the node serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Html,
    Text,
    Css,
    Js,
    Json,
    Png,
    Svg,
    Jpg,
    /// Fallback for unknown extensions.
    Binary,
}

impl MimeType {
    /// Resolves the MIME type from the extension of `path`, ignoring case.
    ///
    /// ```
    /// # use senceit_node::http::mime::MimeType;
    /// assert_eq!(MimeType::from_path("/css/styles.CSS"), MimeType::Css);
    /// assert_eq!(MimeType::from_path("/favicon.ico"), MimeType::Binary);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("css") => MimeType::Css,
            Some("html") => MimeType::Html,
            Some("png") => MimeType::Png,
            Some("jpg") => MimeType::Jpg,
            Some("svg") => MimeType::Svg,
            Some("js") => MimeType::Js,
            Some("json") => MimeType::Json,
            Some("txt") => MimeType::Text,
            _ => MimeType::Binary,
        }
    }

    /// The `Content-Type` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Html => "text/html; charset=UTF-8",
            MimeType::Text => "text/plain; charset=UTF-8",
            MimeType::Css => "text/css; charset=UTF-8",
            MimeType::Js => "text/javascript; charset=UTF-8",
            MimeType::Json => "application/json; charset=UTF-8",
            MimeType::Png => "image/png",
            MimeType::Svg => "image/svg+xml",
            MimeType::Jpg => "image/jpeg",
            MimeType::Binary => "application/octet-stream",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
