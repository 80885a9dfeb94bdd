use std::collections::HashMap;

use crate::http::error::HttpError;
use crate::http::request::{Method, Request, RequestBuilder};

/// Headers retained on a parsed request. Everything else is dropped.
pub const SUPPORTED_HEADERS: [&str; 7] = [
    "Accept",
    "Accept-Encoding",
    "Host",
    "Connection",
    "User-Agent",
    "Content-Length",
    "Content-Type",
];

const SUPPORTED_VERSIONS: [&str; 2] = ["HTTP/1.0", "HTTP/1.1"];

/// Parser progress. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Waiting for the request line.
    Start,
    /// Reading header lines until the blank line.
    Headers,
    /// Accumulating `Content-Length` body bytes.
    Body,
    /// The request is complete.
    Done,
}

/// Incremental HTTP/1.x request parser.
///
/// Fed one line at a time while reading the request line and headers, then
/// raw chunks for the body. A line ends at `\n`; an optional `\r` before it is
/// part of the terminator. [`update`](Self::update) returns `Ok(true)` while
/// more input is needed and `Ok(false)` once the request is complete.
///
/// ```
/// # use senceit_node::http::parser::RequestStreamParser;
/// # use senceit_node::http::request::Method;
/// let mut parser = RequestStreamParser::new();
/// assert!(parser.update_line("GET /config?id=1 HTTP/1.1\r\n").unwrap());
/// assert!(parser.update_line("Host: 192.168.4.1\r\n").unwrap());
/// assert!(!parser.update_line("\r\n").unwrap());
///
/// let request = parser.get_request().unwrap();
/// assert_eq!(request.method(), Method::GET);
/// assert_eq!(request.path(), "/config");
/// assert_eq!(request.query()["id"], "1");
/// ```
#[derive(Debug)]
pub struct RequestStreamParser {
    state: ParseState,
    lines: usize,
    method: Option<Method>,
    path: Option<String>,
    protocol: Option<String>,
    domain: Option<String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    content_length: Option<usize>,
    body_started: bool,
    body: Vec<u8>,
}

impl Default for RequestStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStreamParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Start,
            lines: 0,
            method: None,
            path: None,
            protocol: None,
            domain: None,
            query: HashMap::new(),
            headers: HashMap::new(),
            content_length: None,
            body_started: false,
            body: Vec::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// Number of lines consumed so far, including the blank separator.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// The declared `Content-Length`, if the header was seen.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Body bytes still expected. `None` outside the body state.
    pub fn remaining_body(&self) -> Option<usize> {
        match (self.state, self.content_length) {
            (ParseState::Body, Some(expected)) => Some(expected.saturating_sub(self.body.len())),
            _ => None,
        }
    }

    /// Feeds one line (request line and headers) or one body chunk.
    ///
    /// Returns whether more input is required.
    pub fn update(&mut self, chunk: &[u8]) -> Result<bool, HttpError> {
        match self.state {
            ParseState::Start => {
                let line = decode_line(chunk)?;
                self.lines += 1;
                self.parse_request_line(line)?;
                self.state = ParseState::Headers;
                Ok(true)
            }
            ParseState::Headers => {
                let line = decode_line(chunk)?;
                self.lines += 1;
                if line.is_empty() {
                    return Ok(self.end_headers());
                }
                self.parse_header(line)?;
                Ok(true)
            }
            ParseState::Body => Ok(self.parse_body(chunk)),
            ParseState::Done => Err(HttpError::BadRequest(
                "request already complete".to_string(),
            )),
        }
    }

    /// Convenience wrapper around [`update`](Self::update) for text input.
    pub fn update_line(&mut self, line: &str) -> Result<bool, HttpError> {
        self.update(line.as_bytes())
    }

    /// Consumes the parser and assembles the request.
    ///
    /// The body is decoded as JSON here, not while it is being received.
    pub fn get_request(self) -> Result<Request, HttpError> {
        let (Some(method), Some(path)) = (self.method, self.path) else {
            return Err(HttpError::BadRequest("missing request line".to_string()));
        };

        let mut builder = RequestBuilder::new().method(method).path(path);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        for (key, value) in self.query {
            builder = builder.query(key, value);
        }
        if let Some(protocol) = self.protocol {
            builder = builder.protocol(protocol);
        }
        if let Some(domain) = self.domain {
            builder = builder.domain(domain);
        }
        if self.content_length.unwrap_or(0) > 0 && !self.body.is_empty() {
            builder = builder.body(serde_json::from_slice(&self.body)?);
        }

        builder.build().map_err(|e| HttpError::BadRequest(e.to_string()))
    }

    fn parse_request_line(&mut self, line: &str) -> Result<(), HttpError> {
        let fields: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = fields.as_slice() else {
            return Err(HttpError::bad_request());
        };
        if target.is_empty() {
            return Err(HttpError::bad_request());
        }
        let method = Method::from_str(method).ok_or(HttpError::MethodNotAllowed)?;
        if !SUPPORTED_VERSIONS.contains(version) {
            return Err(HttpError::VersionNotSupported);
        }

        self.method = Some(method);
        self.parse_target(target);
        Ok(())
    }

    fn parse_target(&mut self, target: &str) {
        let mut rest = target;
        if let Some((protocol, after)) = target.split_once("://") {
            self.protocol = Some(protocol.to_string());
            rest = after;
        }

        let path = if rest.starts_with('/') {
            rest.to_string()
        } else {
            match rest.split_once('/') {
                Some((domain, path)) => {
                    self.domain = Some(domain.to_string());
                    format!("/{path}")
                }
                None => {
                    self.domain = Some(rest.to_string());
                    "/".to_string()
                }
            }
        };

        match path.split_once('?') {
            Some((path, query)) => {
                self.query = parse_query(query);
                self.path = Some(path.to_string());
            }
            None => self.path = Some(path),
        }
    }

    fn parse_header(&mut self, line: &str) -> Result<(), HttpError> {
        let Some(name) = SUPPORTED_HEADERS
            .iter()
            .find(|name| line.strip_prefix(*name).is_some_and(|r| r.starts_with(':')))
        else {
            return Ok(());
        };

        let value = line[name.len() + 1..].trim();
        if *name == "Content-Length" {
            let length = value.parse::<usize>().map_err(|_| {
                HttpError::BadRequest(format!("invalid Content-Length: {value}"))
            })?;
            self.content_length = Some(length);
        }
        self.headers.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn end_headers(&mut self) -> bool {
        match self.content_length {
            Some(length) if length > 0 => {
                self.state = ParseState::Body;
                true
            }
            _ => {
                self.state = ParseState::Done;
                false
            }
        }
    }

    fn parse_body(&mut self, chunk: &[u8]) -> bool {
        // A blank first body line separates, it is not content.
        let first = !self.body_started;
        self.body_started = true;
        if first && matches!(chunk, b"\r\n" | b"\n") {
            return true;
        }

        let expected = self.content_length.unwrap_or(0);
        let take = chunk.len().min(expected.saturating_sub(self.body.len()));
        self.body.extend_from_slice(&chunk[..take]);

        if self.body.len() >= expected {
            self.state = ParseState::Done;
            false
        } else {
            true
        }
    }
}

/// Strips the line terminator and decodes the line as UTF-8.
fn decode_line(chunk: &[u8]) -> Result<&str, HttpError> {
    let line = chunk.strip_suffix(b"\n").unwrap_or(chunk);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    std::str::from_utf8(line)
        .map_err(|_| HttpError::BadRequest("request is not valid UTF-8".to_string()))
}

/// Splits `a=1&b=2` into pairs. Values are taken verbatim, without decoding.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_pairs() {
        let query = parse_query("id=1&name=a=b&flag");

        assert_eq!(query["id"], "1");
        assert_eq!(query["name"], "a=b");
        assert_eq!(query["flag"], "");
    }

    #[test]
    fn decode_line_strips_either_terminator() {
        assert_eq!(decode_line(b"Host: a\r\n").unwrap(), "Host: a");
        assert_eq!(decode_line(b"Host: a\n").unwrap(), "Host: a");
        assert_eq!(decode_line(b"\r\n").unwrap(), "");
    }
}
