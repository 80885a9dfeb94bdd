use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::http::error::HttpError;
use crate::http::parser::RequestStreamParser;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::router::Http;
use crate::http::writer::ResponseWriter;

/// Longest request or header line accepted before the request is rejected.
pub const MAX_LINE_BYTES: usize = 4096;

/// Per-connection resource limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    /// How long a single read may wait for data.
    pub read_timeout: Duration,
    /// Largest `Content-Length` the node will buffer.
    pub max_body_bytes: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            max_body_bytes: 8 * 1024,
        }
    }
}

/// Why a connection was dropped.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out waiting for request data")]
    Timeout,

    /// The declared body does not fit the node's memory budget.
    #[error("request body of {requested} bytes exceeds the {limit} byte limit")]
    OutOfMemory { requested: usize, limit: usize },

    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Handles exactly one request on an accepted stream.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    limits: ConnectionLimits,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, limits: ConnectionLimits) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(1024),
            state: ConnectionState::Reading,
            limits,
        }
    }

    /// Reads, dispatches and answers a single request, then closes.
    ///
    /// Protocol errors are answered with their error response. I/O failures,
    /// timeouts and oversized bodies abort the connection without a reply.
    pub async fn run(&mut self, http: &Http) -> Result<(), ConnectionError> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(Some(req)) => ConnectionState::Processing(req),
                        Ok(None) => ConnectionState::Closed,
                        Err(ConnectionError::Http(err)) => {
                            warn!(status = err.status().as_u16(), error = %err, "Rejected request");
                            ConnectionState::Writing(ResponseWriter::new(&Response::from_error(&err)))
                        }
                        Err(err) => {
                            // Release whatever was buffered before giving up.
                            self.buffer = BytesMut::new();
                            return Err(err);
                        }
                    };
                }

                ConnectionState::Processing(req) => {
                    let response = http.handle(req);
                    info!(
                        method = %req.method(),
                        path = req.path(),
                        status = response.status().as_u16(),
                        "Handled request"
                    );

                    let writer = ResponseWriter::new(&response);
                    self.state = ConnectionState::Writing(writer);
                }

                ConnectionState::Writing(writer) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    if let Err(err) = self.stream.shutdown().await {
                        debug!(error = %err, "Shutdown after response failed");
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Feeds buffered lines and body chunks to a fresh parser until the
    /// request is complete.
    ///
    /// Returns `Ok(None)` when the client closes before sending anything.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        let mut parser = RequestStreamParser::new();

        loop {
            while let Some(chunk) = self.next_chunk(&parser)? {
                let more = parser.update(&chunk)?;

                if let Some(requested) = parser.content_length() {
                    if requested > self.limits.max_body_bytes {
                        return Err(ConnectionError::OutOfMemory {
                            requested,
                            limit: self.limits.max_body_bytes,
                        });
                    }
                }

                if !more {
                    return Ok(Some(parser.get_request()?));
                }
            }

            // Read more data
            let mut temp = [0u8; 1024];
            let n = timeout(self.limits.read_timeout, self.stream.read(&mut temp))
                .await
                .map_err(|_| ConnectionError::Timeout)??;

            if n == 0 {
                if parser.lines() == 0 && self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "client closed connection mid-request",
                )));
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }

    /// The next complete line, or the next body chunk once headers are done.
    fn next_chunk(&mut self, parser: &RequestStreamParser) -> Result<Option<Bytes>, HttpError> {
        if let Some(remaining) = parser.remaining_body() {
            if self.buffer.is_empty() {
                return Ok(None);
            }
            let take = remaining.min(self.buffer.len());
            return Ok(Some(self.buffer.split_to(take).freeze()));
        }

        match self.buffer.iter().position(|b| *b == b'\n') {
            Some(pos) => Ok(Some(self.buffer.split_to(pos + 1).freeze())),
            None if self.buffer.len() > MAX_LINE_BYTES => {
                Err(HttpError::BadRequest("request line too long".to_string()))
            }
            None => Ok(None),
        }
    }
}
