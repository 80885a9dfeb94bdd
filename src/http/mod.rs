//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.x server for device provisioning: four
//! methods, JSON bodies, static files, one request per connection.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: Drives one accepted socket through the request-response state machine
//! - **`parser`**: Incremental, line-fed request parser
//! - **`request`**: Methods, routes and the parsed request
//! - **`response`**: Status codes and the immutable response with its builder
//! - **`router`**: Maps routes to handlers and serves static files
//! - **`writer`**: Serializes and writes responses, streaming file bodies
//! - **`mime`**: MIME type detection based on file extensions
//! - **`error`**: Protocol errors and the status codes they map to
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed lines, then body bytes, to the parser
//!        └──────┬──────┘
//!               │ Request complete (or protocol error → Writing)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Router picks a handler or a static file
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Head, body, then any file content
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use senceit_node::http::connection::{Connection, ConnectionLimits};
//! use senceit_node::http::router::Http;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let http = Http::new().with_www_root("www");
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let mut conn = Connection::new(socket, ConnectionLimits::default());
//!         if let Err(e) = conn.run(&http).await {
//!             eprintln!("Connection error: {}", e);
//!         }
//!     }
//! }
//! ```

pub mod connection;
pub mod error;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod writer;
