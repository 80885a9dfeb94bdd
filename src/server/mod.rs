//! The accept loop that feeds sockets to the HTTP layer.

pub mod listener;

pub use listener::Webserver;
