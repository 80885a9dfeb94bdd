use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionError, ConnectionLimits};
use crate::http::router::Http;

/// How long one poll waits for a pending connection.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Single-connection accept loop.
///
/// Each poll accepts at most one client and handles it to completion before
/// the next poll, so there is never more than one request in flight.
pub struct Webserver {
    listener: TcpListener,
    http: Http,
    limits: ConnectionLimits,
}

impl Webserver {
    pub async fn bind(cfg: &ServerConfig, http: Http) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&cfg.listen_addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            http,
            limits: cfg.limits(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Polls for one client and serves it if one is waiting.
    ///
    /// Returns whether a connection was accepted. Failures of the accepted
    /// connection are logged and never propagate.
    pub async fn handle_client(&self) -> bool {
        let (socket, peer) = match timeout(POLL_TIMEOUT, self.listener.accept()).await {
            Err(_) => return false,
            Ok(Err(e)) => {
                warn!("Accept failed: {}", e);
                return false;
            }
            Ok(Ok(accepted)) => accepted,
        };
        info!("Accepted connection from {}", peer);

        let mut conn = Connection::new(socket, self.limits);
        match conn.run(&self.http).await {
            Ok(()) => {}
            Err(ConnectionError::OutOfMemory { requested, limit }) => {
                error!(%peer, requested, limit, "Dropped connection: out of memory");
            }
            Err(e) => error!("Connection error from {}: {}", peer, e),
        }
        true
    }

    /// Serves clients until the future is dropped.
    pub async fn run(&self) {
        loop {
            if !self.handle_client().await {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Stops listening. The socket is released when the server is dropped.
    pub fn close(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Closed listener on {}", addr);
        }
    }
}
