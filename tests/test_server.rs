use std::net::SocketAddr;

use senceit_node::config::ServerConfig;
use senceit_node::http::request::Method;
use senceit_node::http::response::{Response, StatusCode};
use senceit_node::http::router::Http;
use senceit_node::server::Webserver;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn bind() -> Webserver {
    let cfg = ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let mut http = Http::new();
    http.register_handler(Method::GET, "/ping", |_| {
        Ok(Response::json(StatusCode::Ok, json!({"pong": true})))
    });
    Webserver::bind(&cfg, http).await.unwrap()
}

/// Polls until a client has been accepted and handled.
async fn serve_one(server: &Webserver) -> bool {
    loop {
        if server.handle_client().await {
            return true;
        }
    }
}

/// Sends `raw` and returns the reply, or an empty reply if the server reset
/// the connection.
async fn send(addr: SocketAddr, raw: &[u8], close_early: bool) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    if close_early {
        stream.shutdown().await.unwrap();
    }
    let mut reply = Vec::new();
    let _ = stream.read_to_end(&mut reply).await;
    reply
}

const PING: &[u8] = b"GET /ping HTTP/1.1\r\nHost: node\r\n\r\n";

#[tokio::test]
async fn test_handle_client_without_pending_connection() {
    let server = bind().await;

    assert!(!server.handle_client().await);
}

#[tokio::test]
async fn test_server_survives_client_closing_mid_request() {
    let server = bind().await;
    let addr = server.local_addr().unwrap();

    let (handled, reply) = tokio::join!(
        serve_one(&server),
        send(addr, b"GET /ping HTTP/1.1\r\nHo", true)
    );
    assert!(handled);
    assert!(reply.is_empty());

    let (handled, reply) = tokio::join!(serve_one(&server), send(addr, PING, false));
    assert!(handled);
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(reply.ends_with(br#"{"pong":true}"#));
}

#[tokio::test]
async fn test_server_survives_oversized_body() {
    let server = bind().await;
    let addr = server.local_addr().unwrap();

    let (handled, reply) = tokio::join!(
        serve_one(&server),
        send(addr, b"POST /ping HTTP/1.1\r\nContent-Length: 100000\r\n\r\n", false)
    );
    assert!(handled);
    assert!(reply.is_empty());

    let (handled, reply) = tokio::join!(serve_one(&server), send(addr, PING, false));
    assert!(handled);
    assert!(reply.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_run_serves_clients() {
    let server = bind().await;
    let addr = server.local_addr().unwrap();

    let reply = tokio::select! {
        _ = server.run() => unreachable!("run never returns"),
        reply = async {
            send(addr, b"GET /ping HTTP/1.1\r\nHo", true).await;
            send(addr, PING, false).await
        } => reply,
    };

    assert!(reply.starts_with(b"HTTP/1.1 200 OK\r\n"));
    server.close();
}
