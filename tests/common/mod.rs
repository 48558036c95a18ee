//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A canned HTTP/1.1 response.
pub struct MockResponse {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", "application/json".into())],
            body: body.to_string(),
        }
    }

    pub fn status(status_line: &'static str, body: &str) -> Self {
        Self {
            status_line,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status_line: "302 Found",
            headers: vec![("Location", location.to_string())],
            body: String::new(),
        }
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Returns its address and a counter of accepted connections.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let f = f.clone();
            tokio::spawn(async move {
                serve_one(socket, f().await).await;
            });
        }
    });

    (addr, hits)
}

/// Start a mock backend that always returns the same JSON body.
pub async fn start_json_backend(body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    start_programmable_backend(move || async move { MockResponse::json(body) }).await
}

async fn serve_one(mut socket: TcpStream, response: MockResponse) {
    // Drain the request head before answering.
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    let mut raw = format!("HTTP/1.1 {}\r\n", response.status_line);
    for (name, value) in &response.headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    let _ = socket.write_all(raw.as_bytes()).await;
    let _ = socket.shutdown().await;
}
