//! Loopback HTTP server for download tests.
//!
//! Serves canned responses by request path over plain HTTP/1.1 with
//! `Connection: close`. Unknown paths get a 404.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Clone, Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Send a `Content-Length` header; without it the body ends at connection close.
    pub content_length: bool,
}

impl TestResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: true,
        }
    }

    /// 200 response whose length is not declared up front.
    pub fn without_length(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_length: false,
            ..Self::ok(body)
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_length: true,
        }
    }
}

/// A running server; stops when dropped.
pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Binds an ephemeral loopback port and serves `routes`.
    pub async fn start(routes: Vec<(&str, TestResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let routes: Arc<HashMap<String, TestResponse>> = Arc::new(
            routes.into_iter().map(|(path, response)| (path.to_string(), response)).collect(),
        );
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let _ = respond(stream, &routes).await;
                });
            }
        });

        Self { addr, hits, handle }
    }

    /// Absolute URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Number of connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(mut stream: TcpStream, routes: &HashMap<String, TestResponse>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let response = routes.get(&path).cloned().unwrap_or_else(|| TestResponse::status(404));

    let mut header = format!("HTTP/1.1 {} Test\r\nConnection: close\r\n", response.status);
    if response.content_length {
        header.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    }
    header.push_str("\r\n");

    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}
