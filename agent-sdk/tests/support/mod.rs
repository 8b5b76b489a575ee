//! Single-request HTTP server standing in for the host router

#![allow(dead_code)]

use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the server saw
#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    /// Parse a complete request out of `buf`, or `None` if more bytes are needed
    fn parse(buf: &[u8]) -> Option<Self> {
        let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
        let head = String::from_utf8_lossy(&buf[..head_end]);
        let mut lines = head.split("\r\n");

        let mut request_line = lines.next()?.split_whitespace();
        let method = request_line.next()?.to_string();
        let path = request_line.next()?.to_string();

        let headers: HashMap<String, String> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let body = &buf[head_end + 4..];
        if body.len() < content_length {
            return None;
        }

        Some(Self {
            method,
            path,
            headers,
            body: body[..content_length].to_vec(),
        })
    }
}

/// Serve exactly one request with the given status line and JSON body.
/// Returns the base URL and a handle yielding the captured request.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let (base, handle) = serve_sequence(&[(status, body)]).await;
    let handle = tokio::spawn(async move {
        handle
            .await
            .unwrap()
            .pop()
            .expect("one request captured")
    });
    (base, handle)
}

/// Serve one request per `(status, body)` pair, in order, one connection each
pub async fn serve_sequence(
    responses: &[(&str, &str)],
) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let raw = responses
        .iter()
        .map(|(status, body)| {
            format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        })
        .collect();
    serve_raw(raw).await
}

/// Like [`serve_sequence`] but writes each response verbatim, so tests can
/// send malformed framing
pub async fn serve_raw(responses: Vec<String>) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test listener");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut socket).await);
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        captured
    });

    (format!("http://{addr}"), handle)
}

/// Accept one connection, read the request, never answer. The handle yields
/// the request once the client gives up and closes the socket.
pub async fn serve_silent() -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test listener");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        // hold the connection open until the client drops it
        let mut rest = [0u8; 64];
        while matches!(socket.read(&mut rest).await, Ok(n) if n > 0) {}
        request
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(request) = CapturedRequest::parse(&buf) {
            return request;
        }
        assert!(n > 0, "connection closed before a full request arrived");
    }
}
