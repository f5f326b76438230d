//! Minimal HTTP/1.1 server capturing requests for integration tests.
//!
//! Each scripted response answers one connection, then the connection is
//! closed so the client never reuses it.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rstest::fixture;

#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self::bytes(status, body.as_bytes().to_vec())
    }

    /// Response whose body is sent exactly as given, valid UTF-8 or not.
    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }
}

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn parse_header_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    line.split_once(':')
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
}

fn read_http_request(stream: &mut TcpStream) -> CapturedRequest {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("read request line");
    let parts: Vec<&str> = request_line.trim().split(' ').collect();
    let method = parts.first().unwrap_or(&"").to_string();
    let path = parts.get(1).unwrap_or(&"").to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        if line.trim().is_empty() {
            break;
        }
        let Some((key, value)) = parse_header_line(&line) else {
            continue;
        };
        if key == "content-length" {
            content_length = value.parse().unwrap_or(0);
        }
        headers.push((key, value));
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).expect("read body");
    }

    CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

/// Serve `responses` in order, one per connection, forwarding each captured
/// request on the returned channel.
pub fn spawn_mock_server(
    listener: TcpListener,
    responses: Vec<MockResponse>,
) -> (SocketAddr, mpsc::Receiver<CapturedRequest>) {
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };
            let captured = read_http_request(&mut stream);
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                response.status,
                status_text(response.status),
                response.body.len(),
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&response.body);
            let _ = tx.send(captured);
        }
    });

    (addr, rx)
}

#[fixture]
pub fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}
