//! Minimal in-process HTTP server pieces for exercising the feed
//! against real sockets.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

/// Bind an ephemeral listener and return it with its base URL.
pub(crate) fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    (listener, base_url)
}

/// Read one request (headers plus any Content-Length body) and
/// return its text.
pub(crate) fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        match sock.read(&mut byte) {
            Ok(1) => buf.push(byte[0]),
            _ => break,
        }
    }
    let head = String::from_utf8_lossy(&buf).into_owned();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        if sock.read_exact(&mut body).is_ok() {
            return head + &String::from_utf8_lossy(&body);
        }
    }
    head
}

/// Serve an event-stream response body, delimited by connection
/// close.
pub(crate) fn write_sse(sock: &mut TcpStream, body: &str) {
    let head = "HTTP/1.1 200 OK\r\n\
                Content-Type: text/event-stream\r\n\
                Connection: close\r\n\r\n";
    sock.write_all(head.as_bytes()).unwrap();
    sock.write_all(body.as_bytes()).unwrap();
    let _ = sock.flush();
}

/// Serve one JSON response with the given status code.
pub(crate) fn write_json(sock: &mut TcpStream, status: u16, body: &str) {
    let head = format!(
        "HTTP/1.1 {} OK\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = sock.write_all(head.as_bytes());
    let _ = sock.write_all(body.as_bytes());
    let _ = sock.flush();
}
