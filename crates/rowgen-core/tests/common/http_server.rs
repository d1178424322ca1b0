//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves canned replies by request path (the query string is ignored), counts
//! every request it answers, and can misbehave on purpose: error statuses,
//! bodies cut short mid-transfer, and slow drip-fed bodies.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with the full body.
    Body(Vec<u8>),
    /// Bare status line with an empty body.
    Status(u16),
    /// Advertises the full length but closes after `sent` bytes.
    Truncated { body: Vec<u8>, sent: usize },
    /// 200, written in `chunk`-byte pieces with `delay` between them.
    Slow {
        body: Vec<u8>,
        chunk: usize,
        delay: Duration,
    },
}

pub struct TestServer {
    base: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Full URL for `path` (which should start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Number of requests answered so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. Unknown paths get 404. The
/// server runs until the process exits.
pub fn start(routes: Vec<(&str, Reply)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Reply>> = Arc::new(
        routes
            .into_iter()
            .map(|(p, r)| (p.to_string(), r))
            .collect(),
    );
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &routes, &counter));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Reply>, hits: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let target = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);
    hits.fetch_add(1, Ordering::SeqCst);

    match routes.get(path) {
        None => status_only(&mut stream, 404),
        Some(Reply::Status(code)) => status_only(&mut stream, *code),
        Some(Reply::Body(body)) => {
            let _ = stream.write_all(&head(200, body.len()));
            let _ = stream.write_all(body);
        }
        Some(Reply::Truncated { body, sent }) => {
            let _ = stream.write_all(&head(200, body.len()));
            let _ = stream.write_all(&body[..(*sent).min(body.len())]);
            let _ = stream.flush();
            // dropping the stream closes the connection mid-body
        }
        Some(Reply::Slow { body, chunk, delay }) => {
            if stream.write_all(&head(200, body.len())).is_err() {
                return;
            }
            for piece in body.chunks((*chunk).max(1)) {
                if stream.write_all(piece).is_err() {
                    return;
                }
                let _ = stream.flush();
                thread::sleep(*delay);
            }
        }
    }
}

fn head(code: u16, len: usize) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        code,
        reason(code),
        len
    )
    .into_bytes()
}

fn status_only(stream: &mut TcpStream, code: u16) {
    let _ = stream.write_all(&head(code, 0));
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
