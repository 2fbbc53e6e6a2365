//! Minimal HTTP/1.1 server standing in for the conversion service.
//!
//! Accepts `POST` with a `multipart/form-data` body, records every part, and
//! answers with a fixed status and body.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GifServerOptions {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// Wait before answering, to let cosmetic progress run.
    pub delay: Duration,
}

impl Default for GifServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            body: b"GIF89a\x01\x00\x01\x00fake".to_vec(),
            content_type: "image/gif",
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Part {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// One received request: method, path and multipart parts keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub parts: HashMap<String, Part>,
}

impl Captured {
    pub fn field(&self, name: &str) -> Option<String> {
        self.parts
            .get(name)
            .map(|p| String::from_utf8_lossy(&p.data).into_owned())
    }
}

pub struct GifServer {
    pub url: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl GifServer {
    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

pub fn start() -> GifServer {
    start_with_options(GifServerOptions::default())
}

/// Serves in a background thread until the process exits.
pub fn start_with_options(opts: GifServerOptions) -> GifServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let sink = Arc::clone(&sink);
            let opts = opts.clone();
            thread::spawn(move || handle(stream, &opts, &sink));
        }
    });
    GifServer {
        url: format!("http://127.0.0.1:{}/gif", port),
        captured,
    }
}

fn handle(mut stream: TcpStream, opts: &GifServerOptions, sink: &Mutex<Vec<Captured>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 16 * 1024];
    let header_end = loop {
        if let Some(pos) = find(&raw, b"\r\n\r\n") {
            break pos;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("").to_string();
    let mut content_length = 0usize;
    let mut boundary = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("content-type") {
                boundary = value
                    .split(';')
                    .filter_map(|p| p.trim().strip_prefix("boundary="))
                    .next()
                    .map(|b| b.trim_matches('"').to_string());
            }
        }
    }

    let mut body = raw[header_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }

    let parts = boundary
        .map(|b| parse_multipart(&body, &b))
        .unwrap_or_default();
    sink.lock().unwrap().push(Captured {
        method,
        path,
        parts,
    });

    thread::sleep(opts.delay);
    let reason = if opts.status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        opts.status,
        reason,
        opts.content_type,
        opts.body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&opts.body);
}

fn parse_multipart(body: &[u8], boundary: &str) -> HashMap<String, Part> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = HashMap::new();
    let mut rest = body;
    while let Some(start) = find(rest, &delimiter) {
        rest = &rest[start + delimiter.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        let rest_trimmed = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        let Some(next) = find(rest_trimmed, &delimiter) else {
            break;
        };
        let section = &rest_trimmed[..next];
        let section = section.strip_suffix(b"\r\n").unwrap_or(section);
        if let Some(split) = find(section, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&section[..split]).into_owned();
            let data = section[split + 4..].to_vec();
            let mut name = None;
            let mut part = Part {
                data,
                ..Part::default()
            };
            for line in headers.split("\r\n") {
                let lower = line.to_ascii_lowercase();
                if lower.starts_with("content-disposition:") {
                    name = attribute(line, "name");
                    part.filename = attribute(line, "filename");
                } else if lower.starts_with("content-type:") {
                    part.content_type = line.split_once(':').map(|(_, v)| v.trim().to_string());
                }
            }
            if let Some(name) = name {
                parts.insert(name, part);
            }
        }
        rest = rest_trimmed;
    }
    parts
}

/// Value of `key="..."` in a header line (exact key, so `name` skips `filename`).
fn attribute(line: &str, key: &str) -> Option<String> {
    line.split(';').find_map(|piece| {
        let (k, v) = piece.trim().split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
