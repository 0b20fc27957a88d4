//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes (any method):
//! - `/echo` – 200 JSON describing the request (method, path, query, headers, body)
//! - `/status/{code}` – JSON `{"status": code}` with that status
//! - `/text` – 200 `text/plain` body
//! - `/flaky/{n}` – 503 for the first `n` hits of this path, then 200 JSON
//!
//! Every route honours `?delay=MS` before responding. One request per
//! connection; the server runs until the process exits.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Starts the server on an ephemeral port and returns its base URL
/// without a trailing slash (e.g. "http://127.0.0.1:12345").
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let hits = Arc::clone(&hits);
            thread::spawn(move || handle(stream, &hits));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

struct Request {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);
    Some(Request {
        method,
        path,
        query,
        headers,
        body,
    })
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn handle(mut stream: TcpStream, hits: &Mutex<HashMap<String, usize>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    if let Some(ms) = query_param(&req.query, "delay").and_then(|v| v.parse::<u64>().ok()) {
        thread::sleep(Duration::from_millis(ms));
    }

    let hit = {
        let mut hits = hits.lock().unwrap();
        let count = hits.entry(req.path.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let segments: Vec<&str> = req.path.trim_start_matches('/').split('/').collect();
    let (status, reason, content_type, body) = match segments.as_slice() {
        ["echo"] => {
            let headers: serde_json::Map<String, serde_json::Value> = req
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            let echo = serde_json::json!({
                "method": req.method,
                "path": req.path,
                "query": req.query,
                "headers": headers,
                "body": String::from_utf8_lossy(&req.body),
            });
            (200, "OK", "application/json", echo.to_string())
        }
        ["status", code] => {
            let code: u32 = code.parse().unwrap_or(500);
            let reason = match code {
                200 => "OK",
                404 => "Not Found",
                500 => "Internal Server Error",
                503 => "Service Unavailable",
                _ => "Unknown",
            };
            let body = serde_json::json!({ "status": code }).to_string();
            (code, reason, "application/json", body)
        }
        ["text"] => (200, "OK", "text/plain", "hello from fetchy".to_string()),
        ["flaky", n] => {
            let failures: usize = n.parse().unwrap_or(0);
            if hit <= failures {
                (503, "Service Unavailable", "application/json", "{}".to_string())
            } else {
                let body = serde_json::json!({ "attempts": hit }).to_string();
                (200, "OK", "application/json", body)
            }
        }
        _ => (404, "Not Found", "text/plain", "not found".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    if req.method != "HEAD" {
        let _ = stream.write_all(body.as_bytes());
    }
}
