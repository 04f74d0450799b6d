//! Integration tests for the reqwest-backed HTTP client.
//!
//! A minimal HTTP/1.1 server on a loopback port stands in for the CDN so the
//! real request path (headers, status handling, streaming to disk, timeouts)
//! is exercised without leaving the machine.
//!
//! Run with: `cargo test --test http_client`

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use streamfetch::{DownloadConfig, FetchError, HttpClient, ReqwestClient};

// ============================================================================
// Test Server
// ============================================================================

/// Request line and headers as received by the server, lowercased names.
#[derive(Debug, Clone, Default)]
struct SeenRequest {
    path: String,
    headers: Vec<(String, String)>,
}

impl SeenRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Serve `routes` (path → body) on a loopback port; other paths get 404.
///
/// Every response closes its connection. `delay` is applied before answering.
fn spawn_server(
    routes: Vec<(&'static str, Vec<u8>)>,
    delay: Option<Duration>,
) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let request = read_request(&stream);
            seen_clone.lock().unwrap().push(request.clone());

            if let Some(delay) = delay {
                thread::sleep(delay);
            }

            let body = routes
                .iter()
                .find(|(path, _)| *path == request.path)
                .map(|(_, body)| body.clone());
            respond(stream, body);
        }
    });

    (base, seen)
}

fn read_request(stream: &TcpStream) -> SeenRequest {
    let mut reader = BufReader::new(stream);
    let mut request = SeenRequest::default();

    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    request.path = line.split_whitespace().nth(1).unwrap_or("/").to_string();

    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.trim_end().split_once(':') {
            request
                .headers
                .push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    request
}

fn respond(mut stream: TcpStream, body: Option<Vec<u8>>) {
    let (status, body) = match body {
        Some(body) => ("200 OK", body),
        None => ("404 Not Found", b"not found".to_vec()),
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Manifest requests carry the configured user agent and the referer.
#[test]
fn test_get_text_sends_headers() {
    let (base, seen) = spawn_server(vec![("/v/index.m3u8", b"#EXTM3U\na.ts\n".to_vec())], None);
    let config = DownloadConfig::default().with_user_agent("streamfetch-test/1.0");
    let client = ReqwestClient::new(&config).unwrap();
    let url = format!("{}/v/index.m3u8", base);

    let body = client.get_text(&url, &url).unwrap();

    assert_eq!(body, "#EXTM3U\na.ts\n");
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].header("user-agent"), Some("streamfetch-test/1.0"));
    assert_eq!(seen[0].header("referer"), Some(url.as_str()));
}

/// Segment bodies are streamed to the destination file.
#[test]
fn test_download_writes_file() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(3 * 1024 * 1024 + 17).collect();
    let (base, _seen) = spawn_server(vec![("/v/seg0.ts", payload.clone())], None);
    let client = ReqwestClient::new(&DownloadConfig::default()).unwrap();
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("segment_00000.ts");

    let written = client
        .download(&format!("{}/v/seg0.ts", base), "http://referer.test/", &dest)
        .unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

/// Non-2xx answers surface as status errors without creating the file.
#[test]
fn test_not_found_is_status_error() {
    let (base, _seen) = spawn_server(Vec::new(), None);
    let client = ReqwestClient::new(&DownloadConfig::default()).unwrap();
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing.ts");

    let err = client
        .download(&format!("{}/v/missing.ts", base), "", &dest)
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(!dest.exists());
}

/// A server slower than the segment timeout yields a timeout error.
#[test]
fn test_segment_timeout() {
    let (base, _seen) = spawn_server(
        vec![("/v/slow.ts", b"late".to_vec())],
        Some(Duration::from_millis(1500)),
    );
    let config = DownloadConfig::default().with_segment_timeout(Duration::from_millis(200));
    let client = ReqwestClient::new(&config).unwrap();
    let dir = TempDir::new().unwrap();

    let err = client
        .download(&format!("{}/v/slow.ts", base), "", &dir.path().join("slow.ts"))
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
}
