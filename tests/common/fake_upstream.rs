/*!
 * A scripted chat-completions server on a local port.
 *
 * Each accepted connection consumes the next scripted reply; once the script
 * is exhausted the fallback reply is served. Every response closes its
 * connection, so one request maps to one connection.
 */

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// One scripted HTTP response
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a single choice carrying this content
    Completion(String),
    /// 429 with `Retry-After: 0`
    RateLimited,
    /// Any status with a plain body
    Status(u16, String),
    /// Read the request, then hold the connection open without answering
    Stall,
}

impl Reply {
    fn render(&self) -> Option<String> {
        let (status, reason, body, extra) = match self {
            Reply::Completion(content) => {
                let body = serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": content } }]
                });
                (200, "OK", body.to_string(), "")
            }
            Reply::RateLimited => (
                429,
                "Too Many Requests",
                r#"{"error":"rate limited"}"#.to_string(),
                "Retry-After: 0\r\n",
            ),
            Reply::Status(code, body) => (*code, "Error", body.clone(), ""),
            Reply::Stall => return None,
        };

        Some(format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            reason,
            body.len(),
            extra,
            body
        ))
    }
}

/// Running fake server; aborted on drop
pub struct FakeUpstream {
    pub url: String,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeUpstream {
    pub async fn start(script: Vec<Reply>, fallback: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake upstream");
        let addr = listener.local_addr().expect("local addr");

        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Mutex::new(VecDeque::from(script)));

        let handle = {
            let hits = hits.clone();
            let bodies = bodies.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let reply = script.lock().pop_front().unwrap_or_else(|| fallback.clone());
                    let bodies = bodies.clone();
                    tokio::spawn(async move {
                        if let Some(body) = serve(stream, &reply).await {
                            bodies.lock().push(body);
                        }
                    });
                }
            })
        };

        Self {
            url: format!("http://{}/api/v1/chat/completions", addr),
            hits,
            bodies,
            handle,
        }
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request bodies received so far
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read one request, answer it and return the request body
async fn serve(mut stream: TcpStream, reply: &Reply) -> Option<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let body = String::from_utf8_lossy(&buffer[header_end..]).into_owned();
    match reply.render() {
        Some(response) => {
            stream.write_all(response.as_bytes()).await.ok()?;
            let _ = stream.shutdown().await;
        }
        None => sleep(Duration::from_secs(60)).await,
    }

    Some(body)
}
