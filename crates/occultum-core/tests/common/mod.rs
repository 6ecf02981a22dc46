//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use occultum_core::{Config, Embedder, Result, VectorStore};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[path = "../../src/test_util/keywords.rs"]
mod keywords;

pub use keywords::{keyword_vector, KEYWORD_DIMS, KEYWORD_MODEL, SCROLLS};

pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORD_DIMS
    }

    fn model_name(&self) -> &str {
        KEYWORD_MODEL
    }
}

/// Store the scrolls in `dir` using the keyword model
pub fn seed_store(dir: &Path) -> VectorStore {
    let store = VectorStore::open(dir, "occultum", KEYWORD_MODEL, KEYWORD_DIMS).unwrap();
    for (id, text) in SCROLLS {
        store.upsert(id, text, &keyword_vector(text)).unwrap();
    }
    store
}

/// Configuration pointing every service at `url` and the store at `dir`
pub fn test_config(url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.generation.url = url.to_string();
    config.generation.api_key = Some("test-key".to_string());
    config.generation.initial_backoff_ms = 10;
    config.generation.timeout_secs = 5;
    config.embedding.url = Some(url.to_string());
    config.embedding.model = KEYWORD_MODEL.to_string();
    config.embedding.dimensions = KEYWORD_DIMS;
    config.embedding.timeout_secs = 5;
    config.store.path = dir.to_path_buf();
    config.retrieval.top_k = 1;
    config
}

/// One request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
    /// Pause before anything is written back
    pub delay: Option<Duration>,
}

impl CannedResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub fn chat_reply(content: &str) -> CannedResponse {
    CannedResponse::json(
        200,
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        }),
    )
}

/// Embeddings response computed with the keyword model
pub fn keyword_embeddings(request: &RecordedRequest) -> CannedResponse {
    let inputs = request.json()["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<_> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::json!({
                "index": i,
                "embedding": keyword_vector(text.as_str().unwrap_or_default()),
            })
        })
        .collect();
    CannedResponse::json(200, serde_json::json!({ "data": data }))
}

type Handler = dyn Fn(&RecordedRequest) -> CannedResponse + Send + Sync;

/// Minimal HTTP/1.1 server answering each connection with a canned response
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    serve(stream, handler, recorded).await;
                });
            }
        });

        Self { url, requests }
    }

    /// Chat responses are served in order; the last one repeats.
    /// Embedding requests are answered with the keyword model.
    pub async fn scripted(responses: Vec<CannedResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::start(move |request| {
            if request.path.ends_with("/embeddings") {
                return keyword_embeddings(request);
            }
            let mut queue = queue.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        })
        .await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }
}

async fn serve(
    mut stream: TcpStream,
    handler: Arc<Handler>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    recorded.lock().unwrap().push(request.clone());
    let response = handler(&request);
    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(response.body.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(body_start + content_length);

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&buf[body_start..body_end]).to_string(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
