//! Shared helpers for integration tests: a minimal PDF writer, an
//! axum mock endpoint that plays back canned `/api/chat` responses, and log setup.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output; visible with `--nocapture`.
/// Filter with `RUST_LOG`, default `warn`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ── PDF fixture ──────────────────────────────────────────────────────────────

/// Build a valid PDF with `pages` blank 200×100 pt pages.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", i + 3)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages
    ));
    for _ in 0..pages {
        objects.push(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 100] /Resources << >> >>".to_string(),
        );
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_start = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_start
    ));
    out.into_bytes()
}

// ── Mock chat endpoint ───────────────────────────────────────────────────────

/// A request received by [`MockChatServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Vec<(u16, String)>>,
    served: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// Serves `POST /api/chat` with canned responses, in order; the last
/// response repeats once the list is exhausted.
pub struct MockChatServer {
    pub url: String,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockChatServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        assert!(!responses.is_empty(), "need at least one response");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responses: Arc::new(responses),
            served: Arc::new(AtomicUsize::new(0)),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/api/chat", post(chat))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}/api/chat"),
            requests,
        }
    }

    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn chat(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, [(HeaderName, &'static str); 1], String) {
    state.requests.lock().unwrap().push(CapturedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect(),
        body,
    });

    let served = state.served.fetch_add(1, Ordering::SeqCst);
    let (status, body) = &state.responses[served.min(state.responses.len() - 1)];
    (
        StatusCode::from_u16(*status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body.clone(),
    )
}

/// A successful `/api/chat` body with the given content.
pub fn chat_reply(content: &str) -> String {
    serde_json::json!({
        "model": "llama3.2-vision:11b",
        "created_at": "2024-10-01T00:00:00Z",
        "message": { "role": "assistant", "content": content },
        "done": true,
        "total_duration": 2_000_000u64,
        "prompt_eval_count": 100,
        "eval_count": 20
    })
    .to_string()
}

/// A URL on which nothing is listening.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/chat")
}
