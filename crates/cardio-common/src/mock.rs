//! In-process stand-in for the guidelines service, used by tests.
//!
//! Each path has a queue of canned responses; the last one repeats once the queue is
//! down to a single entry. Every request body is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

use crate::client::GuidelinesClient;
use crate::config::ApiClientConfig;

#[derive(Default)]
struct Shared {
    routes: HashMap<String, VecDeque<(u16, String)>>,
    seen: Vec<(String, Bytes)>,
}

#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Mutex<Shared>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&shared));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, shared }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client with test-speed poll cadences.
    pub fn client(&self) -> GuidelinesClient {
        let mut config = ApiClientConfig::with_base_url(&self.base_url());
        config.health_interval = Duration::from_millis(40);
        config.init_poll_interval = Duration::from_millis(20);
        config.refresh_delay = Duration::from_millis(10);
        GuidelinesClient::new(config).unwrap()
    }

    pub fn respond(&self, path: &str, status: u16, body: serde_json::Value) {
        self.respond_raw(path, status, &body.to_string());
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        let mut shared = self.shared.lock().unwrap();
        shared
            .routes
            .insert(path.to_string(), VecDeque::from([(status, body.to_string())]));
    }

    /// Queue responses served in order; the final one repeats.
    pub fn respond_sequence(&self, path: &str, responses: Vec<(u16, serde_json::Value)>) {
        let mut shared = self.shared.lock().unwrap();
        shared.routes.insert(
            path.to_string(),
            responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        );
    }

    pub fn hits(&self, path: &str) -> usize {
        let shared = self.shared.lock().unwrap();
        shared.seen.iter().filter(|(p, _)| p == path).count()
    }

    /// JSON bodies received on `path` (`Null` for empty or non-JSON bodies).
    pub fn requests(&self, path: &str) -> Vec<serde_json::Value> {
        let shared = self.shared.lock().unwrap();
        shared
            .seen
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| serde_json::from_slice(body).unwrap_or(serde_json::Value::Null))
            .collect()
    }

    /// Raw bodies received on `path`.
    pub fn raw_requests(&self, path: &str) -> Vec<Bytes> {
        let shared = self.shared.lock().unwrap();
        shared
            .seen
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn handle(State(shared): State<Arc<Mutex<Shared>>>, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().to_string();
    let mut shared = shared.lock().unwrap();
    shared.seen.push((path.clone(), body));

    let Some(queue) = shared.routes.get_mut(&path) else {
        return (StatusCode::NOT_FOUND, r#"{"detail":"Not Found"}"#).into_response();
    };
    let (status, body) = if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap()
    };
    let status = StatusCode::from_u16(status).unwrap();
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
