#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// In-process stand-in for the panel API, with per-route hit counters and
/// optional artificial delays.
pub struct MockBackend {
    pub hits: Mutex<HashMap<String, usize>>,
    pub slow_ms: Mutex<HashMap<String, u64>>,
    pub user: Mutex<Value>,
    pub pending: Mutex<Value>,
    pub history: Mutex<Value>,
    pub services: Mutex<Value>,
    pub create_resp: Mutex<Value>,
    pub last_register_body: Mutex<Option<Value>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: Mutex::new(HashMap::new()),
            slow_ms: Mutex::new(HashMap::new()),
            user: Mutex::new(json!({ "telegram_id": 777 })),
            pending: Mutex::new(json!([])),
            history: Mutex::new(json!([])),
            services: Mutex::new(json!([])),
            create_resp: Mutex::new(json!({})),
            last_register_body: Mutex::new(None),
        })
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn set_slow(&self, route: &str, ms: u64) {
        self.slow_ms.lock().unwrap().insert(route.to_string(), ms);
    }

    async fn enter(&self, route: &str) {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_insert(0) += 1;
        let delay = self.slow_ms.lock().unwrap().get(route).copied().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

pub async fn spawn_backend(backend: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/user/user", post(register))
        .route("/user/user/me", post(me))
        .route("/subscription/services", get(services))
        .route("/payments/user/{user_id}/pending", get(pending))
        .route("/payments/user/{user_id}/history", get(history))
        .route("/payments/user/{user_id}/create", post(create))
        .route("/counter", get(counter))
        .route("/missing", get(missing))
        .route("/broken", get(broken))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn register(
    State(backend): State<Arc<MockBackend>>,
    body: Option<Json<Value>>,
) -> Json<Value> {
    backend.enter("register").await;
    *backend.last_register_body.lock().unwrap() = body.map(|Json(v)| v);
    Json(backend.user.lock().unwrap().clone())
}

async fn me(State(backend): State<Arc<MockBackend>>) -> Json<Value> {
    backend.enter("me").await;
    Json(backend.user.lock().unwrap().clone())
}

async fn services(State(backend): State<Arc<MockBackend>>) -> Json<Value> {
    backend.enter("services").await;
    Json(backend.services.lock().unwrap().clone())
}

async fn pending(
    State(backend): State<Arc<MockBackend>>,
    Path(_user_id): Path<i64>,
) -> Json<Value> {
    backend.enter("pending").await;
    Json(backend.pending.lock().unwrap().clone())
}

async fn history(
    State(backend): State<Arc<MockBackend>>,
    Path(_user_id): Path<i64>,
) -> Json<Value> {
    backend.enter("history").await;
    Json(json!({ "payments": backend.history.lock().unwrap().clone() }))
}

async fn create(
    State(backend): State<Arc<MockBackend>>,
    Path(_user_id): Path<i64>,
    Json(_body): Json<Value>,
) -> Json<Value> {
    backend.enter("create").await;
    Json(backend.create_resp.lock().unwrap().clone())
}

async fn counter(State(backend): State<Arc<MockBackend>>) -> Json<Value> {
    backend.enter("counter").await;
    Json(json!({ "n": backend.hits("counter") }))
}

async fn missing(State(backend): State<Arc<MockBackend>>) -> (StatusCode, Json<Value>) {
    backend.enter("missing").await;
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "comment": "payment not found" })),
    )
}

async fn broken(State(backend): State<Arc<MockBackend>>) -> (StatusCode, &'static str) {
    backend.enter("broken").await;
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}
