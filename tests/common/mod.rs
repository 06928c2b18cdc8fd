// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake identity backend and client helpers.

use authsession::config::Config;
use authsession::store::{MemoryStorage, Storage, StorageError, USER_KEY};
use authsession::AuthClient;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const GOOD_PASSWORD: &str = "secret123";
#[allow(dead_code)]
pub const TAKEN_EMAIL: &str = "taken@example.com";
#[allow(dead_code)]
pub const GOOD_ID_TOKEN: &str = "google-id-token";

/// One request seen by the fake backend.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct BackendState {
    hits: Mutex<Vec<Hit>>,
    valid_tokens: Mutex<HashSet<String>>,
    issued: AtomicU64,
    refresh_delay: Mutex<Duration>,
    display_name: Mutex<String>,
}

impl BackendState {
    fn record(&self, method: &str, path: &str, headers: &HeaderMap) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        self.hits.lock().push(Hit {
            method: method.to_string(),
            path: path.to_string(),
            authorization,
        });
    }

    fn issue_token(&self, user_id: u64, email: &str) -> Value {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access_token = format!("tok-{}", n);
        self.valid_tokens.lock().insert(access_token.clone());
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": 7200,
            "user_id": user_id,
            "email": email,
        })
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .is_some_and(|token| self.valid_tokens.lock().contains(token))
    }

    fn user(&self, id: u64, email: &str, provider: &str) -> Value {
        json!({
            "id": id,
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "display_name": self.display_name.lock().clone(),
            "is_active": true,
            "is_superuser": false,
            "oauth_provider": provider,
            "email_verified": provider == "google",
            "subscription_tier": "free",
            "created_at": "2025-01-01T00:00:00",
        })
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn unauthorized() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")
}

async fn login(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.record("POST", "/auth/login", &headers);
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"] != GOOD_PASSWORD {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    }
    Json(json!({ "user": s.user(1, email, "local"), "token": s.issue_token(1, email) }))
        .into_response()
}

async fn register(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.record("POST", "/auth/register", &headers);
    let email = body["email"].as_str().unwrap_or_default();
    if email == TAKEN_EMAIL {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }
    if body["password"] != body["confirm_password"] {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "confirm_password"], "msg": "Passwords do not match" }] })),
        )
            .into_response();
    }
    Json(json!({ "user": s.user(2, email, "local"), "token": s.issue_token(2, email) }))
        .into_response()
}

async fn google(
    State(s): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    s.record("POST", "/auth/google", &headers);
    if body["id_token"] != GOOD_ID_TOKEN {
        return detail(StatusCode::UNAUTHORIZED, "Google authentication failed");
    }
    let email = "oauth@example.com";
    Json(json!({ "user": s.user(3, email, "google"), "token": s.issue_token(3, email) }))
        .into_response()
}

async fn me(State(s): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    s.record("GET", "/auth/me", &headers);
    if !s.authorized(&headers) {
        return unauthorized();
    }
    Json(s.user(1, "user@example.com", "local")).into_response()
}

async fn refresh(State(s): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    s.record("POST", "/auth/refresh", &headers);
    if !s.authorized(&headers) {
        return unauthorized();
    }
    let delay = *s.refresh_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Json(s.issue_token(1, "user@example.com")).into_response()
}

async fn projects(State(s): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    s.record("GET", "/projects", &headers);
    if !s.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([{ "id": 1, "name": "demo" }])).into_response()
}

async fn broken(State(s): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    s.record("GET", "/broken", &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

/// Handle to a running fake backend.
#[derive(Clone)]
pub struct MockBackend {
    pub api_url: String,
    state: Arc<BackendState>,
}

#[allow(dead_code)]
impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        *state.display_name.lock() = "Test User".to_string();

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/google", post(google))
            .route("/auth/me", get(me))
            .route("/auth/refresh", post(refresh))
            .route("/projects", get(projects))
            .route("/broken", get(broken))
            .with_state(state.clone());
        let app = Router::new().nest("/api/v1", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.state.hits.lock().iter().filter(|h| h.path == path).count()
    }

    /// Server-side revocation of every issued token.
    pub fn revoke_all(&self) {
        self.state.valid_tokens.lock().clear();
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock() = delay;
    }

    pub fn set_display_name(&self, name: &str) {
        *self.state.display_name.lock() = name.to_string();
    }

    pub fn config(&self) -> Config {
        Config {
            api_url: self.api_url.clone(),
            http_timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    /// Client over fresh in-memory storage.
    pub fn client(&self) -> (AuthClient, MemoryStorage) {
        let storage = MemoryStorage::new();
        let client = self.client_with(Arc::new(storage.clone()));
        (client, storage)
    }

    pub fn client_with(&self, storage: Arc<dyn Storage>) -> AuthClient {
        AuthClient::new(self.config(), storage).expect("build client")
    }
}

/// In-memory storage whose user writes can be made to fail.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    fail_user_writes: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl FlakyStorage {
    pub fn fail_user_writes(&self, fail: bool) {
        self.fail_user_writes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for FlakyStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == USER_KEY && self.fail_user_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: USER_KEY.into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key)
    }
}

/// Config pointing at a port nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_config() -> Config {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Config {
        api_url: format!("http://{}", addr),
        http_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

/// Wait (bounded) until `check` holds.
#[allow(dead_code)]
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
