//! Loopback stand-in for the provider's identity endpoints.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Scripted provider behaviour plus a record of what it was sent.
pub struct StubProvider {
    pub valid_tokens: Vec<String>,
    pub expected_refresh_token: String,
    pub refresh_status: StatusCode,
    pub refresh_body: Value,
    /// Removed when the token endpoint is hit, to make the following save fail.
    pub delete_on_refresh: Option<PathBuf>,
    pub validate_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub seen_headers: Mutex<Vec<(Option<String>, Option<String>)>>,
    pub seen_forms: Mutex<Vec<HashMap<String, String>>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            valid_tokens: Vec::new(),
            expected_refresh_token: "r1".into(),
            refresh_status: StatusCode::OK,
            refresh_body: json!({
                "access_token": "xyz",
                "refresh_token": "r2",
                "expires_in": 14400,
                "token_type": "bearer"
            }),
            delete_on_refresh: None,
            validate_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            seen_headers: Mutex::new(Vec::new()),
            seen_forms: Mutex::new(Vec::new()),
        }
    }

    pub fn validate_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

async fn validate(
    State(stub): State<Arc<StubProvider>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.validate_calls.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let authorization = header("authorization");
    stub.seen_headers
        .lock()
        .unwrap()
        .push((authorization.clone(), header("client-id")));

    let token = authorization.as_deref().and_then(|a| a.strip_prefix("OAuth "));
    if token.is_some_and(|t| stub.valid_tokens.iter().any(|v| v == t)) {
        (
            StatusCode::OK,
            Json(json!({ "client_id": "cid", "login": "mybot", "expires_in": 3600 })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": 401, "message": "invalid access token" })),
        )
    }
}

async fn token(
    State(stub): State<Arc<StubProvider>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    stub.refresh_calls.fetch_add(1, Ordering::SeqCst);
    stub.seen_forms.lock().unwrap().push(form.clone());

    if let Some(path) = &stub.delete_on_refresh {
        let _ = fs::remove_dir_all(path);
    }

    let grant_ok = form.get("grant_type").map(String::as_str) == Some("refresh_token");
    let token_ok = form.get("refresh_token") == Some(&stub.expected_refresh_token);
    if !grant_ok || !token_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": 400, "message": "Invalid refresh token" })),
        );
    }

    (stub.refresh_status, Json(stub.refresh_body.clone()))
}

/// Serve the stub on an ephemeral loopback port; returns its base URL.
pub async fn serve(stub: Arc<StubProvider>) -> String {
    let app = Router::new()
        .route("/oauth2/validate", get(validate))
        .route("/oauth2/token", post(token))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Write a credential document holding the given tokens.
pub fn write_document(dir: &Path, access_token: &str, refresh_token: &str) -> PathBuf {
    let path = dir.join("config.json");
    let doc = json!({
        "token": "discord-bot-token",
        "botUsername": "MyBot",
        "botPassword": access_token,
        "twitchClientId": "cid",
        "twitchClientSecret": "secret",
        "twitchRefreshToken": refresh_token,
        "streamers": ["streamerone", "StreamerTwo"],
        "guildId": 123456789012345678u64
    });
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap() + "\n").unwrap();
    path
}
