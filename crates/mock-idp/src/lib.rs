//! Mock identity provider for local development.
//!
//! Serves the two endpoints the credential lifecycle talks to:
//!
//! * `GET /oauth2/validate` — token introspection (`Authorization: OAuth <token>`).
//! * `POST /oauth2/token` — refresh-token grant with rotation: every successful
//!   refresh retires the presented refresh token and the access token minted
//!   with it.
//!
//! State lives in memory only; restarting the process resets it to the seed
//! pair given on the command line.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported to callers, shaped like the real provider's error body
/// (`{"status": ..., "message": ...}`).
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// Unknown, retired or missing access token.
    #[error("invalid access token")]
    InvalidAccessToken,

    /// Client id or secret does not match.
    #[error("invalid client")]
    InvalidClient,

    /// Only `refresh_token` is supported.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrant(String),

    /// Unknown or already-rotated refresh token.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
}

impl IdpError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAccessToken => StatusCode::UNAUTHORIZED,
            Self::InvalidClient => StatusCode::FORBIDDEN,
            Self::UnsupportedGrant(_) | Self::InvalidRefreshToken => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IdpError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "request rejected");
        (
            status,
            Json(json!({ "status": status.as_u16(), "message": self.to_string() })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Static identity the provider answers for.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Registered client id.
    pub client_id: String,
    /// Registered client secret.
    pub client_secret: String,
    /// Login reported by introspection.
    pub login: String,
    /// User id reported by introspection.
    pub user_id: String,
    /// Scopes granted to every token.
    pub scopes: Vec<String>,
    /// Lifetime reported for access tokens, in seconds.
    pub expires_in: u64,
}

impl Default for IdpConfig {
    fn default() -> Self {
        Self {
            client_id: "dev-client".into(),
            client_secret: "dev-secret".into(),
            login: "mybot".into(),
            user_id: "100000".into(),
            scopes: vec!["chat:read".into(), "chat:edit".into()],
            expires_in: 14_400,
        }
    }
}

/// In-memory token table.
#[derive(Debug)]
pub struct IdpState {
    config: IdpConfig,
    /// Live refresh token → the access token minted alongside it.
    live: Mutex<HashMap<String, String>>,
}

impl IdpState {
    /// Start with one live `(access_token, refresh_token)` pair.
    pub fn new(config: IdpConfig, access_token: &str, refresh_token: &str) -> Self {
        Self {
            config,
            live: Mutex::new(HashMap::from([(
                refresh_token.to_string(),
                access_token.to_string(),
            )])),
        }
    }

    /// Whether `access_token` is currently accepted.
    pub fn is_live(&self, access_token: &str) -> bool {
        self.table().values().any(|t| t == access_token)
    }

    /// Retire `refresh_token` and its access token; mint a new pair.
    pub fn rotate(&self, refresh_token: &str) -> Result<(String, String), IdpError> {
        let mut table = self.table();
        table
            .remove(refresh_token)
            .ok_or(IdpError::InvalidRefreshToken)?;
        let access = uuid::Uuid::new_v4().simple().to_string();
        let refresh = uuid::Uuid::new_v4().simple().to_string();
        table.insert(refresh.clone(), access.clone());
        Ok((access, refresh))
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of a successful `GET /oauth2/validate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Client the token was issued to.
    pub client_id: String,
    /// Login of the token owner.
    pub login: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// User id of the token owner.
    pub user_id: String,
    /// Remaining lifetime in seconds.
    pub expires_in: u64,
}

/// Form body of `POST /oauth2/token`.
#[derive(Debug, Deserialize)]
struct TokenRequest {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    grant_type: String,
    #[serde(default)]
    refresh_token: String,
}

/// Body of a successful `POST /oauth2/token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// New access token.
    pub access_token: String,
    /// New refresh token; the presented one is now retired.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Granted scopes.
    pub scope: Vec<String>,
    /// Always `bearer`.
    pub token_type: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /oauth2/validate`
async fn validate(
    State(state): State<Arc<IdpState>>,
    headers: HeaderMap,
) -> Result<Json<ValidateResponse>, IdpError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("OAuth ").or_else(|| v.strip_prefix("Bearer ")))
        .ok_or(IdpError::InvalidAccessToken)?;

    if !state.is_live(token) {
        return Err(IdpError::InvalidAccessToken);
    }

    info!(login = %state.config.login, "token validated");
    Ok(Json(ValidateResponse {
        client_id: state.config.client_id.clone(),
        login: state.config.login.clone(),
        scopes: state.config.scopes.clone(),
        user_id: state.config.user_id.clone(),
        expires_in: state.config.expires_in,
    }))
}

/// `POST /oauth2/token`
async fn token(
    State(state): State<Arc<IdpState>>,
    Form(req): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, IdpError> {
    if req.client_id != state.config.client_id || req.client_secret != state.config.client_secret {
        return Err(IdpError::InvalidClient);
    }
    if req.grant_type != "refresh_token" {
        return Err(IdpError::UnsupportedGrant(req.grant_type));
    }

    let (access_token, refresh_token) = state.rotate(&req.refresh_token)?;
    info!(client_id = %req.client_id, "refresh token rotated");

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        expires_in: state.config.expires_in,
        scope: state.config.scopes.clone(),
        token_type: "bearer".into(),
    }))
}

/// Build the provider's router.
pub fn router(state: Arc<IdpState>) -> Router {
    Router::new()
        .route("/oauth2/validate", get(validate))
        .route("/oauth2/token", post(token))
        .with_state(state)
}
