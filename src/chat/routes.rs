//! HTTP surface: chat, forget, stub login, profile lookup and health.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::chat::orchestrator::ChatOrchestrator;
use crate::error::{ChatError, DatabaseError};
use crate::profile::{ANONYMOUS_PREFIX, ProfileUpdate};
use crate::tone::Tone;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 500 Internal Server Error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };
        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MissingUserId => ApiError::BadRequest(err.to_string()),
            ChatError::Storage(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        error!(error = %err, "Storage failure");
        ApiError::Internal("Something went wrong, please try again.".to_string())
    }
}

/// Shared state for the chat routes.
#[derive(Clone)]
pub struct ChatState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgetRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub user_id: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /chat
///
/// A request without a `user_id` gets a fresh anonymous id, which the client
/// should send back on later turns.
async fn chat(
    State(state): State<ChatState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ChatError::EmptyMessage.into());
    }
    let user_id = non_blank(req.user_id)
        .unwrap_or_else(|| format!("{ANONYMOUS_PREFIX}{}", uuid::Uuid::new_v4()));
    let tone = Tone::from_request(req.tone.as_deref());

    let response = state.orchestrator.handle(&user_id, &req.message, tone).await?;
    Ok(Json(ChatResponse { response, user_id }))
}

/// POST /chat/forget
async fn forget(
    State(state): State<ChatState>,
    Json(req): Json<ForgetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = non_blank(req.user_id)
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
    state.orchestrator.forget(&user_id).await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "message": "Chat history and profile cleared.",
    })))
}

/// POST /auth/google
///
/// Login stub: trusts the posted identity, records the user and makes sure
/// a profile exists for them.
async fn login(
    State(state): State<ChatState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = req.sub.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("sub is required".to_string()));
    }
    let store = state.orchestrator.store();
    store
        .upsert_user(user_id, req.name.as_deref(), req.email.as_deref())
        .await?;
    store.upsert_profile(user_id, &ProfileUpdate::new()).await?;

    info!(user_id, "User logged in");
    Ok(Json(serde_json::json!({"status": "ok", "user_id": user_id})))
}

/// GET /api/profile?user_id=
async fn get_profile(
    State(state): State<ChatState>,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    match state.orchestrator.store().get_profile(&query.user_id).await? {
        Some(profile) => Ok(Json(profile)),
        None => Err(ApiError::NotFound(format!(
            "No profile for user {}",
            query.user_id
        ))),
    }
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn root(State(state): State<ChatState>) -> impl IntoResponse {
    let name = state.orchestrator.persona().display_name();
    Json(serde_json::json!({"message": format!("{name} API is running")}))
}

/// Build the HTTP router.
pub fn chat_routes(state: ChatState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/chat", post(chat))
        .route("/chat/forget", post(forget))
        .route("/auth/google", post(login))
        .route("/api/profile", get(get_profile))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
