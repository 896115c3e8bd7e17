//! HTTP routes for the chat service
//!
//! Single-shot endpoints answer with `{"response": ...}`; the streaming
//! endpoints emit server-sent events whose data lines are
//! [`StreamEvent`] records.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use copilot_graph::{ChatResponse, ChatService, StreamEvent};
use copilot_llm::ImageSource;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ChatService>,
    pub uploads_dir: PathBuf,
}

impl ApiState {
    pub fn new(service: ChatService, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            service: Arc::new(service),
            uploads_dir: uploads_dir.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
}

/// Failure answered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<copilot_core::Error> for ApiError {
    fn from(err: copilot_core::Error) -> Self {
        warn!(kind = err.kind(), error = %err, "Chat run failed");
        Self::Internal(err.to_string())
    }
}

/// Build the application router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agent/chat", post(chat))
        .route("/agent/chat-with-image", post(chat_with_image))
        .route("/agent/chat-stream", post(chat_stream).get(chat_stream_query))
        .route("/agent/chat-with-image-stream", post(chat_with_image_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the routes on `addr` until the process stops
pub async fn serve(state: ApiState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = required_message(&req.message)?;
    let response = state.service.chat(message).await?;
    Ok(Json(ChatResponse { response }))
}

async fn chat_with_image(
    State(state): State<ApiState>,
    Json(req): Json<ImageChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = required_message(&req.message)?;
    let image = load_image(&state.uploads_dir, &req.filename).await?;
    let response = state.service.chat_with_image(message, image).await?;
    Ok(Json(ChatResponse { response }))
}

async fn chat_stream(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let message = required_message(&req.message)?;
    Ok(sse(state.service.chat_stream(message)))
}

async fn chat_stream_query(
    State(state): State<ApiState>,
    Query(req): Query<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let message = required_message(&req.message)?;
    Ok(sse(state.service.chat_stream(message)))
}

async fn chat_with_image_stream(
    State(state): State<ApiState>,
    Json(req): Json<ImageChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let message = required_message(&req.message)?;
    let image = load_image(&state.uploads_dir, &req.filename).await?;
    Ok(sse(state.service.chat_with_image_stream(message, image).await))
}

fn sse(events: BoxStream<'static, StreamEvent>) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    Sse::new(events.map(|event| Event::default().json_data(event))).keep_alive(KeepAlive::default())
}

fn required_message(message: &str) -> Result<&str, ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }
    Ok(message)
}

/// Resolve a bare filename inside the uploads directory
fn image_path(uploads_dir: &Path, filename: &str) -> Result<PathBuf, ApiError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Filename is required".to_string()));
    }
    if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
        return Err(ApiError::BadRequest("Invalid filename".to_string()));
    }
    Ok(uploads_dir.join(filename))
}

async fn load_image(uploads_dir: &Path, filename: &str) -> Result<ImageSource, ApiError> {
    let path = image_path(uploads_dir, filename)?;
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }
    copilot_market::vision::image_from_file(&path)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}
