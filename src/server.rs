//! Axum router and request handlers for the relay.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::AppState;
use crate::assistant::{
    AssistantSettings, ExchangeError, Exchanger, HttpAssistantClient, ThreadId,
};
use crate::config::AppConfig;
use crate::session::{SessionStore, TranscriptEntry};
use crate::ui;

/// Start the relay server with the provided configuration.
pub async fn start_server(
    config: Arc<AppConfig>,
    settings: AssistantSettings,
) -> anyhow::Result<()> {
    info!(
        name: "assistant.config.loaded",
        base_url = %settings.base_url,
        assistant_id = %settings.assistant_id,
        "Assistant configuration loaded"
    );

    let client = HttpAssistantClient::new(
        settings.clone(),
        Duration::from_secs(config.exchange.upstream_timeout_secs),
    )?;
    let exchanger = Arc::new(Exchanger::new(
        Arc::new(client),
        settings.assistant_id.clone(),
        config.exchange.to_settings(),
    ));

    let state = AppState {
        exchanger,
        sessions: SessionStore::new(),
        assistant_id: settings.assistant_id,
    };

    let app = router(state, Duration::from_secs(config.server.request_timeout_secs));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the relay router.
///
/// The widget is served same-origin but the relay also allows cross-origin
/// embedding, matching how the original page injected the script.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/widget.js", get(widget_script_handler))
        .route("/config", get(config_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/{thread_id}/messages", get(transcript_handler))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Demo page embedding the widget.
async fn index_handler() -> impl IntoResponse {
    Html(ui::demo_page())
}

/// The widget bootstrap script.
async fn widget_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        ui::widget_script(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Response from the widget configuration endpoint.
///
/// Deliberately excludes the API credential; the relay is the only holder.
#[derive(Debug, Serialize)]
struct ConfigResponse {
    /// Assistant identifier the relay runs exchanges against.
    assistant_id: String,
}

/// Request body for the chat relay.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    message: String,
    /// Thread id from a previous exchange, or null for a fresh conversation.
    #[serde(default)]
    thread_id: Option<String>,
}

/// Response from the chat relay.
#[derive(Debug, Serialize)]
struct ChatResponse {
    /// Assistant reply text.
    reply: String,
    /// Thread id to send on the next exchange.
    thread_id: String,
}

/// JSON error payload.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// GET /config - Widget configuration.
async fn config_handler(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        assistant_id: state.assistant_id.clone(),
    })
}

/// POST /chat - Relay one user message and return the assistant reply.
async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "message must not be empty",
        ));
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let thread_id = req
        .thread_id
        .filter(|id| !id.trim().is_empty())
        .map(ThreadId);

    tracing::info!(
        request_id = %request_id,
        message_length = message.len(),
        thread_id = ?thread_id,
        "Received chat request"
    );

    match state.exchanger.exchange(thread_id, message).await {
        Ok((thread, reply)) => {
            // Transcript preserves exchange order: user message, then reply.
            let session = state.sessions.get_or_create(thread.as_str());
            session.add_user_message(message);
            session.add_assistant_message(&reply);

            tracing::info!(
                request_id = %request_id,
                thread_id = %thread,
                reply_length = reply.len(),
                "Chat request processed"
            );

            Ok(Json(ChatResponse {
                reply,
                thread_id: thread.to_string(),
            }))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Exchange failed");
            let status = match &e {
                ExchangeError::RunTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
                ExchangeError::Api(_)
                | ExchangeError::RunFailed { .. }
                | ExchangeError::UnexpectedShape => StatusCode::BAD_GATEWAY,
            };
            Err(error_response(status, e.to_string()))
        }
    }
}

/// GET /chat/{thread_id}/messages - Locally recorded transcript for a thread.
async fn transcript_handler(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<TranscriptEntry>>, StatusCode> {
    match state.sessions.get(&thread_id) {
        Some(session) => Ok(Json(session.messages())),
        None => Err(StatusCode::NOT_FOUND),
    }
}
