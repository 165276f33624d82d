//! The web API service and its chat page.

use std::io;
use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use plainchat_core::{
    ChatService, Conversation, Error as CoreError, NormalizedText,
    RequestParams, UserTurn,
};
use plainchat_model::{ErrorKind, ImageRef};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

const SERVICE_NAME: &str = "plainchat";
const INDEX_HTML: &str = include_str!("server/index.html");

/// Shared state of the web service.
#[derive(Clone)]
pub struct AppState {
    chat: Option<ChatService>,
    default_model: String,
}

impl AppState {
    /// Creates the state. `chat` is `None` when no credential is set, in
    /// which case chat requests are answered with 503.
    #[inline]
    pub fn new<S: Into<String>>(chat: Option<ChatService>, default_model: S) -> Self {
        Self {
            chat,
            default_model: default_model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    model: Option<String>,
    temperature: Option<f32>,
    #[serde(alias = "max_tokens")]
    max_completion_tokens: Option<u32>,
    image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: NormalizedText,
    model: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::InvalidArgument(_) => {
                Self::new(StatusCode::BAD_REQUEST, format!("{err}"))
            }
            CoreError::Configuration(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, format!("{err}"))
            }
            CoreError::RemoteService(remote) => {
                error!("completion service failed: {remote}");
                let status = match remote.kind() {
                    ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                Self::new(
                    status,
                    format!(
                        "Sorry, the assistant could not answer right now ({}). \
                         Please try again later.",
                        remote.kind()
                    ),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Creates the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves until the process is interrupted.
pub async fn serve(addr: SocketAddr, state: AppState) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "api_key_configured": state.chat.is_some(),
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Some(service) = &state.chat else {
        return Err(CoreError::configuration("OPENAI_API_KEY is not set").into());
    };

    let image = match req.image_base64.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            ImageRef::from_data_uri(raw)
                .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, format!("{err}")))?,
        ),
        _ => None,
    };

    let defaults = RequestParams::default();
    let params = RequestParams {
        model: req.model.unwrap_or_else(|| state.default_model.clone()),
        temperature: req.temperature.unwrap_or(defaults.temperature),
        max_output_tokens: req
            .max_completion_tokens
            .unwrap_or(defaults.max_output_tokens),
    };
    let turn = UserTurn {
        text: req.message,
        image,
    };

    // Each web request is a conversation of its own.
    let outcome = service
        .process_turn(&Conversation::new(), turn, &params)
        .await?;
    if outcome.used_fallback_profile {
        warn!("model {} has no profile, request used the fallback", outcome.model);
    }

    Ok(Json(ChatResponse {
        response: outcome.reply,
        model: outcome.model,
    }))
}
