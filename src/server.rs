use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::client::ChatClient;
use crate::model::{DEFAULT_TEMPERATURE, GenerateOptions};
use crate::retry::{Sleeper, TokioSleeper};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    Rejected { status: StatusCode, detail: String },
    Upstream(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Invalid(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            Self::Rejected { status, detail } => (status, detail),
            Self::Upstream(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub struct AppState<S = TokioSleeper> {
    client: Arc<ChatClient<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(client: ChatClient<S>) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: Sleeper + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate", post(generate::<S>))
        .layer(cors)
        .with_state(state)
}

async fn generate<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError>
where
    S: Sleeper + 'static,
{
    let Json(req) = payload.inspect_err(|rejection| {
        warn!(status = %rejection.status(), "rejected generate request body");
    })?;
    if req.prompt.trim().is_empty() {
        return Err(ApiError::Invalid("prompt must not be empty".to_string()));
    }
    if req.max_tokens == Some(0) {
        return Err(ApiError::Invalid(
            "max_tokens must be a positive integer".to_string(),
        ));
    }

    let options = GenerateOptions {
        temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: req.max_tokens,
        ..GenerateOptions::default()
    };

    match state.client.generate_code(&req.prompt, &options).await {
        Ok(code) => Ok(Json(GenerateResponse { code })),
        Err(err) => {
            warn!(error = %err, "generate request failed");
            Err(ApiError::Upstream(err.to_string()))
        }
    }
}

/// Serves the API on `listener` until Ctrl-C.
pub async fn serve<S>(listener: TcpListener, state: AppState<S>) -> std::io::Result<()>
where
    S: Sleeper + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "codebot server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
