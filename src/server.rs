//! HTTP surface: translation and narration endpoints plus health and metrics.

use crate::content::{InlineItem, ItemId, TranslationResult};
use crate::i18n::{Language, MetricsReport, TranslationMetrics};
use crate::resolver::{ResolveError, Resolver, TranslationRequest};
use crate::security::{is_authorized, API_KEY_HEADER};
use crate::speech::{SpeechCache, SpeechError};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub speech: Arc<SpeechCache>,
    pub api_key: Option<String>,
    pub metrics: &'static TranslationMetrics,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>, speech: Arc<SpeechCache>, api_key: Option<String>) -> Self {
        Self {
            resolver,
            speech,
            api_key,
            metrics: TranslationMetrics::global(),
        }
    }
}

/// Errors returned to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("upstream provider is rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ResolveError> for AppError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Validation(e) => AppError::BadRequest(e.to_string()),
            ResolveError::NotFound => AppError::NotFound("Tourist spot not found".to_string()),
            ResolveError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<SpeechError> for AppError {
    fn from(error: SpeechError) -> Self {
        match error {
            SpeechError::EmptyText | SpeechError::TooLong { .. } => {
                AppError::BadRequest(error.to_string())
            }
            SpeechError::NotConfigured => {
                AppError::ServiceUnavailable("Speech provider is not configured".to_string())
            }
            SpeechError::RateLimited { retry_after } => AppError::RateLimited { retry_after },
            SpeechError::Provider(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        // Internal details stay in the logs
        let message = match &self {
            AppError::Internal(e) => {
                error!("Request failed: {:#}", e);
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        let retry_after = match self {
            AppError::RateLimited { retry_after } => retry_after,
            _ => None,
        };
        if let Some(secs) = retry_after {
            body["retryAfter"] = json!(secs);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
    pub item_id: Option<String>,
    pub target_language: Option<String>,
    pub inline_item: Option<InlineItem>,
}

#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    pub audio_content: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/translate", post(translate))
        .route("/speech", post(speech))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if is_authorized(state.api_key.as_deref(), provided) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsReport> {
    Json(state.metrics.report())
}

async fn translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<TranslateBody>, JsonRejection>,
) -> Result<Json<TranslationResult>, AppError> {
    authorize(&state, &headers)?;

    if !state.resolver.has_provider() {
        return Err(AppError::ServiceUnavailable(
            "Translation provider is not configured".to_string(),
        ));
    }

    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let target_code = body
        .target_language
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("targetLanguage is required".to_string()))?;
    let target =
        Language::from_code(target_code).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let request = TranslationRequest {
        item_id: body
            .item_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ItemId::parse),
        inline_item: body.inline_item,
        target,
    };

    let translation = state.resolver.resolve_request(&request).await?;
    Ok(Json(translation))
}

async fn speech(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SpeechBody>, JsonRejection>,
) -> Result<Json<SpeechResponse>, AppError> {
    authorize(&state, &headers)?;

    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let text = body.text.unwrap_or_default();

    let audio = state.speech.narrate(&text).await?;

    Ok(Json(SpeechResponse {
        audio_content: BASE64.encode(audio),
    }))
}

/// Serve until Ctrl+C or SIGTERM, then flush background writes.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = router(Arc::clone(&state));

    let address = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&address)
        .await
        .context(format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped, flushing pending writes");
    state.resolver.drain_pending().await;
    state.speech.drain_pending().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
