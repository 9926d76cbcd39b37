//! HTTP surface for the suggestion service.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/suggestions` | Suggestions for a trip request; always `200` |
//! | `GET /api/suggestions/stats` | Cache counters and sizes |
//! | `POST /api/seeds/reload` | Re-read the configured seed file |
//! | `GET /healthz` | Liveness check |

use crate::config::ServiceConfig;
use crate::service::{ServiceStats, SuggestionService};
use crate::suggestions::SuggestionResponse;
use crate::Result;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Largest suggestion request body read; anything bigger gets the defaults.
pub const SUGGESTION_BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SuggestionService>,
    pub seeds_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(service: Arc<SuggestionService>) -> Self {
        Self {
            service,
            seeds_path: None,
        }
    }

    pub fn with_seeds_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.seeds_path = Some(path.into());
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
            )
        });

    Router::new()
        .route(
            "/api/suggestions",
            post(suggestions).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/suggestions/stats", get(stats))
        .route("/api/seeds/reload", post(reload_seeds))
        .route("/healthz", get(health))
        .layer(trace_layer)
        .with_state(state)
}

async fn suggestions(State(state): State<AppState>, body: Body) -> Json<SuggestionResponse> {
    match axum::body::to_bytes(body, SUGGESTION_BODY_LIMIT).await {
        Ok(bytes) => Json(state.service.handle_bytes(&bytes).await),
        Err(e) => {
            tracing::warn!(error = %e, limit = SUGGESTION_BODY_LIMIT, "unreadable suggestion body");
            Json(SuggestionService::failure_response(format!(
                "request body rejected: {}",
                e
            )))
        }
    }
}

async fn stats(State(state): State<AppState>) -> Json<ServiceStats> {
    Json(state.service.stats())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn reload_seeds(State(state): State<AppState>) -> Response {
    let Some(path) = state.seeds_path.as_ref() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "no seed file configured" })),
        )
            .into_response();
    };
    match state.service.reload_seeds(path) {
        Ok(count) => Json(json!({ "seeds": count })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "seed reload rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Build the service from `config` and serve until `shutdown` resolves.
pub async fn serve<F>(config: ServiceConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = Arc::new(SuggestionService::from_config(&config)?);
    let mut state = AppState::new(service);
    if let Some(path) = &config.seeds_path {
        state = state.with_seeds_path(path.clone());
    }
    let app = build_router(state);

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "where-next listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
