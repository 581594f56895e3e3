//! HTTP surface: routes, shared state and middleware.

use std::any::Any;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::common::error::{ErrorCode, PropvalError};
use crate::common::log::{log_event, Level};
use crate::inference::domain::{parse_body, HealthStatus, PredictionResult};
use crate::inference::service::InferenceService;

use super::docs;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<InferenceService>,
}

/// Build the application router around an already loaded service.
pub fn router(service: Arc<InferenceService>) -> Router {
    let routes = Router::new()
        .route("/", get(home))
        .route("/docs", get(docs::swagger_ui))
        .route("/openapi.json", get(docs::openapi))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(AppState { service });
    with_middleware(routes)
}

/// Request tracing and panic recovery shared by every route.
fn with_middleware(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

async fn home() -> Redirect {
    Redirect::temporary("/docs")
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, PropvalError> {
    state.service.health().map(Json)
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Result<Json<PredictionResult>, PropvalError> {
    let raw = parse_body(&body).map_err(PropvalError::Validation)?;
    state.service.predict(&raw).map(Json)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = msg, "handler panicked");
    log_event(Level::Error, "api", "panic", ErrorCode::Internal, 0);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal server error" })),
    )
        .into_response()
}
