use crate::{
    backend::DetectionBackend,
    handler::{InvocationError, InvocationRequest, handle},
    service::Detector,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

/// Path the function runtime interface emulator listens on, so the same
/// client tooling works against a local server.
pub const INVOCATION_PATH: &str = "/2015-03-31/functions/function/invocations";

pub fn router<B>(detector: Arc<Detector<B>>) -> Router
where
    B: DetectionBackend + Send + 'static,
{
    Router::new()
        .route(INVOCATION_PATH, post(invoke::<B>))
        .route("/health", get(health))
        .with_state(detector)
}

async fn invoke<B>(
    State(detector): State<Arc<Detector<B>>>,
    Json(request): Json<InvocationRequest>,
) -> Response
where
    B: DetectionBackend + Send + 'static,
{
    match handle(&detector, request, None).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(InvocationError::from(&e))).into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}
