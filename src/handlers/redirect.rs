use crate::{error::StoreError, AppState};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// Resolve the short code and answer with a permanent redirect to its
/// origin, or 404 if the code was never allocated.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    tracing::debug!("Redirect requested for '{}'", code);

    match state
        .store
        .resolve_within(&code, state.config.request_timeout)
        .await
    {
        Ok(origin) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, origin)]).into_response(),
        Err(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, format!("'/{code}' is not found.\n")).into_response()
        }
        Err(e) if e.is_transient() => {
            tracing::warn!("Lookup of '{}' did not finish: {}", code, e);
            (StatusCode::SERVICE_UNAVAILABLE, "Try again later.\n").into_response()
        }
        Err(e) => {
            tracing::error!("Lookup of '{}' failed: {:?}", code, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.\n").into_response()
        }
    }
}
