use crate::{error::StoreError, AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request and response body of `POST /api`.
///
/// All three fields are always present in responses; the unused ones are
/// empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenPayload {
    #[serde(rename = "Origin", default)]
    pub origin: String,
    #[serde(rename = "Tiny", default)]
    pub tiny: String,
    #[serde(rename = "Error", default)]
    pub error: String,
}

impl ShortenPayload {
    fn failure(message: &str) -> Json<Self> {
        Json(Self {
            error: message.to_owned(),
            ..Self::default()
        })
    }
}

/// POST /api
///
/// 1. Parse `{"Origin": "..."}` from the body.
/// 2. Make sure the origin is reachable before spending a row on it.
/// 3. Allocate (or reuse) the short code and return the full short URL.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // ── 1. Parse ───────────────────────────────────────────────────────────
    let request: ShortenPayload = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Rejected malformed shorten request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                ShortenPayload::failure(
                    "Request body must be JSON like {\"Origin\": \"https://...\"}.",
                ),
            )
                .into_response();
        }
    };

    // Stored verbatim; only a blank origin is refused here.
    let origin = request.origin.as_str();
    if origin.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            ShortenPayload::failure("Origin must not be empty."),
        )
            .into_response();
    }

    // ── 2. Reachability ────────────────────────────────────────────────────
    if let Err(e) = state.probe.check(origin).await {
        tracing::info!("Origin '{}' failed the reachability check: {}", origin, e);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            ShortenPayload::failure("Content of requested URL is invalid."),
        )
            .into_response();
    }

    // ── 3. Allocate ────────────────────────────────────────────────────────
    match state
        .store
        .allocate_within(origin, state.config.request_timeout)
        .await
    {
        Ok(code) => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
                .unwrap_or_else(|| state.config.bind_addr());

            Json(ShortenPayload {
                origin: origin.to_owned(),
                tiny: format!("{}://{}/{}", state.config.protocol, host, code),
                error: String::new(),
            })
            .into_response()
        }
        Err(StoreError::InvalidOrigin) => (
            StatusCode::BAD_REQUEST,
            ShortenPayload::failure("Origin must not be empty."),
        )
            .into_response(),
        Err(e) if e.is_transient() => {
            tracing::error!("Allocation for '{}' did not finish: {}", origin, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ShortenPayload::failure("Service is busy, please retry later."),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Allocation for '{}' failed: {:?}", origin, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ShortenPayload::failure("Internal server error."),
            )
                .into_response()
        }
    }
}
