//! Illustrative daemon glue: wires [`EpsLimiter`] and [`ResponseEnvelope`]
//! into a tiny Axum surface the way the teacher's `src/lib.rs` wires
//! `AppState`/`app()` for `main.rs` to serve. This module demonstrates the
//! core in the same "daemon + HTTP surface" shape the teacher ships; per
//! SPEC_FULL.md §2 it is illustrative scaffolding, not part of the core's
//! tested contract — `src/envelope.rs` and `src/limiter/mod.rs` carry that.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::envelope::OK;
use crate::{EpsLimiter, ResponseEnvelope};

#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<EpsLimiter>,
}

/// Wraps [`ResponseEnvelope`] so this module can implement
/// [`IntoResponse`] without the pure value layer in `envelope` taking on
/// an Axum dependency.
struct JsonEnvelope(ResponseEnvelope);

impl IntoResponse for JsonEnvelope {
    fn into_response(self) -> Response {
        let status = if self.0.error() == OK {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            self.0.to_string(),
        )
            .into_response()
    }
}

/// Builds the demo router: a health check, a configuration/pool snapshot,
/// and an ingestion endpoint that admits one synthetic event per request.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/status", get(status_handler))
        .route("/ingest", post(ingest_handler))
        .with_state(state)
}

async fn healthz_handler() -> JsonEnvelope {
    JsonEnvelope(ResponseEnvelope::from_message("ok"))
}

async fn status_handler(State(state): State<AppState>) -> JsonEnvelope {
    let snap = state.limiter.snapshot();
    let data = json!({
        "enabled": snap.enabled,
        "eps": snap.eps,
        "timeframe": snap.timeframe,
        "maxEvents": snap.max_events,
        "availableCredits": state.limiter.available_credits(),
        "waitCounter": state.limiter.wait_counter(),
    });
    JsonEnvelope(ResponseEnvelope::new(data, 0, None))
}

/// Accepts one synthetic event: blocks on `acquire_credit()` before
/// admitting it, exactly as the daemon's ingestion loop would for a real
/// event.
async fn ingest_handler(State(state): State<AppState>) -> JsonEnvelope {
    state.limiter.acquire_credit().await;
    JsonEnvelope(ResponseEnvelope::from_message("admitted"))
}
