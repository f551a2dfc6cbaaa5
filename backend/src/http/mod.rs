// HTTP handlers and routing.

use axum::extract::State as AxumState;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::constants::SCHEMA_VERSION;
use crate::utils::now_epoch_ms;
use crate::ws::ws_handler;

mod types;
pub use types::{HealthResponse, StateResponse};

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(get_state))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}

async fn health(AxumState(app_state): AxumState<AppState>) -> Json<HealthResponse> {
    let snapshot = app_state.current();
    Json(HealthResponse {
        status: "ok",
        source: app_state.source,
        phase: snapshot.connection.phase,
        liveness: snapshot.liveness,
        stats: snapshot.stats,
    })
}

async fn get_state(AxumState(app_state): AxumState<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        schema_version: SCHEMA_VERSION,
        timestamp_ms: now_epoch_ms(),
        source: app_state.source,
        state: app_state.current(),
    })
}
