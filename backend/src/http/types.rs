// Response payloads for the HTTP API.

use std::sync::Arc;

use serde::Serialize;

use telemetry_core::connection::ConnectionPhase;
use telemetry_core::model::Liveness;
use telemetry_core::router::IngestStats;
use telemetry_core::TelemetrySnapshot;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub source: &'static str,
    pub phase: ConnectionPhase,
    pub liveness: Liveness,
    pub stats: IngestStats,
}

#[derive(Serialize)]
pub struct StateResponse {
    pub schema_version: &'static str,
    pub timestamp_ms: u64,
    pub source: &'static str,
    pub state: Arc<TelemetrySnapshot>,
}
