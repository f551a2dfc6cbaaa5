// Application state shared by the HTTP handlers, the websocket fan-out and background tasks.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use telemetry_core::TelemetrySnapshot;

use crate::constants::BROADCAST_CAPACITY;

#[derive(Clone)]
pub struct AppState {
    pub snapshots: watch::Receiver<Arc<TelemetrySnapshot>>,
    pub tx: broadcast::Sender<String>,
    pub sequence: Arc<AtomicU64>,
    pub start_instant: Instant,
    pub source: &'static str,
}

impl AppState {
    pub fn new(snapshots: watch::Receiver<Arc<TelemetrySnapshot>>, source: &'static str) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            snapshots,
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
            start_instant: Instant::now(),
            source,
        }
    }

    pub fn current(&self) -> Arc<TelemetrySnapshot> {
        self.snapshots.borrow().clone()
    }
}
