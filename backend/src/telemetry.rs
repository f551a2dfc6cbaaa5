// Telemetry state application shared by the live connection and the simulator.
// Invariants: every mutation goes through the router under one lock; nothing mutates after close.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use telemetry_core::connection::{ConnectionPhase, ConnectionStatus};
use telemetry_core::parser::Message;
use telemetry_core::router::{IngestStats, RouteOutcome};
use telemetry_core::{MessageRouter, TelemetrySnapshot};

struct IngestState {
    router: MessageRouter,
    connection: ConnectionStatus,
    closed: bool,
}

impl IngestState {
    fn snapshot(&self) -> TelemetrySnapshot {
        self.router.snapshot(self.connection.liveness, self.connection)
    }
}

#[derive(Clone)]
pub struct IngestSink {
    state: Arc<Mutex<IngestState>>,
    snapshots: Arc<watch::Sender<Arc<TelemetrySnapshot>>>,
}

impl IngestSink {
    pub fn new(wheel_history: usize, event_log: usize) -> Self {
        let state = IngestState {
            router: MessageRouter::new(wheel_history, event_log),
            connection: ConnectionStatus::default(),
            closed: false,
        };
        let (tx, _) = watch::channel(Arc::new(state.snapshot()));
        Self {
            state: Arc::new(Mutex::new(state)),
            snapshots: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TelemetrySnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn stats(&self) -> IngestStats {
        self.lock().router.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    // None once the sink is closed.
    pub fn accept_frame(&self, frame: &str) -> Option<RouteOutcome> {
        self.apply(|router| router.route_frame(frame))
    }

    pub fn accept_bytes(&self, bytes: &[u8]) -> Option<RouteOutcome> {
        match std::str::from_utf8(bytes) {
            Ok(frame) => self.accept_frame(frame),
            Err(_) => self.apply(MessageRouter::reject_malformed),
        }
    }

    pub fn accept_message(&self, message: Message) -> Option<RouteOutcome> {
        self.apply(|router| router.route(message))
    }

    pub fn set_connection(&self, status: ConnectionStatus) -> bool {
        let mut state = self.lock();
        if state.closed {
            state.router.note_rejected_after_stop();
            return false;
        }
        if state.connection == status {
            return true;
        }
        if state.connection.liveness != status.liveness {
            info!(liveness = %status.liveness, phase = ?status.phase, "liveness changed");
        }
        state.connection = status;
        self.publish(&state);
        true
    }

    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.connection = ConnectionStatus {
            phase: ConnectionPhase::Stopped,
            ..ConnectionStatus::default()
        };
        self.publish(&state);
        state.closed = true;
        info!("ingest closed");
    }

    fn apply<F>(&self, route: F) -> Option<RouteOutcome>
    where
        F: FnOnce(&mut MessageRouter) -> RouteOutcome,
    {
        let mut state = self.lock();
        if state.closed {
            state.router.note_rejected_after_stop();
            return None;
        }
        let outcome = route(&mut state.router);
        match outcome {
            RouteOutcome::Applied(_) => self.publish(&state),
            dropped => debug!(outcome = ?dropped, "telemetry message dropped"),
        }
        Some(outcome)
    }

    fn publish(&self, state: &IngestState) {
        self.snapshots.send_replace(Arc::new(state.snapshot()));
    }

    fn lock(&self) -> MutexGuard<'_, IngestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_core::model::{Liveness, WheelId};

    fn online() -> ConnectionStatus {
        ConnectionStatus {
            phase: ConnectionPhase::Connected,
            liveness: Liveness::Online,
            retry_count: 0,
            next_retry_ms: None,
        }
    }

    #[test]
    fn accepted_frames_publish_snapshots() {
        let sink = IngestSink::new(90, 200);
        let mut rx = sink.subscribe();
        let outcome = sink.accept_frame(r#"{"type":"speed","data":{"ts":1000,"wheel":3,"speed_kph":42.5}}"#);
        assert_eq!(outcome, Some(RouteOutcome::Applied("speed")));
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.wheel(WheelId::new(3).unwrap()).len(), 1);
        assert_eq!(snapshot.stats.accepted, 1);
    }

    #[test]
    fn dropped_frames_do_not_publish() {
        let sink = IngestSink::new(90, 200);
        let mut rx = sink.subscribe();
        rx.borrow_and_update();
        assert_eq!(sink.accept_frame("not json"), Some(RouteOutcome::Malformed));
        assert_eq!(sink.accept_bytes(&[0xff, 0xfe]), Some(RouteOutcome::Malformed));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sink.stats().malformed, 2);
    }

    #[test]
    fn liveness_follows_connection_status() {
        let sink = IngestSink::new(90, 200);
        assert_eq!(sink.snapshot().liveness, Liveness::Offline);
        assert!(sink.set_connection(online()));
        assert_eq!(sink.snapshot().liveness, Liveness::Online);
        assert_eq!(sink.snapshot().connection.phase, ConnectionPhase::Connected);
    }

    #[test]
    fn close_gates_every_write() {
        let sink = IngestSink::new(90, 200);
        sink.set_connection(online());
        sink.accept_frame(r#"{"type":"speed","data":{"ts":1,"wheel":1,"speed_kph":3}}"#);
        sink.close();

        let frozen = sink.snapshot();
        assert_eq!(frozen.liveness, Liveness::Offline);
        assert_eq!(frozen.connection.phase, ConnectionPhase::Stopped);
        assert_eq!(frozen.wheel(WheelId::new(1).unwrap()).len(), 1);

        assert_eq!(sink.accept_frame(r#"{"type":"speed","data":{"ts":2,"wheel":1,"speed_kph":3}}"#), None);
        assert!(!sink.set_connection(online()));
        assert_eq!(*sink.snapshot(), *frozen);
        assert!(sink.is_closed());
        assert_eq!(sink.stats().rejected_after_stop, 2);
    }
}
