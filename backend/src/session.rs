// Session lifecycle: one producer, one sink, constructed once and torn down once.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use telemetry_core::TelemetrySnapshot;

use crate::config::{AppConfig, SourceMode};
use crate::connection::ConnectionManager;
use crate::producer::MessageProducer;
use crate::simulator::SimulatedSource;
use crate::telemetry::IngestSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Stopped,
}

pub struct TelemetrySession {
    producer: Box<dyn MessageProducer>,
    sink: IngestSink,
    phase: SessionPhase,
}

impl TelemetrySession {
    pub fn new(producer: Box<dyn MessageProducer>, sink: IngestSink) -> Self {
        Self {
            producer,
            sink,
            phase: SessionPhase::Idle,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let producer: Box<dyn MessageProducer> = match config.source {
            SourceMode::Live => Box::new(
                ConnectionManager::new(config.ws_url.clone(), config.reconnect)
                    .with_connect_timeout(config.connect_timeout),
            ),
            SourceMode::Simulated => Box::new(SimulatedSource::new(config.sim_seed)),
        };
        Self::new(producer, IngestSink::new(config.wheel_history, config.event_log))
    }

    pub fn source(&self) -> &'static str {
        self.producer.name()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn start(&mut self) {
        match self.phase {
            SessionPhase::Idle => {
                self.producer.start(self.sink.clone());
                self.phase = SessionPhase::Running;
                info!(source = self.source(), "telemetry session started");
            }
            SessionPhase::Running => {}
            SessionPhase::Stopped => warn!("telemetry session cannot restart after stop"),
        }
    }

    // Sink first, so nothing lands while the producer unwinds.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Stopped {
            return;
        }
        self.sink.close();
        self.producer.stop();
        self.phase = SessionPhase::Stopped;
        info!(source = self.source(), "telemetry session stopped");
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TelemetrySnapshot>> {
        self.sink.subscribe()
    }

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.sink.snapshot()
    }
}

impl Drop for TelemetrySession {
    fn drop(&mut self) {
        self.stop();
    }
}
