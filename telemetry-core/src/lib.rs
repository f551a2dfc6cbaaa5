// Shared telemetry decoding, bounded state and connection logic.

pub mod buffers;
pub mod connection;
pub mod event_log;
pub mod model;
pub mod parser;
pub mod router;

pub use router::{MessageRouter, TelemetrySnapshot};
