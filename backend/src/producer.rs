// Message producer capability shared by the live connection and the simulator.

use crate::telemetry::IngestSink;

// `start` spawns onto the current tokio runtime and returns immediately.
// `stop` closes the sink before returning; no write lands after it.
pub trait MessageProducer: Send {
    fn name(&self) -> &'static str;

    fn start(&mut self, sink: IngestSink);

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
