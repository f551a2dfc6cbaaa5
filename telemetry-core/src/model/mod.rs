// Core data models for vehicle snapshots, wheel samples and discrete events.

mod event;
mod sample;
mod state;

pub use event::{Event, EventType, Severity};
pub use sample::{InvalidWheel, WheelId, WheelPoint, WheelSample};
pub use state::{ActuatorState, Direction, FixQuality, GpsState, Liveness, OperatingState};
