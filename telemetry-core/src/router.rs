// Message classification and the single mutation entry point for telemetry state.
// Invariants: no input ever panics or propagates; every drop is counted by class.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::buffers::TimeSeriesBuffer;
use crate::connection::ConnectionStatus;
use crate::event_log::EventLog;
use crate::model::{ActuatorState, Event, GpsState, Liveness, WheelId, WheelPoint, WheelSample};
use crate::parser::{decode_frame, Decoded, Message, SpeedReading};

pub const DEFAULT_WHEEL_HISTORY: usize = 90;
pub const DEFAULT_EVENT_LOG: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied(&'static str),
    Malformed,
    UnknownTag,
    InvalidValue,
}

impl RouteOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, RouteOutcome::Applied(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub malformed: u64,
    pub unknown_tag: u64,
    pub invalid_value: u64,
    pub rejected_after_stop: u64,
}

#[derive(Debug, Clone)]
pub struct TelemetryState {
    pub gps: GpsState,
    pub actuator: ActuatorState,
    wheels: [TimeSeriesBuffer<WheelPoint>; WheelId::COUNT],
    events: EventLog,
}

impl TelemetryState {
    pub fn new(wheel_history: usize, event_log: usize) -> Self {
        Self {
            gps: GpsState::default(),
            actuator: ActuatorState::default(),
            wheels: std::array::from_fn(|_| TimeSeriesBuffer::new(wheel_history)),
            events: EventLog::new(event_log),
        }
    }

    pub fn wheel(&self, wheel: WheelId) -> &TimeSeriesBuffer<WheelPoint> {
        &self.wheels[wheel.index()]
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new(DEFAULT_WHEEL_HISTORY, DEFAULT_EVENT_LOG)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    state: TelemetryState,
    stats: IngestStats,
}

impl MessageRouter {
    pub fn new(wheel_history: usize, event_log: usize) -> Self {
        Self {
            state: TelemetryState::new(wheel_history, event_log),
            stats: IngestStats::default(),
        }
    }

    pub fn state(&self) -> &TelemetryState {
        &self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn route_frame(&mut self, frame: &str) -> RouteOutcome {
        match decode_frame(frame) {
            Ok(Decoded::Message(message)) => self.route(message),
            Ok(Decoded::UnknownTag(_)) => {
                self.stats.unknown_tag += 1;
                RouteOutcome::UnknownTag
            }
            Err(_) => self.reject_malformed(),
        }
    }

    pub fn reject_malformed(&mut self) -> RouteOutcome {
        self.stats.malformed += 1;
        RouteOutcome::Malformed
    }

    pub fn route(&mut self, message: Message) -> RouteOutcome {
        let tag = message.tag();
        match message {
            Message::Gps(gps) => self.state.gps = gps,
            Message::Actuator(actuator) => self.state.actuator = actuator,
            Message::Speed(reading) => {
                let Some(sample) = wheel_sample(reading) else {
                    self.stats.invalid_value += 1;
                    return RouteOutcome::InvalidValue;
                };
                self.state.wheels[sample.wheel.index()].append(sample.point());
            }
            Message::Event(event) => self.state.events.record(event),
        }
        self.stats.accepted += 1;
        RouteOutcome::Applied(tag)
    }

    pub fn note_rejected_after_stop(&mut self) {
        self.stats.rejected_after_stop += 1;
    }

    pub fn snapshot(&self, liveness: Liveness, connection: ConnectionStatus) -> TelemetrySnapshot {
        let wheels: BTreeMap<WheelId, Vec<WheelPoint>> = WheelId::ALL
            .iter()
            .map(|wheel| (*wheel, self.state.wheel(*wheel).snapshot()))
            .collect();
        let aggregate = aggregate_series(&wheels);
        TelemetrySnapshot {
            liveness,
            connection,
            gps: self.state.gps.clone(),
            actuator: self.state.actuator.clone(),
            events: self.state.events.snapshot(),
            wheels,
            aggregate,
            stats: self.stats,
        }
    }
}

fn wheel_sample(reading: SpeedReading) -> Option<WheelSample> {
    let wheel = WheelId::new(reading.wheel).ok()?;
    Some(WheelSample {
        ts: reading.ts,
        wheel,
        speed_kph: reading.speed_kph,
        pulses: reading.pulses,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AggregatePoint {
    pub ts: u64,
    pub avg: f64,
}

// Index-aligned average across all wheels, timed by wheel 1. Missing entries count as zero.
pub fn aggregate_series(wheels: &BTreeMap<WheelId, Vec<WheelPoint>>) -> Vec<AggregatePoint> {
    let Some(reference) = wheels.get(&WheelId::ALL[0]) else {
        return Vec::new();
    };
    reference
        .iter()
        .enumerate()
        .map(|(idx, point)| {
            let sum: f64 = WheelId::ALL
                .iter()
                .filter_map(|wheel| wheels.get(wheel).and_then(|series| series.get(idx)))
                .map(|entry| entry.speed)
                .sum();
            AggregatePoint {
                ts: point.ts,
                avg: sum / WheelId::COUNT as f64,
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub liveness: Liveness,
    pub connection: ConnectionStatus,
    pub gps: GpsState,
    pub actuator: ActuatorState,
    pub events: Vec<Event>,
    pub wheels: BTreeMap<WheelId, Vec<WheelPoint>>,
    pub aggregate: Vec<AggregatePoint>,
    pub stats: IngestStats,
}

impl TelemetrySnapshot {
    pub fn wheel(&self, wheel: WheelId) -> &[WheelPoint] {
        self.wheels.get(&wheel).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        MessageRouter::default().snapshot(Liveness::Offline, ConnectionStatus::default())
    }
}
