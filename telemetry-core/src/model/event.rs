// Discrete occurrences reported by the vehicle (faults, tamper, state changes).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Tamper,
    Fault,
    StateChange,
    Log,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ts: u64,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "level", default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub message: String,
}

impl Event {
    pub fn new(ts: u64, kind: EventType, severity: Option<Severity>, message: impl Into<String>) -> Self {
        Self {
            ts,
            kind,
            severity,
            message: message.into(),
        }
    }
}
