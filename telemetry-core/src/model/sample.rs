// Per-wheel speed samples and the fixed set of wheel channels.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wheel id {0} is outside 1..=4")]
pub struct InvalidWheel(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WheelId(u8);

impl WheelId {
    pub const COUNT: usize = 4;
    pub const ALL: [WheelId; 4] = [WheelId(1), WheelId(2), WheelId(3), WheelId(4)];

    pub fn new(id: i64) -> Result<Self, InvalidWheel> {
        match u8::try_from(id) {
            Ok(id @ 1..=4) => Ok(WheelId(id)),
            _ => Err(InvalidWheel(id)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for WheelId {
    type Error = InvalidWheel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WheelId::new(i64::from(value))
    }
}

impl From<WheelId> for u8 {
    fn from(value: WheelId) -> Self {
        value.0
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelSample {
    pub ts: u64,
    pub wheel: WheelId,
    pub speed_kph: f64,
    pub pulses: Option<u32>,
}

impl WheelSample {
    pub fn point(&self) -> WheelPoint {
        WheelPoint {
            ts: self.ts,
            speed: self.speed_kph,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelPoint {
    pub ts: u64,
    pub speed: f64,
}
