// Latest-value snapshots for GPS and actuator channels.
// Invariants: both are replaced wholesale on every message; fields are never merged.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FixQuality {
    #[default]
    NoFix,
    Fix2D,
    Fix3D,
}

impl TryFrom<u8> for FixQuality {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FixQuality::NoFix),
            2 => Ok(FixQuality::Fix2D),
            3 => Ok(FixQuality::Fix3D),
            other => Err(format!("unsupported fix quality {other}")),
        }
    }
}

impl From<FixQuality> for u8 {
    fn from(value: FixQuality) -> Self {
        match value {
            FixQuality::NoFix => 0,
            FixQuality::Fix2D => 2,
            FixQuality::Fix3D => 3,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsState {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "spd_kph")]
    pub speed_kph: f64,
    #[serde(rename = "alt")]
    pub altitude: f64,
    pub hdop: f64,
    #[serde(rename = "fix")]
    pub fix_quality: FixQuality,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "fwd")]
    Forward,
    #[serde(rename = "rev")]
    Reverse,
    #[default]
    #[serde(rename = "stop")]
    Stop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingState {
    #[default]
    Idle,
    Engaged,
    Fault,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    // Percent, 0 to 100.
    #[serde(rename = "duty")]
    pub duty_cycle: f64,
    #[serde(rename = "dir")]
    pub direction: Direction,
    #[serde(rename = "stby")]
    pub standby: bool,
    #[serde(rename = "state")]
    pub operating_state: OperatingState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Online,
    #[default]
    Offline,
}

impl Liveness {
    pub fn toggled(self) -> Self {
        match self {
            Liveness::Online => Liveness::Offline,
            Liveness::Offline => Liveness::Online,
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Online => f.write_str("Online"),
            Liveness::Offline => f.write_str("Offline"),
        }
    }
}
