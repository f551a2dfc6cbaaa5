// JSON frame decoder for the `{type, data}` telemetry envelope.
// Invariants: unknown tags are reported separately from malformed frames; nothing panics on input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{ActuatorState, Event, GpsState};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not a valid envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("invalid {tag} payload: {source}")]
    Payload {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// Wheel id is validated by the router, not the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedReading {
    pub ts: u64,
    pub wheel: i64,
    pub speed_kph: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulses: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    Gps(GpsState),
    Actuator(ActuatorState),
    Speed(SpeedReading),
    Event(Event),
}

impl Message {
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Gps(_) => "gps",
            Message::Actuator(_) => "actuator",
            Message::Speed(_) => "speed",
            Message::Event(_) => "event",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Message(Message),
    UnknownTag(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    data: Value,
}

pub fn decode_frame(frame: &str) -> Result<Decoded, DecodeError> {
    let envelope: Envelope = serde_json::from_str(frame).map_err(DecodeError::Envelope)?;
    let message = match envelope.tag.as_str() {
        "gps" => Message::Gps(payload("gps", envelope.data)?),
        "actuator" => Message::Actuator(payload("actuator", envelope.data)?),
        "speed" => Message::Speed(payload("speed", envelope.data)?),
        "event" => Message::Event(payload("event", envelope.data)?),
        _ => return Ok(Decoded::UnknownTag(envelope.tag)),
    };
    Ok(Decoded::Message(message))
}

fn payload<T: for<'de> Deserialize<'de>>(tag: &'static str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Payload { tag, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, EventType, FixQuality, OperatingState, Severity};

    #[test]
    fn decodes_gps_frame() {
        let frame = r#"{"type":"gps","data":{"lat":19.043,"lon":-98.198,"spd_kph":12.5,"alt":2160,"hdop":0.8,"fix":3}}"#;
        let Decoded::Message(Message::Gps(gps)) = decode_frame(frame).unwrap() else {
            panic!("expected gps message");
        };
        assert_eq!(gps.latitude, 19.043);
        assert_eq!(gps.altitude, 2160.0);
        assert_eq!(gps.fix_quality, FixQuality::Fix3D);
    }

    #[test]
    fn decodes_actuator_frame() {
        let frame = r#"{"type":"actuator","data":{"duty":42,"dir":"rev","stby":true,"state":"fault"}}"#;
        let Decoded::Message(Message::Actuator(act)) = decode_frame(frame).unwrap() else {
            panic!("expected actuator message");
        };
        assert_eq!(act.direction, Direction::Reverse);
        assert!(act.standby);
        assert_eq!(act.operating_state, OperatingState::Fault);
    }

    #[test]
    fn decodes_speed_without_pulses() {
        let frame = r#"{"type":"speed","data":{"ts":1000,"wheel":3,"speed_kph":42.5}}"#;
        let decoded = decode_frame(frame).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(Message::Speed(SpeedReading {
                ts: 1000,
                wheel: 3,
                speed_kph: 42.5,
                pulses: None,
            }))
        );
    }

    #[test]
    fn decodes_event_with_optional_level() {
        let frame = r#"{"type":"event","data":{"ts":5,"type":"tamper","level":"warn","message":"Enclosure opened"}}"#;
        let Decoded::Message(Message::Event(event)) = decode_frame(frame).unwrap() else {
            panic!("expected event message");
        };
        assert_eq!(event.kind, EventType::Tamper);
        assert_eq!(event.severity, Some(Severity::Warn));

        let bare = r#"{"type":"event","data":{"ts":6,"type":"state_change","message":"armed"}}"#;
        let Decoded::Message(Message::Event(event)) = decode_frame(bare).unwrap() else {
            panic!("expected event message");
        };
        assert_eq!(event.severity, None);
    }

    #[test]
    fn unknown_tag_is_not_an_error() {
        let decoded = decode_frame(r#"{"type":"battery","data":{"volts":12.1}}"#).unwrap();
        assert_eq!(decoded, Decoded::UnknownTag("battery".to_string()));
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(decode_frame("{not json"), Err(DecodeError::Envelope(_))));
        assert!(matches!(decode_frame(r#"{"data":{}}"#), Err(DecodeError::Envelope(_))));
        assert!(matches!(
            decode_frame(r#"{"type":"speed","data":{"wheel":2}}"#),
            Err(DecodeError::Payload { tag: "speed", .. })
        ));
        assert!(matches!(
            decode_frame(r#"{"type":"gps","data":{"lat":0,"lon":0,"spd_kph":0,"alt":0,"hdop":0,"fix":1}}"#),
            Err(DecodeError::Payload { tag: "gps", .. })
        ));
        assert!(matches!(
            decode_frame(r#"{"type":"actuator","data":{"duty":1,"dir":"sideways","stby":false,"state":"idle"}}"#),
            Err(DecodeError::Payload { tag: "actuator", .. })
        ));
    }

    #[test]
    fn encoded_frame_uses_wire_envelope() {
        let message = Message::Speed(SpeedReading {
            ts: 1,
            wheel: 2,
            speed_kph: 3.0,
            pulses: Some(4),
        });
        let value: Value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "speed");
        assert_eq!(value["data"]["wheel"], 2);
        assert_eq!(value["data"]["pulses"], 4);
    }
}
