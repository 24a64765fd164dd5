//! Stream payloads
//!
//! Data model for the JSON objects carried by the rig's event stream
//! and snapshot endpoints, and the tagged union they decode into.
//!
//! Decoding is permissive past the JSON layer: text that is not
//! valid JSON is an error the caller reports, but a valid JSON value
//! of an unrecognized shape (unknown `type` tag, missing or mistyped
//! field) decodes to `Payload::Unknown`, which routes to a no-op.
//! Newer server payloads degrade gracefully instead of breaking the
//! client.

use std::collections::HashMap;

use serde::Deserialize;

/// One log entry as emitted by a device or the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Server-assigned, monotonically increasing. Used for cursor
    /// bookkeeping only, never for display ordering.
    #[serde(default)]
    pub id: Option<u64>,
    /// Logical origin label, e.g. the subsystem that produced the text.
    pub src: String,
    /// Originating device name. Absent means unscoped or system-wide.
    #[serde(default)]
    pub device: Option<String>,
    pub text: String,
}

/// Instantaneous state of one device. The four flags are independent;
/// a missing field reads as false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub armed: bool,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub fail: bool,
}

/// Complete point-in-time state for every known device. Produced
/// wholesale by the server; each snapshot replaces the previous view.
pub type StatusSnapshot = HashMap<String, DeviceStatus>;

/// Decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// New log messages, optionally bundled with a status snapshot.
    Messages {
        messages: Vec<Message>,
        status: Option<StatusSnapshot>,
    },
    /// A status snapshot alone.
    Status(StatusSnapshot),
    /// Anything the client does not recognize. Routed to a no-op.
    Unknown,
}

/// Raw field-level view of an event object, before shape checking.
#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    messages: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<serde_json::Value>,
}

impl Payload {
    /// Decode one event's data text. `Err` means the text was not
    /// valid JSON at all; any well-formed JSON decodes to a payload,
    /// if only `Unknown`.
    pub fn from_json(text: &str) -> Result<Payload, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(Payload::from_value(value))
    }

    fn from_value(value: serde_json::Value) -> Payload {
        let raw: RawEvent = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(_) => return Payload::Unknown,
        };
        match raw.kind.as_deref() {
            Some("messages") => {
                let messages: Vec<Message> = match raw
                    .messages
                    .and_then(|v| serde_json::from_value(v).ok())
                {
                    Some(messages) => messages,
                    None => return Payload::Unknown,
                };
                // A single event may carry both fields; a status that
                // fails shape checking is dropped without voiding the
                // messages.
                let status = raw.status.and_then(|v| serde_json::from_value(v).ok());
                Payload::Messages { messages, status }
            }
            Some("status") => match raw.status.and_then(|v| serde_json::from_value(v).ok()) {
                Some(status) => Payload::Status(status),
                None => Payload::Unknown,
            },
            _ => Payload::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_messages_event() {
        let payload = Payload::from_json(
            r#"{"type":"messages","messages":[
                {"id":7,"src":"ESP32","device":"SimonSays-1","text":"SIMON:READY"},
                {"src":"sys","text":"bridge up"}
            ]}"#,
        )
        .unwrap();
        match payload {
            Payload::Messages { messages, status } => {
                assert_eq!(messages.len(), 2);
                assert_eq!(messages[0].id, Some(7));
                assert_eq!(messages[0].device.as_deref(), Some("SimonSays-1"));
                assert_eq!(messages[1].id, None);
                assert_eq!(messages[1].device, None);
                assert!(status.is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn decodes_status_event() {
        let payload = Payload::from_json(
            r#"{"type":"status","status":{"SimonSays-1":{"ready":true,"armed":true}}}"#,
        )
        .unwrap();
        match payload {
            Payload::Status(snapshot) => {
                let device = &snapshot["SimonSays-1"];
                assert!(device.ready && device.armed);
                // Missing flags read as false.
                assert!(!device.win && !device.fail);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn messages_event_may_carry_status_too() {
        let payload = Payload::from_json(
            r#"{"type":"messages",
                "messages":[{"id":1,"src":"ctl","text":"armed"}],
                "status":{"SimonSays-1":{"armed":true}}}"#,
        )
        .unwrap();
        match payload {
            Payload::Messages { status, .. } => assert!(status.is_some()),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn unknown_shapes_decode_to_unknown() {
        for text in [
            r#"{"type":"telemetry","volts":3.3}"#,
            r#"{"type":"messages"}"#,
            r#"{"type":"messages","messages":"nope"}"#,
            r#"{"type":"messages","messages":{"0":{}}}"#,
            r#"{"type":"status"}"#,
            r#"{"type":"status","status":null}"#,
            r#"{"messages":[]}"#,
            r#"42"#,
            r#"[1,2,3]"#,
            r#""hello""#,
        ] {
            assert_eq!(Payload::from_json(text).unwrap(), Payload::Unknown, "{}", text);
        }
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(Payload::from_json("not json").is_err());
        assert!(Payload::from_json("{\"type\":").is_err());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let payload = Payload::from_json(
            r#"{"type":"messages","seq":9,
                "messages":[{"id":1,"src":"ctl","text":"hi","ts":1723.5}]}"#,
        )
        .unwrap();
        match payload {
            Payload::Messages { messages, .. } => assert_eq!(messages[0].text, "hi"),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn bad_status_alongside_good_messages_is_dropped() {
        let payload = Payload::from_json(
            r#"{"type":"messages",
                "messages":[{"id":1,"src":"ctl","text":"hi"}],
                "status":"degraded"}"#,
        )
        .unwrap();
        match payload {
            Payload::Messages { messages, status } => {
                assert_eq!(messages.len(), 1);
                assert!(status.is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
