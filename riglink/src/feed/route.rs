//! Payload routing
//!
//! Pure dispatch of one decoded payload to the two state holders.
//! Unknown payloads are a no-op, never an error.

use super::payload::Payload;
use crate::view::{MessageLog, StatusAggregator};

pub fn route_payload(payload: Payload, log: &mut MessageLog, status: &mut StatusAggregator) {
    match payload {
        Payload::Messages {
            messages,
            status: snapshot,
        } => {
            log.append(&messages);
            if let Some(snapshot) = snapshot {
                status.apply(&snapshot);
            }
        }
        Payload::Status(snapshot) => {
            status.apply(&snapshot);
        }
        Payload::Unknown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::AggregatedView;

    #[test]
    fn messages_reach_the_log_only() {
        let mut log = MessageLog::new();
        let mut status = StatusAggregator::new();
        let payload = Payload::from_json(
            r#"{"type":"messages","messages":[{"id":4,"src":"ctl","text":"go"}]}"#,
        )
        .unwrap();
        route_payload(payload, &mut log, &mut status);
        assert_eq!(log.render(), "[ctl] go");
        assert_eq!(log.last_seen_id(), 4);
        assert_eq!(status.view(), AggregatedView::default());
    }

    #[test]
    fn status_reaches_the_aggregator_only() {
        let mut log = MessageLog::new();
        let mut status = StatusAggregator::new();
        let payload = Payload::from_json(
            r#"{"type":"status","status":{"SimonSays-1":{"ready":true}}}"#,
        )
        .unwrap();
        route_payload(payload, &mut log, &mut status);
        assert!(log.is_empty());
        assert!(status.view().ready);
    }

    #[test]
    fn combined_event_updates_both() {
        let mut log = MessageLog::new();
        let mut status = StatusAggregator::new();
        let payload = Payload::from_json(
            r#"{"type":"messages",
                "messages":[{"id":1,"src":"ESP32","device":"SimonSays-1","text":"SIMON:ARMED"}],
                "status":{"SimonSays-1":{"armed":true}}}"#,
        )
        .unwrap();
        route_payload(payload, &mut log, &mut status);
        assert_eq!(log.len(), 1);
        assert!(status.view().armed);
    }

    #[test]
    fn unknown_payload_changes_nothing() {
        let mut log = MessageLog::new();
        let mut status = StatusAggregator::new();
        route_payload(Payload::Unknown, &mut log, &mut status);
        assert!(log.is_empty());
        assert_eq!(log.last_seen_id(), 0);
        assert_eq!(status.view(), AggregatedView::default());
    }
}
