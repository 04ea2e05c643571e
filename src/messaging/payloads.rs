//! # Wire Payloads
//!
//! JSON shapes published to the broker. Downstream delivery workers consume
//! these, so the field names are a wire contract: schedule creation carries
//! `{id, recipient, message, scheduled_datetime, channel, status}` and
//! cancellation carries `{id, action: "cancel"}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action verb on cancellation notices
pub const CANCEL_ACTION: &str = "cancel";

/// Correlation metadata attached to schedule messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayloadMetadata {
    /// Correlation ID for tracing a message across systems
    pub correlation_id: Uuid,
    /// When the message was handed to the broker layer
    pub enqueued_at: DateTime<Utc>,
}

impl PayloadMetadata {
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
        }
    }
}

impl Default for PayloadMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Message published when a communication is scheduled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulePayload {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub scheduled_datetime: DateTime<Utc>,
    pub channel: String,
    pub status: String,
    pub metadata: PayloadMetadata,
}

impl SchedulePayload {
    /// Serialize for publishing
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Cancellation notice published to the operational queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelPayload {
    pub id: i64,
    pub action: String,
}

impl CancelPayload {
    /// Create a cancellation notice for the given schedule
    pub fn new(id: i64) -> Self {
        Self {
            id,
            action: CANCEL_ACTION.to_string(),
        }
    }

    /// Serialize for publishing
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_schedule_payload_wire_shape() {
        let payload = SchedulePayload {
            id: 42,
            recipient: "a@b.com".to_string(),
            message: "hi".to_string(),
            scheduled_datetime: Utc.with_ymd_and_hms(2024, 12, 1, 10, 0, 0).unwrap(),
            channel: "email".to_string(),
            status: "scheduled".to_string(),
            metadata: PayloadMetadata::new(),
        };

        let json = payload.to_json().unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["recipient"], "a@b.com");
        assert_eq!(json["message"], "hi");
        assert_eq!(json["channel"], "email");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["scheduled_datetime"], "2024-12-01T10:00:00Z");
        assert!(json["metadata"]["correlation_id"].is_string());
    }

    #[test]
    fn test_cancel_payload_wire_shape() {
        let payload = CancelPayload::new(7);
        let json = payload.to_json().unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["action"], "cancel");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_cancel_payload_round_trip() {
        let payload = CancelPayload::new(7);
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: CancelPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }
}
