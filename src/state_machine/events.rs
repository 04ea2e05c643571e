use serde::{Deserialize, Serialize};

/// Events that can trigger delivery state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeliveryEvent {
    /// Record successful delivery to the downstream provider
    MarkSent,
    /// Record a delivery failure with an error message
    Fail(String),
    /// Cancel the scheduled communication
    Cancel,
}

impl DeliveryEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MarkSent => "mark_sent",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        assert_eq!(DeliveryEvent::MarkSent.event_type(), "mark_sent");
        assert_eq!(DeliveryEvent::Cancel.event_type(), "cancel");
        assert_eq!(
            DeliveryEvent::fail_with_error("provider 503").event_type(),
            "fail"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let event = DeliveryEvent::fail_with_error("provider 503");
        assert_eq!(event.error_message(), Some("provider 503"));
        assert_eq!(DeliveryEvent::Cancel.error_message(), None);
    }
}
