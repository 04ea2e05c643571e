use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status of a scheduled communication.
///
/// Mirrors the seeded `courier_statuses` rows; the names here are the
/// canonical vocabulary used on the wire and in persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Initial state when a communication is accepted
    Scheduled,
    /// Delivered to the downstream provider
    Sent,
    /// Canceled before dispatch
    Canceled,
    /// Dispatch attempted and failed
    Failed,
}

impl DeliveryState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Canceled | Self::Failed)
    }

    /// Check if the communication is still awaiting dispatch
    pub fn is_pending_dispatch(&self) -> bool {
        matches!(self, Self::Scheduled)
    }

    /// Canonical lowercase name, matching the seeded status rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "sent" => Ok(Self::Sent),
            "canceled" => Ok(Self::Canceled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid delivery state: {s}")),
        }
    }
}

/// New communications start out scheduled
impl Default for DeliveryState {
    fn default() -> Self {
        Self::Scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_check() {
        assert!(DeliveryState::Sent.is_terminal());
        assert!(DeliveryState::Canceled.is_terminal());
        assert!(DeliveryState::Failed.is_terminal());
        assert!(!DeliveryState::Scheduled.is_terminal());
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(DeliveryState::Scheduled.to_string(), "scheduled");
        assert_eq!(
            "canceled".parse::<DeliveryState>().unwrap(),
            DeliveryState::Canceled
        );
        assert!("cancelled".parse::<DeliveryState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let state = DeliveryState::Failed;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"failed\"");

        let parsed: DeliveryState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_default_is_scheduled() {
        assert_eq!(DeliveryState::default(), DeliveryState::Scheduled);
    }
}
