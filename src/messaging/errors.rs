//! # Broker Error Types
//!
//! Structured error handling for the broker layer using thiserror, so
//! callers can distinguish connectivity failures from topology conflicts
//! and management-API query failures.

use thiserror::Error;

/// Broker error taxonomy
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker unavailable: {message}")]
    Unavailable { message: String },

    #[error("Broker topology error: {entity} '{name}': {message}")]
    Topology {
        entity: String,
        name: String,
        message: String,
    },

    #[error("Broker query failed: {endpoint} returned {status}: {message}")]
    Query {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Broker timeout: operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Message serialization error: {message}")]
    Serialization { message: String },
}

impl BrokerError {
    /// Create an unavailable error (connection or channel failure)
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a topology error for an exchange
    pub fn exchange(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            entity: "exchange".to_string(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a topology error for a queue
    pub fn queue(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            entity: "queue".to_string(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a topology error for a binding
    pub fn binding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            entity: "binding".to_string(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a management query error
    pub fn query(
        endpoint: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Query {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether retrying later could succeed (connectivity rather than
    /// topology or payload problems)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Conversion from serde_json::Error to BrokerError
impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::serialization(err.to_string())
    }
}

/// Result type alias for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_error_creation() {
        let err = BrokerError::unavailable("connection refused");
        assert!(matches!(err, BrokerError::Unavailable { .. }));

        let err = BrokerError::exchange("notifications", "type mismatch");
        assert!(matches!(err, BrokerError::Topology { .. }));

        let err = BrokerError::timeout("publish", 5000);
        assert!(matches!(err, BrokerError::Timeout { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = BrokerError::queue("schedule_queue", "PRECONDITION_FAILED");
        let display = format!("{err}");
        assert!(display.contains("queue"));
        assert!(display.contains("schedule_queue"));
        assert!(display.contains("PRECONDITION_FAILED"));

        let err = BrokerError::query("/api/queues", 401, "unauthorized");
        let display = format!("{err}");
        assert!(display.contains("/api/queues"));
        assert!(display.contains("401"));
    }

    #[test]
    fn test_retryable_partition() {
        assert!(BrokerError::unavailable("lost connection").is_retryable());
        assert!(BrokerError::timeout("publish", 5000).is_retryable());
        assert!(!BrokerError::exchange("x", "conflict").is_retryable());
        assert!(!BrokerError::query("/api/exchanges", 500, "boom").is_retryable());
        assert!(!BrokerError::serialization("bad payload").is_retryable());
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: BrokerError = json_err.into();
        assert!(matches!(err, BrokerError::Serialization { .. }));
    }
}
