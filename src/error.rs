use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CourierError {
    DatabaseError(String),
    BrokerError(String),
    ValidationError(String),
    ConfigurationError(String),
}

impl fmt::Display for CourierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourierError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            CourierError::BrokerError(msg) => write!(f, "Broker error: {msg}"),
            CourierError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            CourierError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for CourierError {}

pub type Result<T> = std::result::Result<T, CourierError>;
