//! Error types for automaton operations

use std::fmt;

/// Result type alias for automaton operations
pub type AutomatonResult<T> = Result<T, AutomatonError>;

/// Errors that can occur while polling the backend or dispatching actions
#[derive(Debug)]
pub enum AutomatonError {
    /// An outbound call exceeded its timeout
    Timeout(String),

    /// Non-success status code, transport failure or undecodable body
    Request(String),

    /// The backend response does not have the expected shape
    Lookup(String),

    /// Configuration could not be parsed or failed validation
    InvalidConfig(String),

    /// I/O error (reading the configuration file)
    Io(std::io::Error),

    /// An automaton task panicked or was cancelled
    Task(String),
}

impl AutomatonError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AutomatonError::Timeout(_))
    }
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::Timeout(msg) => write!(f, "request timed out: {}", msg),
            AutomatonError::Request(msg) => write!(f, "request failed: {}", msg),
            AutomatonError::Lookup(msg) => write!(f, "unexpected response shape: {}", msg),
            AutomatonError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            AutomatonError::Io(err) => write!(f, "I/O error: {}", err),
            AutomatonError::Task(msg) => write!(f, "automaton task failed: {}", msg),
        }
    }
}

impl std::error::Error for AutomatonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutomatonError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AutomatonError {
    fn from(err: std::io::Error) -> Self {
        AutomatonError::Io(err)
    }
}

// reqwest reports timeouts from the client-level bound through `is_timeout`
impl From<reqwest::Error> for AutomatonError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AutomatonError::Timeout(err.to_string())
        } else {
            AutomatonError::Request(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for AutomatonError {
    fn from(err: tokio::task::JoinError) -> Self {
        AutomatonError::Task(err.to_string())
    }
}

impl From<serde_json::Error> for AutomatonError {
    fn from(err: serde_json::Error) -> Self {
        AutomatonError::InvalidConfig(err.to_string())
    }
}

impl From<toml::de::Error> for AutomatonError {
    fn from(err: toml::de::Error) -> Self {
        AutomatonError::InvalidConfig(err.to_string())
    }
}
