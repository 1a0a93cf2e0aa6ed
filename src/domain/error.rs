//! Error types for the lamp command pipeline.
//!
//! Transport failures never leave the connection manager; they are turned
//! into state transitions. Dispatch failures are caller mistakes and are
//! returned synchronously.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a BLE transport or session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connect attempt was rejected by the BLE stack
    #[error("Failed to connect to lamp: {0}")]
    Connect(String),

    /// The connect attempt did not finish in time
    #[error("Connect attempt timed out after {0:?}")]
    Timeout(Duration),

    /// A characteristic write failed mid-session
    #[error("Characteristic write failed: {0}")]
    Write(String),

    /// The session is no longer live
    #[error("Lamp is not connected")]
    NotConnected,
}

/// Failures surfaced to callers of the dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Mode or body is not a well-formed hex string
    #[error("Malformed command input: {0}")]
    MalformedInput(String),

    /// The dispatcher has been shut down
    #[error("Command queue is closed")]
    QueueClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Connect attempt timed out after 5s");

        let err = DispatchError::MalformedInput("odd length body \"080\"".into());
        assert!(err.to_string().starts_with("Malformed command input"));
    }
}
