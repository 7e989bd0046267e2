//! Error types for the Stockline engine.

use crate::LineStatus;
use thiserror::Error;

/// All possible errors from the Stockline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Record errors
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(String),

    #[error("invalid transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: LineStatus,
        to: LineStatus,
    },

    // State errors
    #[error("invalid usage snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RecordNotFound("srv-1".into());
        assert_eq!(err.to_string(), "record not found: srv-1");

        let err = Error::InvalidTransition {
            id: "srv-1".into(),
            from: LineStatus::Confirmed,
            to: LineStatus::Confirmed,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for srv-1: Confirmed -> Confirmed"
        );

        let err = Error::InvalidSnapshot("truncated".into());
        assert_eq!(err.to_string(), "invalid usage snapshot: truncated");
    }
}
