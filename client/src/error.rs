//! Unified error handling for the sync layer.

use thiserror::Error;

/// Sync layer error type.
///
/// `Clone` so shared in-flight futures can fan one failure out to every
/// waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("rejected by server: {message}")]
    Business { message: String },

    #[error("job {job_id} timed out after {attempts} attempts")]
    Timeout { job_id: String, attempts: u32 },

    #[error("job {job_id} reported unknown status '{status}'")]
    UnknownStatus { job_id: String, status: String },

    #[error("job {job_id} is already being tracked")]
    AlreadyTracked { job_id: String },

    #[error("engine error: {0}")]
    Engine(#[from] stockline_engine::Error),
}

/// Result type alias for the sync layer.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::Business {
            message: "out of stock".into(),
        };
        assert_eq!(err.to_string(), "rejected by server: out of stock");

        let err = SyncError::Timeout {
            job_id: "j1".into(),
            attempts: 60,
        };
        assert_eq!(err.to_string(), "job j1 timed out after 60 attempts");
    }

    #[test]
    fn engine_error_converts() {
        let engine_err = stockline_engine::Error::RecordNotFound("srv-1".into());
        let err: SyncError = engine_err.into();
        assert!(matches!(err, SyncError::Engine(_)));
    }
}
