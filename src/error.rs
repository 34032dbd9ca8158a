//! Error types for the burpee counter

use thiserror::Error;

/// Errors that can occur while counting repetitions
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing keypoint: {0}")]
    MissingKeypoint(String),

    /// Capture device or model not ready; the poll is skipped
    #[error("Pose source unavailable: {0}")]
    PoseSourceUnavailable(String),

    /// The pose model itself failed; the poll is skipped and prior state kept
    #[error("Pose inference failed: {0}")]
    InferenceFailed(String),

    #[error("Session already stopped")]
    SessionStopped,

    #[error("Session task error: {0}")]
    TaskError(String),
}

impl CounterError {
    /// Whether a running session recovers from this error by skipping the poll
    pub fn is_poll_recoverable(&self) -> bool {
        matches!(
            self,
            CounterError::PoseSourceUnavailable(_)
                | CounterError::InferenceFailed(_)
                | CounterError::MissingKeypoint(_)
        )
    }
}
