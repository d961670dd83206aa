//! Error types for ARI operations

use ari_api::ApiError;

/// Why a play or record operation did not finish successfully
///
/// Cancellation is not an error; it surfaces as
/// [`Outcome::Canceled`](crate::Outcome::Canceled).
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// No start event arrived within the start timeout
    #[error("Timed out waiting for {id} to start")]
    StartTimeout { id: String },

    /// Started, but did not finish within the overall timeout
    #[error("Timed out waiting for {id} to finish")]
    Timeout { id: String },

    /// A finished or failed event arrived before the start event
    #[error("{id} stopped before it started")]
    StoppedBeforeStart { id: String },

    /// The server reported the operation as failed
    #[error("{id} failed: {reason}")]
    Failed { id: String, reason: String },

    /// The event bus closed while waiting
    #[error("Event bus closed while waiting for {id}")]
    BusClosed { id: String },

    /// The command was rejected or could not be sent
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation cannot be issued as requested
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A spawned operation panicked or was aborted
    #[error("Operation task failed: {0}")]
    Join(String),
}

impl OperationError {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OperationError::StartTimeout { .. }
                | OperationError::Timeout { .. }
                | OperationError::BusClosed { .. }
        ) || matches!(self, OperationError::Api(ApiError::Network(_)))
    }
}

/// Convenience type alias for operation results
pub type Result<T> = std::result::Result<T, OperationError>;
