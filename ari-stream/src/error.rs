//! Error types for the ari-stream crate.

/// Failures of the underlying event-stream transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The event-stream endpoint could not be turned into a connect URL
    #[error("Invalid event stream URL: {0}")]
    InvalidUrl(String),

    /// Opening the stream failed (refused, handshake rejected, TLS...)
    #[error("Failed to connect to event stream: {0}")]
    Connect(String),

    /// Reading a frame failed on an open stream
    #[error("Failed to read from event stream: {0}")]
    Read(String),

    /// The stream did not close cleanly
    #[error("Failed to close event stream: {0}")]
    Close(String),
}

/// Errors surfaced to callers of the connection and configuration API
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The very first connection attempt failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for stream results
pub type Result<T> = std::result::Result<T, StreamError>;
