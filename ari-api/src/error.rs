use thiserror::Error;

/// Errors returned by the REST command surface
///
/// These cover the request/response half of ARI. Event decoding has its own
/// [`DecodeError`] since decode failures never reach command callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// The request never produced an HTTP response: connection refused,
    /// DNS failure, TLS failure or a timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Request to {path} failed with status {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid parameter value supplied by the caller
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// True for 404 responses, which ARI uses for resources that no longer exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// A timestamp did not follow `YYYY-MM-DDTHH:MM:SS.mmm±HHMM`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid timestamp {value:?}: expected YYYY-MM-DDTHH:MM:SS.mmm±HHMM")]
pub struct TimeFormatError {
    pub value: String,
}

/// Errors produced while decoding an event frame
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not JSON at all
    #[error("Frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// The frame is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` field
    #[error("Frame has no string `type` field")]
    MissingType,

    /// The header timestamp is malformed
    #[error(transparent)]
    TimeFormat(#[from] TimeFormatError),

    /// The payload does not fit the shape registered for its type
    #[error("Failed to decode {event_type} payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}
