//! Event-stream transport seam
//!
//! The connection manager only needs "open a stream" and "read the next text
//! frame". [`WebSocketTransport`] is the production implementation; tests
//! substitute their own.

use async_trait::async_trait;

use crate::error::TransportError;

mod websocket;

pub use websocket::{events_url, WebSocketTransport};

/// Opens event streams
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Open a new stream; each call is a fresh connection
    async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError>;
}

/// One open event stream
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame payload
    ///
    /// `None` means the peer ended the stream. An `Err` means the stream is
    /// broken and must be reopened.
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>>;

    /// Close the stream. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}
