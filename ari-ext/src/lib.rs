//! # ari-ext
//!
//! Higher-level ARI operations built on the event bus.
//!
//! Playing media and recording are asynchronous on the server: the command
//! returns immediately and progress arrives as events. The functions here
//! issue the command, follow the correlated events and hand back a typed
//! result that separates "never started", "stopped before starting",
//! "failed" and "timed out". Cancelling through the options' token abandons
//! the wait and yields [`Outcome::Canceled`].

pub mod coordinator;
pub mod error;
pub mod handle;
pub mod play;
pub mod record;
pub mod target;

pub use coordinator::{Coordinator, InFlight, Outcome, Signal, Started, Tracking};
pub use error::{OperationError, Result};
pub use handle::{spawn, OperationHandle};
pub use play::{play, play_sequence, PlayOptions};
pub use record::{record, IfExists, RecordOptions, RecordingSession, TerminateOn};
pub use target::Target;
