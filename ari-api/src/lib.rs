//! Core types for the Asterisk REST Interface (ARI)
//!
//! This crate holds the pieces every other ARI crate builds on:
//!
//! - [`key`]: partial-match resource keys used both to address resources and to
//!   filter events
//! - [`events`]: the typed event model and the frame decoder
//! - [`transport`]: the [`ResourceTransport`] seam for REST commands, with an
//!   HTTP implementation
//!
//! # Decoding an event
//!
//! ```rust
//! use ari_api::{Event, event_types};
//!
//! let frame = br#"{"type":"StasisEnd","application":"ivr","channel":{"id":"c1"}}"#;
//! let event = Event::decode(frame)?;
//!
//! assert_eq!(event.event_type(), event_types::STASIS_END);
//! assert_eq!(event.keys().ids(), vec!["c1"]);
//! # Ok::<(), ari_api::DecodeError>(())
//! ```

pub mod error;
pub mod events;
pub mod key;
pub mod transport;

pub use error::{ApiError, DecodeError, Result, TimeFormatError};
pub use events::{event_types, Event, EventHeader, GenericEvent, Timestamp};
pub use key::{Key, Keys};
pub use transport::{HttpTransport, ResourceTransport};
