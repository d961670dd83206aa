//! # ari-stream
//!
//! Event delivery for ARI applications.
//!
//! A [`Connection`] keeps one event stream open to Asterisk, reconnecting
//! after drops, and publishes every decoded event on a [`Bus`]. Consumers
//! take [`Subscription`]s on the bus, filtered by resource [`Key`] and event
//! type.
//!
//! ```rust,no_run
//! use ari_stream::{ClientConfig, Connection, Key, event_types};
//!
//! # async fn run() -> ari_stream::Result<()> {
//! let config = ClientConfig::new("ivr").with_credentials("asterisk", "secret");
//! let connection = Connection::connect(config).await?;
//!
//! let mut starts = connection
//!     .bus()
//!     .subscribe(Key::for_app("ivr"), &[event_types::STASIS_START]);
//! while let Some(event) = starts.next().await {
//!     println!("{} entered the application", event.keys().ids().join(","));
//! }
//!
//! connection.close().await;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod subscription;
pub mod transport;

pub use ari_api::{event_types, Event, Key, Keys};
pub use bus::{Bus, DEFAULT_QUEUE_SIZE};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionBuilder, ConnectionState};
pub use error::{Result, StreamError, TransportError};
pub use subscription::{EventTypes, Once, Subscription, SubscriptionId};
pub use transport::{EventTransport, FrameStream, WebSocketTransport};
