//! Reconnecting event-stream connection
//!
//! A [`Connection`] owns a background task that reads frames from the event
//! stream, decodes them and publishes them on its [`Bus`]. When the stream
//! drops, the task waits the configured reconnect delay and opens a new one,
//! until the connection is closed or its stop signal fires.
//!
//! ```text
//! Disconnected -> Connecting -> Streaming -> Disconnected -> ... -> Terminated
//! ```

use std::sync::Arc;
use std::time::Duration;

use ari_api::Event;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Span};

use crate::bus::Bus;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::{EventTransport, FrameStream, WebSocketTransport};

/// Lifecycle of the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Streaming,
    Terminated,
}

/// Builder for [`Connection`]
///
/// Defaults to a [`WebSocketTransport`] built from the config, a fresh stop
/// signal, the caller's current `tracing` dispatcher and an `ari_events` span
/// tagged with the application name.
pub struct ConnectionBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn EventTransport>>,
    stop: Option<CancellationToken>,
    dispatch: Option<Dispatch>,
    span: Option<Span>,
}

impl ConnectionBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            stop: None,
            dispatch: None,
            span: None,
        }
    }

    /// Read events through `transport` instead of a WebSocket
    pub fn transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Stop the connection when `stop` is cancelled
    pub fn stop_signal(mut self, stop: CancellationToken) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Send this connection's log output to `dispatch` instead of the
    /// caller's default subscriber
    pub fn logger(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    /// Span the reader task's log output is recorded in
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Open the first stream and start the reader task
    ///
    /// Only a failure of this first attempt is reported; later failures are
    /// retried in the background.
    pub async fn connect(self) -> Result<Connection> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport::new(&self.config)?),
        };
        let dispatch = self
            .dispatch
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));
        let span = match self.span {
            Some(span) => span,
            None => tracing::dispatcher::with_default(&dispatch, || {
                tracing::info_span!("ari_events", app = %self.config.application)
            }),
        };
        let stop = match self.stop {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let first = async {
            tracing::debug!("Opening event stream");
            transport.open().await
        }
        .instrument(span.clone())
        .with_subscriber(dispatch.clone())
        .await;
        let first = match first {
            Ok(stream) => stream,
            Err(e) => {
                tracing::dispatcher::with_default(&dispatch, || {
                    span.in_scope(|| tracing::error!("Failed to open event stream: {}", e))
                });
                return Err(e.into());
            }
        };

        let bus = Bus::with_queue_size(self.config.subscription_queue_size);
        let reader = Reader {
            transport,
            bus: bus.clone(),
            stop: stop.clone(),
            state: state_tx,
            reconnect_delay: self.config.reconnect_delay,
            close_timeout: self.config.close_timeout,
        };
        let task = tokio::spawn(
            reader
                .run(first)
                .instrument(span)
                .with_subscriber(dispatch.clone()),
        );

        Ok(Connection {
            config: self.config,
            dispatch,
            bus,
            stop,
            state: state_rx,
            task: Mutex::new(Some(task)),
        })
    }
}

/// A live event stream feeding a [`Bus`]
pub struct Connection {
    config: ClientConfig,
    dispatch: Dispatch,
    bus: Bus,
    stop: CancellationToken,
    state: watch::Receiver<ConnectionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Connect over a WebSocket with default settings
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        ConnectionBuilder::new(config).connect().await
    }

    pub fn builder(config: ClientConfig) -> ConnectionBuilder {
        ConnectionBuilder::new(config)
    }

    /// Bus carrying every decoded event
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the bus, stop the reader and wait for it to finish
    ///
    /// Idempotent.
    pub async fn close(&self) {
        self.bus.close();
        self.stop.cancel();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::dispatcher::with_default(&self.dispatch, || {
                    tracing::warn!("Event reader task failed: {}", e)
                });
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("application", &self.config.application)
            .field("state", &self.state())
            .field("bus", &self.bus)
            .finish()
    }
}

struct Reader {
    transport: Arc<dyn EventTransport>,
    bus: Bus,
    stop: CancellationToken,
    state: watch::Sender<ConnectionState>,
    reconnect_delay: Duration,
    close_timeout: Duration,
}

impl Reader {
    async fn run(self, first: Box<dyn FrameStream>) {
        let mut pending = Some(first);

        loop {
            let mut stream = match pending.take() {
                Some(stream) => stream,
                None => {
                    self.set_state(ConnectionState::Connecting);
                    let opened = tokio::select! {
                        _ = self.stop.cancelled() => break,
                        opened = self.transport.open() => opened,
                    };
                    match opened {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::warn!("Failed to reopen event stream: {}", e);
                            self.set_state(ConnectionState::Disconnected);
                            if self.pause().await {
                                break;
                            }
                            continue;
                        }
                    }
                }
            };

            self.set_state(ConnectionState::Streaming);
            tracing::info!("Event stream connected");

            let stopped = self.pump(stream.as_mut()).await;
            self.shut(stream.as_mut()).await;
            if stopped {
                break;
            }

            self.set_state(ConnectionState::Disconnected);
            if self.pause().await {
                break;
            }
        }

        self.bus.close();
        self.set_state(ConnectionState::Terminated);
        tracing::info!("Event stream terminated");
    }

    /// Close the stream, giving up on a peer that never answers the handshake
    async fn shut(&self, stream: &mut dyn FrameStream) {
        match tokio::time::timeout(self.close_timeout, stream.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("{}", e),
            Err(_) => tracing::warn!(
                "Event stream close timed out after {:?}; abandoning it",
                self.close_timeout
            ),
        }
    }

    /// Read until the stream ends or the stop signal fires; true on stop
    async fn pump(&self, stream: &mut dyn FrameStream) -> bool {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.stop.cancelled() => return true,
                frame = stream.next_frame() => frame,
            };

            match frame {
                Some(Ok(bytes)) => self.publish(&bytes),
                Some(Err(e)) => {
                    tracing::warn!("Event stream dropped: {}", e);
                    return false;
                }
                None => {
                    tracing::info!("Event stream closed by server");
                    return false;
                }
            }
        }
    }

    fn publish(&self, frame: &[u8]) {
        if frame.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        match Event::decode(frame) {
            Ok(event) => {
                tracing::trace!("Received {}", event.event_type());
                self.bus.send(event);
            }
            Err(e) => tracing::warn!("Dropping undecodable frame: {}", e),
        }
    }

    /// Wait out the reconnect delay; true if stopped meanwhile
    async fn pause(&self) -> bool {
        tokio::select! {
            _ = self.stop.cancelled() => true,
            _ = tokio::time::sleep(self.reconnect_delay) => false,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}
