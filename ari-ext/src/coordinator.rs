//! Event-correlated command coordination
//!
//! Some commands only kick off work on the server: the response comes back
//! at once and progress is reported later as events. A [`Coordinator`]
//! subscribes before issuing the command, then waits for the start and
//! finish events that carry the command's correlation id, racing each wait
//! against a deadline and the caller's cancellation token.
//!
//! The subscription lives inside the returned [`InFlight`] and is cancelled
//! on every exit path, including early returns and drops.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ari_api::{Event, Key};
use ari_stream::{Bus, Subscription};
use tokio_util::sync::CancellationToken;

use crate::error::{OperationError, Result};

/// Default wait for the start event
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(1);

/// What a correlated event says about the operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Started,
    Finished,
    Failed(String),
}

/// Describes which events report on an operation and how to read them
#[derive(Clone, Copy)]
pub struct Tracking {
    /// Resource kind of the operation (`playback`, `liverecording`)
    pub kind: &'static str,
    /// Event types to subscribe to
    pub event_types: &'static [&'static str],
    /// Correlation id and signal of an event, if it reports on this kind
    pub classify: fn(&Event) -> Option<(&str, Signal)>,
}

impl std::fmt::Debug for Tracking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracking")
            .field("kind", &self.kind)
            .field("event_types", &self.event_types)
            .finish()
    }
}

impl Tracking {
    fn signal(&self, event: &Event, id: &str) -> Option<Signal> {
        match (self.classify)(event) {
            Some((event_id, signal)) if event_id == id => Some(signal),
            _ => None,
        }
    }
}

/// How an operation ended when it did not fail
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The finish event for the operation
    Finished(Arc<Event>),
    /// The caller cancelled; the operation was abandoned, not stopped
    Canceled,
}

impl Outcome {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    pub fn event(&self) -> Option<&Arc<Event>> {
        match self {
            Outcome::Finished(event) => Some(event),
            Outcome::Canceled => None,
        }
    }
}

/// Result of waiting for the start event
#[derive(Debug)]
pub enum Started {
    Running(InFlight),
    Canceled,
}

/// Issues one command and follows its events
#[derive(Debug, Clone)]
pub struct Coordinator {
    bus: Bus,
    tracking: Tracking,
    start_timeout: Duration,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(bus: Bus, tracking: Tracking) -> Self {
        Self {
            bus,
            tracking,
            start_timeout: DEFAULT_START_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Abandon the operation when `cancel` fires
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribe around `target`, issue `command` and wait for the start
    ///
    /// `command` resolves to the correlation id the events will carry. The
    /// subscription is scoped to `target`'s node, dialog and application.
    pub async fn start<F, Fut>(self, target: &Key, command: F) -> Result<Started>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let scope = target.derive(self.tracking.kind, "");
        let mut subscription = self.bus.subscribe(scope, self.tracking.event_types);

        let id = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(Started::Canceled),
            id = command() => id?,
        };
        tracing::debug!(kind = self.tracking.kind, %id, "Waiting for start");

        let deadline = tokio::time::sleep(self.start_timeout);
        tokio::pin!(deadline);

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(Started::Canceled),
                _ = &mut deadline => return Err(OperationError::StartTimeout { id }),
                event = subscription.next() => event,
            };
            let Some(event) = event else {
                return Err(OperationError::BusClosed { id });
            };

            match self.tracking.signal(&event, &id) {
                Some(Signal::Started) => {
                    return Ok(Started::Running(InFlight {
                        id,
                        tracking: self.tracking,
                        cancel: self.cancel,
                        subscription,
                        started: event,
                    }))
                }
                Some(Signal::Finished) | Some(Signal::Failed(_)) => {
                    return Err(OperationError::StoppedBeforeStart { id })
                }
                None => continue,
            }
        }
    }

    /// [`start`](Self::start) then [`InFlight::wait_finished`]
    pub async fn run<F, Fut>(self, target: &Key, timeout: Duration, command: F) -> Result<Outcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        match self.start(target, command).await? {
            Started::Running(in_flight) => in_flight.wait_finished(timeout).await,
            Started::Canceled => Ok(Outcome::Canceled),
        }
    }
}

/// An operation whose start event has arrived
#[derive(Debug)]
pub struct InFlight {
    id: String,
    tracking: Tracking,
    cancel: CancellationToken,
    subscription: Subscription,
    started: Arc<Event>,
}

impl InFlight {
    /// Correlation id of the operation
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started(&self) -> &Arc<Event> {
        &self.started
    }

    /// Wait up to `timeout` for the finish event
    pub async fn wait_finished(mut self, timeout: Duration) -> Result<Outcome> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Ok(Outcome::Canceled),
                _ = &mut deadline => break Err(OperationError::Timeout { id: self.id.clone() }),
                event = self.subscription.next() => event,
            };
            let Some(event) = event else {
                break Err(OperationError::BusClosed { id: self.id.clone() });
            };

            match self.tracking.signal(&event, &self.id) {
                Some(Signal::Finished) => break Ok(Outcome::Finished(event)),
                Some(Signal::Failed(reason)) => {
                    break Err(OperationError::Failed {
                        id: self.id.clone(),
                        reason,
                    })
                }
                Some(Signal::Started) | None => continue,
            }
        };

        self.subscription.cancel();
        match &outcome {
            Ok(Outcome::Finished(_)) => tracing::debug!(id = %self.id, "Operation finished"),
            Ok(Outcome::Canceled) => tracing::debug!(id = %self.id, "Operation abandoned"),
            Err(e) => tracing::debug!(id = %self.id, "Operation ended: {}", e),
        }
        outcome
    }

    /// Abandon the wait
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
