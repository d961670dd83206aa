//! Subscriptions to the event bus
//!
//! A [`Subscription`] is a filtered, bounded queue of events. It is Open until
//! it is cancelled (explicitly, by drop, or by the bus closing) and Closed
//! afterwards. Closing runs the registered on-cancel callbacks and then drops
//! the sending half of the queue, so the consumer still receives whatever was
//! already queued and then sees the end of the stream.

use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use ari_api::{event_types, Event, Key, Keys};
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Identifier of a subscription within its bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Event-type filter of a subscription
///
/// An empty list of tags accepts nothing; the `all` tag accepts every type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTypes {
    All,
    Only(HashSet<String>),
}

impl EventTypes {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut only = HashSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            if tag == event_types::ALL {
                return EventTypes::All;
            }
            only.insert(tag.to_string());
        }
        EventTypes::Only(only)
    }

    pub fn contains(&self, event_type: &str) -> bool {
        match self {
            EventTypes::All => true,
            EventTypes::Only(tags) => tags.contains(event_type),
        }
    }
}

type CancelCallback = Box<dyn FnOnce() + Send>;

/// State shared between a [`Subscription`] handle and the bus that feeds it
pub(crate) struct Shared {
    id: SubscriptionId,
    key: Key,
    event_types: EventTypes,
    sender: Mutex<Option<mpsc::Sender<Arc<Event>>>>,
    closed: AtomicBool,
    on_cancel: Mutex<Vec<CancelCallback>>,
    dropped: AtomicU64,
}

impl Shared {
    pub(crate) fn new(
        id: SubscriptionId,
        key: Key,
        event_types: EventTypes,
        sender: mpsc::Sender<Arc<Event>>,
    ) -> Self {
        Self {
            id,
            key,
            event_types,
            sender: Mutex::new(Some(sender)),
            closed: AtomicBool::new(false),
            on_cancel: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    /// Whether an event of `event_type` carrying `keys` passes this filter
    pub(crate) fn wants(&self, event_type: &str, keys: &Keys) -> bool {
        self.event_types.contains(event_type) && keys.any_match(&self.key)
    }

    /// Enqueue without waiting; a full queue drops the event for this
    /// subscriber only
    pub(crate) fn deliver(&self, event: &Arc<Event>) -> bool {
        let sender = self.sender.lock();
        // closed before the sender is dropped, while cancel callbacks run
        if self.is_closed() {
            return false;
        }
        let Some(tx) = sender.as_ref() else {
            return false;
        };

        match tx.try_send(Arc::clone(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(
                    subscription = %self.id,
                    dropped,
                    "Subscription queue full, dropping {}",
                    event.event_type()
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub(crate) fn on_cancel(&self, callback: CancelCallback) {
        {
            let mut callbacks = self.on_cancel.lock();
            if !self.closed.load(Ordering::Acquire) {
                callbacks.push(callback);
                return;
            }
        }
        callback();
    }

    /// Open -> Closed; only the first call does anything
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let callbacks = std::mem::take(&mut *self.on_cancel.lock());
        for callback in callbacks {
            callback();
        }

        self.sender.lock().take();
        tracing::trace!(subscription = %self.id, key = %self.key, "Subscription closed");
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A filtered stream of events from a [`Bus`](crate::Bus)
///
/// Dropping the handle cancels the subscription.
pub struct Subscription {
    shared: Arc<Shared>,
    events: mpsc::Receiver<Arc<Event>>,
}

impl Subscription {
    pub(crate) fn new(shared: Arc<Shared>, events: mpsc::Receiver<Arc<Event>>) -> Self {
        Self { shared, events }
    }

    pub fn id(&self) -> SubscriptionId {
        self.shared.id
    }

    pub fn key(&self) -> &Key {
        &self.shared.key
    }

    pub fn event_types(&self) -> &EventTypes {
        &self.shared.event_types
    }

    /// Wait for the next event; `None` once closed and drained
    pub async fn next(&mut self) -> Option<Arc<Event>> {
        self.events.recv().await
    }

    /// Next queued event, without waiting
    pub fn try_next(&mut self) -> Option<Arc<Event>> {
        self.events.try_recv().ok()
    }

    /// Wait up to `duration` for the next event
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<Arc<Event>> {
        tokio::time::timeout(duration, self.next()).await.ok().flatten()
    }

    /// Stop delivery and end the stream. Safe to call any number of times.
    pub fn cancel(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Events discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Run `callback` when the subscription closes; immediately if it
    /// already has
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.on_cancel(Box::new(callback));
    }
}

impl Stream for Subscription {
    type Item = Arc<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.shared.id)
            .field("key", &self.shared.key)
            .field("event_types", &self.shared.event_types)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One-shot wait for the first matching event
///
/// The underlying subscription is cancelled as soon as an event arrives or
/// the handle is dropped.
#[derive(Debug)]
pub struct Once {
    subscription: Subscription,
}

impl Once {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Wait for the event; `None` if cancelled or the bus closed first
    pub async fn wait(mut self) -> Option<Arc<Event>> {
        let event = self.subscription.next().await;
        self.subscription.cancel();
        event
    }

    /// Like [`wait`](Self::wait) with a deadline
    pub async fn wait_timeout(self, duration: Duration) -> Option<Arc<Event>> {
        tokio::time::timeout(duration, self.wait()).await.ok().flatten()
    }

    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}
