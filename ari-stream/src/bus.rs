//! In-process publish/subscribe bus
//!
//! Live subscriptions sit in a map keyed by [`SubscriptionId`] behind one
//! `RwLock`. Publishing takes the read lock, subscribing and detaching take
//! the write lock. A subscription only holds a weak reference back to the bus
//! through its detach callback, so handles can outlive the bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ari_api::{Event, Key};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::subscription::{EventTypes, Once, Shared, Subscription, SubscriptionId};

/// Delivery queue capacity of a subscription unless configured otherwise
pub const DEFAULT_QUEUE_SIZE: usize = 100;

struct BusInner {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<Shared>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    queue_size: usize,
}

/// Fan-out of events to filtered subscriptions
///
/// Cloning is cheap; clones share the same set of subscriptions.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    pub fn new() -> Self {
        Self::with_queue_size(DEFAULT_QUEUE_SIZE)
    }

    /// Bus whose subscriptions queue up to `queue_size` events each
    pub fn with_queue_size(queue_size: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscriptions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                queue_size: queue_size.max(1),
            }),
        }
    }

    /// Subscribe to events matching `key` whose type is one of
    /// `event_types` (or `all`)
    ///
    /// After [`close`](Self::close) the returned subscription is already
    /// closed.
    pub fn subscribe(&self, key: Key, event_types: &[&str]) -> Subscription {
        self.subscribe_with_capacity(key, event_types, self.inner.queue_size)
    }

    pub fn subscribe_with_capacity(
        &self,
        key: Key,
        event_types: &[&str],
        capacity: usize,
    ) -> Subscription {
        let id = SubscriptionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shared = Arc::new(Shared::new(id, key, EventTypes::new(event_types), tx));

        {
            let mut subscriptions = self.inner.subscriptions.write();
            if self.inner.closed.load(Ordering::Acquire) {
                drop(subscriptions);
                shared.close();
                return Subscription::new(shared, rx);
            }
            subscriptions.insert(id, Arc::clone(&shared));
        }

        let bus = Arc::downgrade(&self.inner);
        shared.on_cancel(Box::new(move || {
            if let Some(bus) = bus.upgrade() {
                bus.subscriptions.write().remove(&id);
            }
        }));

        tracing::trace!(subscription = %id, key = %shared.key(), "Subscribed");
        Subscription::new(shared, rx)
    }

    /// Wait for the first event matching `key` and `event_types`
    pub fn once(&self, key: Key, event_types: &[&str]) -> Once {
        Once::new(self.subscribe(key, event_types))
    }

    /// Publish `event` to every matching subscription without blocking
    ///
    /// Returns how many subscriptions queued it.
    pub fn send(&self, event: impl Into<Arc<Event>>) -> usize {
        if self.inner.closed.load(Ordering::Acquire) {
            return 0;
        }

        let event = event.into();
        let keys = event.keys();
        let event_type = event.event_type();

        let subscriptions = self.inner.subscriptions.read();
        subscriptions
            .values()
            .filter(|subscription| subscription.wants(event_type, &keys))
            .filter(|subscription| subscription.deliver(&event))
            .count()
    }

    /// Cancel every live subscription and refuse new ones
    ///
    /// Idempotent. Once it returns, no `send` reaches a subscription that
    /// existed before.
    pub fn close(&self) {
        let drained: Vec<Arc<Shared>> = {
            let mut subscriptions = self.inner.subscriptions.write();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            subscriptions.drain().map(|(_, shared)| shared).collect()
        };

        tracing::debug!("Closing event bus with {} subscriptions", drained.len());
        for shared in drained {
            shared.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of open subscriptions
    pub fn live_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("live", &self.live_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
