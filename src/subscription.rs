//! Per-subscriber state held by the event bus

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::event::{Event, EventKind};
use crate::filter::Filter;

/// Identifies a subscriber. Subscribing with an id already in use
/// replaces the previous subscription (spec.md §4.1).
pub type SubscriberId = String;

/// Bookkeeping counters for one subscription, shared between the
/// broker task (writer) and the subscriber-facing handle (reader).
#[derive(Debug, Default)]
pub(crate) struct SubscriptionCounters {
    pub delivered: AtomicU64,
    pub dropped: AtomicU64,
    pub filtered: AtomicU64,
    /// Millis since epoch of the last successful delivery, 0 if none yet.
    pub last_delivery_millis: AtomicU64,
}

/// Point-in-time snapshot of a subscription's bookkeeping, returned by
/// [`crate::bus::EventBus::subscriber_info`].
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub kinds: HashSet<EventKind>,
    pub has_filter: bool,
    pub delivered: u64,
    pub dropped: u64,
    pub filtered: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// `None` if nothing has been delivered yet.
    pub last_delivery: Option<chrono::DateTime<chrono::Utc>>,
}

/// Broker-side registration record for one subscriber.
pub(crate) struct Subscriber {
    pub id: SubscriberId,
    pub kinds: HashSet<EventKind>,
    pub filter: Option<Filter>,
    pub sender: mpsc::Sender<Event>,
    pub counters: Arc<SubscriptionCounters>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Subscriber {
    /// Whether this subscriber is interested in `event`'s kind and, for
    /// `Transaction` events, whether its installed filter matches.
    pub fn interested_in(&self, event: &Event) -> bool {
        if !self.kinds.contains(&event.kind()) {
            return false;
        }
        match &self.filter {
            Some(f) => f.matches(event),
            None => true,
        }
    }

    pub fn record_delivered(&self) {
        self.counters.delivered.fetch_add(1, Ordering::Relaxed);
        self.counters
            .last_delivery_millis
            .store(chrono::Utc::now().timestamp_millis().max(0) as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.counters.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn info(&self) -> SubscriberInfo {
        let last_millis = self.counters.last_delivery_millis.load(Ordering::Relaxed);
        SubscriberInfo {
            id: self.id.clone(),
            kinds: self.kinds.clone(),
            has_filter: self.filter.is_some(),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            created_at: self.created_at,
            last_delivery: if last_millis == 0 {
                None
            } else {
                chrono::DateTime::from_timestamp_millis(last_millis as i64)
            },
        }
    }
}

/// A live subscription handle returned to the caller of
/// [`crate::bus::EventBus::subscribe`].
///
/// Dropping this handle does not unsubscribe — call
/// [`crate::bus::EventBus::unsubscribe`] explicitly, matching the
/// manual-lifecycle style of the bus's other registration calls.
pub struct Subscription {
    pub id: SubscriberId,
    pub(crate) receiver: mpsc::Receiver<Event>,
    pub(crate) counters: Arc<SubscriptionCounters>,
}

impl Subscription {
    /// Await the next event delivered to this subscription.
    ///
    /// Returns `None` once the bus has stopped and no further events
    /// will arrive.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to receive without waiting.
    pub fn try_recv(&mut self) -> Result<Event, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn delivered_count(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }
}
