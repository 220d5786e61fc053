//! In-process event bus
//!
//! A single broker task owns the subscriber registry and selects,
//! non-deterministically, among three bounded intake queues — publish,
//! subscribe, unsubscribe — via `tokio::select!`. Every public call that
//! hands the broker a command (`publish`, `subscribe`, `unsubscribe`) is a
//! non-blocking offer (`mpsc::Sender::try_send`) onto its intake queue: a
//! full intake queue fails the call immediately instead of awaiting room.
//! Delivery to each subscriber is likewise a non-blocking offer: a full
//! subscriber queue never blocks the broker or any other subscriber, it
//! only increments that subscriber's drop counter.
//!
//! Publications from a single publisher are delivered in the order they
//! were published (FIFO per publisher); no ordering is guaranteed across
//! different publishers racing to publish concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::event::{Event, EventKind};
use crate::filter::Filter;
use crate::subscription::{Subscriber, SubscriberId, SubscriberInfo, Subscription, SubscriptionCounters};

/// Default capacity of the broker's intake queues, used by
/// [`EventBus::new`]. Callers that need a specific capacity (spec.md §5
/// "intake queues (bounded, size from constructor)") should use
/// [`EventBus::with_intake_capacity`] instead.
const DEFAULT_INTAKE_CAPACITY: usize = 1024;

struct SubscribeCmd {
    id: SubscriberId,
    kinds: std::collections::HashSet<EventKind>,
    filter: Option<Filter>,
    capacity: usize,
    reply: oneshot::Sender<Subscription>,
}

struct UnsubscribeCmd {
    id: SubscriberId,
    reply: oneshot::Sender<bool>,
}

enum ControlCmd {
    Stats(oneshot::Sender<BusStats>),
    SubscriberCount(oneshot::Sender<usize>),
    SubscriberInfo(SubscriberId, oneshot::Sender<Option<SubscriberInfo>>),
    AllSubscriberInfo(oneshot::Sender<Vec<SubscriberInfo>>),
}

/// Aggregate bus-wide counters, returned by [`EventBus::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Handle to a running in-process event bus.
///
/// Cloning an `EventBus` shares the same broker task; dropping every
/// clone does not stop the broker — call [`EventBus::stop`] explicitly.
#[derive(Clone)]
pub struct EventBus {
    publish_tx: mpsc::Sender<Event>,
    subscribe_tx: mpsc::Sender<SubscribeCmd>,
    unsubscribe_tx: mpsc::Sender<UnsubscribeCmd>,
    control_tx: mpsc::Sender<ControlCmd>,
    stop_tx: mpsc::Sender<()>,
    stopped: Arc<AtomicBool>,
}

struct Broker {
    subscribers: HashMap<SubscriberId, Subscriber>,
    published: u64,
    delivered: u64,
    dropped: u64,
}

impl Broker {
    fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            published: 0,
            delivered: 0,
            dropped: 0,
        }
    }

    fn handle_publish(&mut self, event: Event) {
        self.published += 1;
        let span = tracing::debug_span!("publish", kind = %event.kind());
        let _enter = span.enter();
        for sub in self.subscribers.values() {
            if !sub.kinds.contains(&event.kind()) {
                continue;
            }
            let matched = match &sub.filter {
                Some(f) => f.matches(&event),
                None => true,
            };
            if !matched {
                sub.record_filtered();
                continue;
            }
            match sub.sender.try_send(event.clone()) {
                Ok(()) => {
                    sub.record_delivered();
                    self.delivered += 1;
                }
                Err(_) => {
                    sub.record_dropped();
                    self.dropped += 1;
                    tracing::warn!(subscriber = %sub.id, "subscriber queue full, dropping event");
                }
            }
        }
    }

    fn handle_subscribe(&mut self, cmd: SubscribeCmd) {
        let (tx, rx) = mpsc::channel(cmd.capacity.max(1));
        let counters = Arc::new(SubscriptionCounters::default());
        let created_at = chrono::Utc::now();
        let subscriber = Subscriber {
            id: cmd.id.clone(),
            kinds: cmd.kinds,
            filter: cmd.filter,
            sender: tx,
            counters: counters.clone(),
            created_at,
        };
        tracing::info!(subscriber = %cmd.id, "subscriber registered");
        self.subscribers.insert(cmd.id.clone(), subscriber);
        let subscription = Subscription {
            id: cmd.id,
            receiver: rx,
            counters,
        };
        let _ = cmd.reply.send(subscription);
    }

    fn handle_unsubscribe(&mut self, cmd: UnsubscribeCmd) {
        let removed = self.subscribers.remove(&cmd.id).is_some();
        if removed {
            tracing::info!(subscriber = %cmd.id, "subscriber removed");
        }
        let _ = cmd.reply.send(removed);
    }

    fn handle_control(&self, cmd: ControlCmd) {
        match cmd {
            ControlCmd::Stats(reply) => {
                let _ = reply.send(BusStats {
                    published: self.published,
                    delivered: self.delivered,
                    dropped: self.dropped,
                });
            }
            ControlCmd::SubscriberCount(reply) => {
                let _ = reply.send(self.subscribers.len());
            }
            ControlCmd::SubscriberInfo(id, reply) => {
                let _ = reply.send(self.subscribers.get(&id).map(Subscriber::info));
            }
            ControlCmd::AllSubscriberInfo(reply) => {
                let _ = reply.send(self.subscribers.values().map(Subscriber::info).collect());
            }
        }
    }
}

async fn run_broker(
    mut publish_rx: mpsc::Receiver<Event>,
    mut subscribe_rx: mpsc::Receiver<SubscribeCmd>,
    mut unsubscribe_rx: mpsc::Receiver<UnsubscribeCmd>,
    mut control_rx: mpsc::Receiver<ControlCmd>,
    mut stop_rx: mpsc::Receiver<()>,
) {
    let mut broker = Broker::new();
    loop {
        tokio::select! {
            maybe_event = publish_rx.recv() => {
                match maybe_event {
                    Some(event) => broker.handle_publish(event),
                    None => break,
                }
            }
            maybe_cmd = subscribe_rx.recv() => {
                match maybe_cmd {
                    Some(cmd) => broker.handle_subscribe(cmd),
                    None => break,
                }
            }
            maybe_cmd = unsubscribe_rx.recv() => {
                match maybe_cmd {
                    Some(cmd) => broker.handle_unsubscribe(cmd),
                    None => break,
                }
            }
            maybe_cmd = control_rx.recv() => {
                match maybe_cmd {
                    Some(cmd) => broker.handle_control(cmd),
                    None => break,
                }
            }
            _ = stop_rx.recv() => {
                break;
            }
        }
    }
    // Dropping `broker` here drops every subscriber's send half, closing
    // their delivery channels (`Subscription::recv` returns `None`).
    tracing::info!(
        published = broker.published,
        delivered = broker.delivered,
        dropped = broker.dropped,
        "broker task stopped"
    );
}

impl EventBus {
    /// Start the broker task with the default intake capacity and return
    /// a handle to it. Use [`EventBus::with_intake_capacity`] to size the
    /// publish/subscribe/unsubscribe intake queues explicitly.
    pub fn new() -> Self {
        Self::with_intake_capacity(DEFAULT_INTAKE_CAPACITY)
    }

    /// Start the broker task with `intake_capacity`-bounded
    /// publish/subscribe/unsubscribe intake queues (spec.md §5: "intake
    /// queues (bounded, size from constructor)").
    pub fn with_intake_capacity(intake_capacity: usize) -> Self {
        let (publish_tx, publish_rx) = mpsc::channel(intake_capacity.max(1));
        let (subscribe_tx, subscribe_rx) = mpsc::channel(intake_capacity.max(1));
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::channel(intake_capacity.max(1));
        let (control_tx, control_rx) = mpsc::channel(intake_capacity.max(1));
        let (stop_tx, stop_rx) = mpsc::channel(1);

        tokio::spawn(run_broker(
            publish_rx,
            subscribe_rx,
            unsubscribe_rx,
            control_rx,
            stop_rx,
        ));

        Self {
            publish_tx,
            subscribe_tx,
            unsubscribe_tx,
            control_tx,
            stop_tx,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish an event to all matching subscribers.
    ///
    /// Non-blocking: never awaits subscriber or broker capacity. Returns
    /// `false` if the bus has stopped or the publish intake queue is
    /// full; `true` otherwise. A `true` result means the broker accepted
    /// the event for fan-out, not that every subscriber received it —
    /// per-subscriber delivery is best-effort.
    pub async fn publish(&self, event: Event) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        self.publish_tx.try_send(event).is_ok()
    }

    /// Register a new subscriber interested in `kinds`, optionally
    /// narrowed by `filter`. Subscribing with an `id` already in use
    /// replaces the previous subscription for that id.
    ///
    /// `capacity` bounds the subscriber's delivery queue; once full,
    /// further deliveries are dropped and counted rather than blocking.
    ///
    /// Non-blocking: the command is handed to the broker with a
    /// non-blocking offer; a full subscribe intake queue fails the call
    /// immediately rather than waiting for room.
    pub async fn subscribe(
        &self,
        id: impl Into<SubscriberId>,
        kinds: impl IntoIterator<Item = EventKind>,
        filter: Option<Filter>,
        capacity: usize,
    ) -> crate::error::Result<Subscription> {
        if let Some(f) = &filter {
            f.validate()?;
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = SubscribeCmd {
            id: id.into(),
            kinds: kinds.into_iter().collect(),
            filter,
            capacity,
            reply: reply_tx,
        };
        self.subscribe_tx
            .try_send(cmd)
            .map_err(|_| crate::error::EventError::Internal("subscribe intake queue full or bus stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| crate::error::EventError::Internal("broker dropped subscribe reply".into()))
    }

    /// Remove a subscriber. Returns whether a subscriber with `id` existed.
    ///
    /// Non-blocking: the command is handed to the broker with a
    /// non-blocking offer; a full unsubscribe intake queue returns
    /// `false` immediately rather than waiting for room.
    pub async fn unsubscribe(&self, id: impl Into<SubscriberId>) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = UnsubscribeCmd {
            id: id.into(),
            reply: reply_tx,
        };
        if self.unsubscribe_tx.try_send(cmd).is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Aggregate published/delivered/dropped counters across all subscribers.
    pub async fn stats(&self) -> BusStats {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.control_tx.send(ControlCmd::Stats(reply_tx)).await.is_err() {
            return BusStats::default();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .control_tx
            .send(ControlCmd::SubscriberCount(reply_tx))
            .await
            .is_err()
        {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    /// Snapshot of one subscriber's bookkeeping, if it exists.
    pub async fn subscriber_info(&self, id: impl Into<SubscriberId>) -> Option<SubscriberInfo> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .control_tx
            .send(ControlCmd::SubscriberInfo(id.into(), reply_tx))
            .await
            .is_err()
        {
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    /// Snapshot of every subscriber's bookkeeping.
    pub async fn all_subscriber_info(&self) -> Vec<SubscriberInfo> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .control_tx
            .send(ControlCmd::AllSubscriberInfo(reply_tx))
            .await
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Stop the broker task. `publish` rejects immediately from this
    /// call onward; already-queued commands drain first, after which the
    /// broker task exits and every subscriber's channel closes
    /// (`Subscription::recv` returns `None`).
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let _ = self.stop_tx.try_send(());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
