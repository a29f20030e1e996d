//! Topic-keyed pub/sub. Modeled on the teacher's `EventBus` (`event.rs`):
//! a `DashMap<String, Vec<Subscription>>` fanning out to per-subscription
//! `mpsc` channels, QoS-scaled channel capacity, and a backpressure
//! threshold under which only realtime subscribers drop. Subscribers pull
//! from their own receiver rather than registering a callback, so delivery
//! failure is just "channel closed" and never runs subscriber code on the
//! publisher's stack.
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::Result;

/// Determines channel capacity and whether a full channel drops or awaits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
    Realtime,
    Batched,
    Background,
}

impl QosLevel {
    fn channel_capacity(self) -> usize {
        match self {
            QosLevel::Realtime => 64,
            QosLevel::Batched => 1024,
            QosLevel::Background => 4096,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    pub total_published: u64,
    pub total_delivered: u64,
    pub active_subscriptions: usize,
    pub dropped_events: u64,
}

struct Subscription<T> {
    id: u64,
    qos: QosLevel,
    sender: mpsc::Sender<T>,
}

/// An opaque handle returned by `subscribe`, passed back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// In-memory topic pub/sub. `T` is the message payload — `TaskIntent` on
/// the `task_intent` topic, `WorkItem` on `work_item` (spec.md §6).
///
/// Ordering: per-topic FIFO within a single publisher call; no cross-topic
/// ordering. Delivery is at-most-once: a dropped realtime message or a
/// closed receiver is not retried.
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    subscriptions: DashMap<String, Vec<Subscription<T>>>,
    stats: DashMap<String, EventBusStats>,
    next_id: AtomicU64,
    backpressure_threshold: usize,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            stats: DashMap::new(),
            next_id: AtomicU64::new(1),
            backpressure_threshold: 10_000,
        }
    }

    #[tracing::instrument(skip(self, message), fields(topic))]
    pub async fn publish(&self, topic: &str, message: T) -> Result<u64> {
        let mut delivered = 0u64;
        let mut dropped = 0u64;

        let backlog = self
            .stats
            .get(topic)
            .map(|s| s.total_published.saturating_sub(s.total_delivered))
            .unwrap_or(0);
        let over_threshold = backlog as usize >= self.backpressure_threshold;

        if let Some(subs) = self.subscriptions.get(topic) {
            for sub in subs.value() {
                match sub.qos {
                    QosLevel::Realtime => {
                        if over_threshold {
                            dropped += 1;
                            continue;
                        }
                        if sub.sender.try_send(message.clone()).is_ok() {
                            delivered += 1;
                        } else {
                            dropped += 1;
                            warn!(target: "event_bus", topic, subscription_id = sub.id, "dropped realtime message");
                        }
                    }
                    QosLevel::Batched | QosLevel::Background => match sub.sender.send(message.clone()).await {
                        Ok(()) => delivered += 1,
                        Err(_) => dropped += 1,
                    },
                }
            }
        }

        let mut entry = self.stats.entry(topic.to_string()).or_default();
        entry.total_published += 1;
        entry.total_delivered += delivered;
        entry.dropped_events += dropped;
        debug!(target: "event_bus", topic, delivered, dropped, "published");
        Ok(delivered)
    }

    pub fn subscribe(&self, topic: &str, qos: QosLevel) -> (SubscriptionId, mpsc::Receiver<T>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(qos.channel_capacity());
        self.subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(Subscription { id, qos, sender: tx });
        self.stats.entry(topic.to_string()).or_default().active_subscriptions += 1;
        (SubscriptionId(id), rx)
    }

    pub fn unsubscribe(&self, topic: &str, subscription: SubscriptionId) {
        if let Some(mut subs) = self.subscriptions.get_mut(topic) {
            let before = subs.len();
            subs.retain(|s| s.id != subscription.0);
            if subs.len() != before {
                if let Some(mut stats) = self.stats.get_mut(topic) {
                    stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
                }
            }
        }
    }

    pub fn stats(&self, topic: &str) -> Option<EventBusStats> {
        self.stats.get(topic).map(|s| s.clone())
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability an external broker client must expose for the broker-backed
/// bus variant: push a message out, pull whatever arrived since the last
/// poll.
#[async_trait::async_trait]
pub trait BrokerTransport<T: Send + Sync + 'static>: Send + Sync {
    async fn send(&self, topic: &str, message: T) -> Result<()>;
    async fn recv_batch(&self, topic: &str, max: usize) -> Result<Vec<T>>;
}

/// Wraps a `BrokerTransport`, redispatching polled messages through the
/// same in-memory subscriber machinery so QoS and ordering semantics are
/// shared rather than duplicated (spec.md §4.6).
pub struct BrokerBus<T: Clone + Send + Sync + 'static> {
    transport: Box<dyn BrokerTransport<T>>,
    local: EventBus<T>,
}

impl<T: Clone + Send + Sync + 'static> BrokerBus<T> {
    pub fn new(transport: Box<dyn BrokerTransport<T>>) -> Self {
        Self {
            transport,
            local: EventBus::new(),
        }
    }

    pub async fn publish(&self, topic: &str, message: T) -> Result<()> {
        self.transport.send(topic, message).await
    }

    pub fn subscribe(&self, topic: &str, qos: QosLevel) -> (SubscriptionId, mpsc::Receiver<T>) {
        self.local.subscribe(topic, qos)
    }

    pub fn unsubscribe(&self, topic: &str, subscription: SubscriptionId) {
        self.local.unsubscribe(topic, subscription)
    }

    /// Drains up to `max` messages from the broker and fans them out to
    /// local subscribers. Callers own the polling loop.
    pub async fn poll_once(&self, topic: &str, max: usize) -> Result<u64> {
        let batch = self.transport.recv_batch(topic, max).await?;
        let mut total = 0;
        for message in batch {
            total += self.local.publish(topic, message).await?;
        }
        Ok(total)
    }
}
