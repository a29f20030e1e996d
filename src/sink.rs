//! Sinks deliver a routed `WorkItem` to whatever downstream actually handles
//! the strategy (a chat notifier for `immediate`, a digest queue for
//! `batch`, a no-op for `auto`/`park`). Registry shape, timeout handling, and
//! idempotency cache are modeled on the teacher's `ActionBroker`
//! (`action_broker.rs`), generalized from a capability-name registry keyed
//! by `"name:version"` to a registry keyed by `Strategy` plus a `*`
//! wildcard (spec.md §4.5/§6).
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::{Strategy, WorkItem};
use crate::Result;

/// A downstream delivery target for a routed `WorkItem`.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Human-readable name, used in logs and the idempotency cache key.
    fn name(&self) -> &str;

    async fn deliver(&self, item: &WorkItem) -> Result<()>;
}

/// A sink that records calls in-memory; useful for tests and for strategies
/// (`auto`, `park`) that have nothing external to notify.
pub struct NullSink {
    name: String,
}

impl NullSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Sink for NullSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, _item: &WorkItem) -> Result<()> {
        Ok(())
    }
}

/// A registration key: a specific strategy, or the `*` wildcard that fires
/// for every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKey {
    Strategy(Strategy),
    Wildcard,
}

/// Registry mapping a `SinkKey` to the sinks that handle it (fired in
/// registration order), plus an idempotency cache so a redelivered
/// `task_id` is not delivered twice. A sink failure is logged and does not
/// block the remaining sinks (spec.md §4.5).
pub struct SinkRegistry {
    sinks: DashMap<SinkKey, Vec<Arc<dyn Sink>>>,
    delivered: Mutex<Vec<String>>,
    timeout: Duration,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(5_000))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            sinks: DashMap::new(),
            delivered: Mutex::new(Vec::new()),
            timeout,
        }
    }

    /// Idempotent on sink identity: registering the same `Arc` twice under
    /// the same key is a no-op.
    pub fn register(&self, key: SinkKey, sink: Arc<dyn Sink>) {
        debug!(target: "sink_registry", sink = sink.name(), "registering sink");
        let mut entry = self.sinks.entry(key).or_default();
        if !entry.iter().any(|existing| Arc::ptr_eq(existing, &sink)) {
            entry.push(sink);
        }
    }

    /// Delivers `item` to every sink registered under its strategy, plus
    /// every wildcard sink, in registration order. A strategy/wildcard with
    /// no registered sinks is a silent no-op.
    #[tracing::instrument(skip(self, item), fields(task_id = %item.task.task_id, strategy = item.strategy.as_str()))]
    pub async fn deliver(&self, item: &WorkItem) -> Result<()> {
        {
            let mut delivered = self.delivered.lock().await;
            if delivered.iter().any(|id| id == &item.task.task_id) {
                debug!(target: "sink_registry", task_id = %item.task.task_id, "idempotent skip, already delivered");
                return Ok(());
            }
            delivered.push(item.task.task_id.clone());
        }

        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
        if let Some(specific) = self.sinks.get(&SinkKey::Strategy(item.strategy)) {
            sinks.extend(specific.value().iter().cloned());
        }
        if let Some(wildcard) = self.sinks.get(&SinkKey::Wildcard) {
            sinks.extend(wildcard.value().iter().cloned());
        }

        for sink in sinks {
            let start = Instant::now();
            let result = tokio::time::timeout(self.timeout, sink.deliver(item)).await;
            let elapsed = start.elapsed();

            match result {
                Ok(Ok(())) => {
                    debug!(target: "sink_registry", task_id = %item.task.task_id, sink = sink.name(), elapsed_ms = elapsed.as_millis() as u64, "delivered");
                }
                Ok(Err(e)) => {
                    warn!(target: "sink_registry", task_id = %item.task.task_id, sink = sink.name(), error = %e, "sink delivery failed, continuing with remaining sinks");
                }
                Err(_) => {
                    warn!(target: "sink_registry", task_id = %item.task.task_id, sink = sink.name(), "sink delivery timed out, continuing with remaining sinks");
                }
            }
        }

        Ok(())
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rationale, SensitivityTag, TaskIntent};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_item(strategy: Strategy) -> WorkItem {
        sample_item_with_id("t1", strategy)
    }

    fn sample_item_with_id(task_id: &str, strategy: Strategy) -> WorkItem {
        WorkItem {
            task: TaskIntent {
                task_id: task_id.into(),
                severity: 3,
                slo_risk_minutes: 10.0,
                model_confidence: 0.9,
                explanation: "test".into(),
                sensitivity_tag: SensitivityTag::Standard,
                source: "test".into(),
                submitted_at: Utc::now(),
            },
            strategy,
            priority: 0.5,
            attention_load: 0.2,
            queue_depth: 0,
            rationale: Rationale {
                slo_component: 0.0,
                slo_contribution: 0.0,
                uncertainty_contribution: 0.0,
                severity_contribution: 0.0,
                attention_contribution: 0.0,
                rule_fired: "test".into(),
            },
            decided_at: Utc::now(),
        }
    }

    struct CountingSink {
        name: String,
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Sink for CountingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, _item: &WorkItem) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _item: &WorkItem) -> Result<()> {
            Err(crate::RouterError::SinkFailure("boom".into()))
        }
    }

    #[tokio::test]
    async fn delivers_to_registered_sink() {
        let registry = SinkRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(
            SinkKey::Strategy(Strategy::Immediate),
            Arc::new(CountingSink {
                name: "chat".into(),
                count: Arc::clone(&count),
            }),
        );
        registry.deliver(&sample_item(Strategy::Immediate)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_strategy_is_a_silent_noop() {
        let registry = SinkRegistry::new();
        registry.deliver(&sample_item(Strategy::Park)).await.unwrap();
    }

    #[tokio::test]
    async fn redelivery_of_same_task_id_is_idempotent() {
        let registry = SinkRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(
            SinkKey::Strategy(Strategy::Batch),
            Arc::new(CountingSink {
                name: "digest".into(),
                count: Arc::clone(&count),
            }),
        );
        let item = sample_item(Strategy::Batch);
        registry.deliver(&item).await.unwrap();
        registry.deliver(&item).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wildcard_sink_fires_for_every_strategy() {
        let registry = SinkRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(
            SinkKey::Wildcard,
            Arc::new(CountingSink {
                name: "audit".into(),
                count: Arc::clone(&count),
            }),
        );
        registry.deliver(&sample_item_with_id("t1", Strategy::Auto)).await.unwrap();
        registry.deliver(&sample_item_with_id("t2", Strategy::Park)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_failing_sink_does_not_block_the_others() {
        let registry = SinkRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(SinkKey::Strategy(Strategy::Batch), Arc::new(FailingSink));
        registry.register(
            SinkKey::Strategy(Strategy::Batch),
            Arc::new(CountingSink {
                name: "digest".into(),
                count: Arc::clone(&count),
            }),
        );
        registry.deliver(&sample_item(Strategy::Batch)).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
