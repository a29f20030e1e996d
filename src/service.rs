//! Router Service: composes the Telemetry Collector, Context Providers, the
//! Attention Model, and the Routing Policy into a single `handle_task`
//! entry point, then dispatches the resulting `WorkItem` to registered
//! sinks. Concurrency model follows spec.md §5: the policy is replaced by
//! atomic reference swap (`arc-swap`-style via `RwLock`), the sink registry
//! and telemetry collector serialize their own mutations internally, and
//! `handle_task` calls are processed in arrival order by the caller's own
//! serialization (a single owner per instance, per spec.md §5).
use std::sync::Arc;

use chrono::Utc;
use opentelemetry::{global, metrics::Counter, KeyValue};
use tokio::sync::RwLock;
use tracing::debug;

use crate::attention::AttentionModel;
use crate::model::{TaskIntent, WorkItem};
use crate::policy::RoutingPolicy;
use crate::providers::ContextProvider;
use crate::sink::{Sink, SinkKey, SinkRegistry};
use crate::telemetry::TelemetryCollector;
use crate::Result;

/// Orchestrates one routing decision end to end.
pub struct RouterService {
    telemetry: Arc<TelemetryCollector>,
    context: Arc<dyn ContextProvider>,
    model: AttentionModel,
    policy: RwLock<Arc<RoutingPolicy>>,
    sinks: SinkRegistry,
    decisions_counter: Counter<u64>,
}

impl RouterService {
    pub fn new(telemetry: Arc<TelemetryCollector>, context: Arc<dyn ContextProvider>, policy: RoutingPolicy) -> Self {
        let meter = global::meter("bandwidth_router.service");
        let decisions_counter = meter
            .u64_counter("bandwidth_router.decisions_total")
            .with_description("Total number of routing decisions, by strategy")
            .init();

        Self {
            telemetry,
            context,
            model: AttentionModel::new(),
            policy: RwLock::new(Arc::new(policy)),
            sinks: SinkRegistry::new(),
            decisions_counter,
        }
    }

    /// Gathers a fresh telemetry summary and composed context, scores the
    /// task, produces a `WorkItem`, dispatches it to sinks, and returns it.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.task_id))]
    pub async fn handle_task(&self, task: TaskIntent) -> Result<WorkItem> {
        let now = Utc::now();
        let summary = self.telemetry.summary(now).await;
        let context = self.context.snapshot(now).await;
        let load = self.model.score(&summary, &context);

        let policy = Arc::clone(&*self.policy.read().await);
        let item = policy.decide(task, context.queue_depth as usize, load, now)?;

        self.decisions_counter
            .add(1, &[KeyValue::new("strategy", item.strategy.as_str())]);
        debug!(target: "router_service", task_id = %item.task.task_id, strategy = item.strategy.as_str(), priority = item.priority, "routed");
        self.sinks.deliver(&item).await?;
        Ok(item)
    }

    /// Idempotent on sink identity.
    pub fn register_sink(&self, key: SinkKey, sink: Arc<dyn Sink>) {
        self.sinks.register(key, sink);
    }

    /// Validates `new_policy` against the constraints in spec.md §3 and
    /// atomically replaces the active policy. Rejects the whole update with
    /// `ConfigError` on the first violation; the active policy is left
    /// untouched on failure (no partial update).
    pub async fn update_policy(&self, new_policy: RoutingPolicy) -> Result<()> {
        let validated = new_policy.validate()?;
        *self.policy.write().await = Arc::new(validated);
        Ok(())
    }

    pub async fn current_policy(&self) -> Arc<RoutingPolicy> {
        Arc::clone(&*self.policy.read().await)
    }

    pub async fn telemetry_summary(&self) -> crate::telemetry::TelemetrySummary {
        self.telemetry.summary(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensitivityTag;
    use crate::providers::StaticProvider;
    use crate::attention::AttentionContext;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn task(confidence: f64) -> TaskIntent {
        TaskIntent {
            task_id: "t1".into(),
            severity: 2,
            slo_risk_minutes: 30.0,
            model_confidence: confidence,
            explanation: "test".into(),
            sensitivity_tag: SensitivityTag::Standard,
            source: "test".into(),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn handle_task_dispatches_to_registered_sink() {
        use async_trait::async_trait;

        struct CountingSink(Arc<AtomicUsize>);
        #[async_trait]
        impl Sink for CountingSink {
            fn name(&self) -> &str {
                "counting"
            }
            async fn deliver(&self, _item: &WorkItem) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let telemetry = Arc::new(TelemetryCollector::new());
        let context = Arc::new(StaticProvider::new(AttentionContext::default()));
        let service = RouterService::new(telemetry, context, RoutingPolicy::default());

        let count = Arc::new(AtomicUsize::new(0));
        service.register_sink(SinkKey::Wildcard, Arc::new(CountingSink(Arc::clone(&count))));

        let item = service.handle_task(task(0.92)).await.unwrap();
        assert_eq!(item.task.task_id, "t1");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_policy_affects_subsequent_decisions() {
        let telemetry = Arc::new(TelemetryCollector::new());
        let context = Arc::new(StaticProvider::new(AttentionContext::default()));
        let service = RouterService::new(telemetry, context, RoutingPolicy::default());

        let strict = RoutingPolicy::builder(0.4, 0.25, 0.25, 0.1, 0.95, 0.94, 0.999, 1, 0.7).unwrap();
        service.update_policy(strict).await.unwrap();

        let item = service.handle_task(task(0.92)).await.unwrap();
        assert_ne!(item.strategy, crate::model::Strategy::Auto);
    }

    #[tokio::test]
    async fn update_policy_rejects_invalid_policy_and_keeps_the_old_one() {
        let telemetry = Arc::new(TelemetryCollector::new());
        let context = Arc::new(StaticProvider::new(AttentionContext::default()));
        let service = RouterService::new(telemetry, context, RoutingPolicy::default());

        let invalid = RoutingPolicy {
            slo_weight: -1.0,
            ..RoutingPolicy::default()
        };
        assert!(service.update_policy(invalid).await.is_err());

        let item = service.handle_task(task(0.92)).await.unwrap();
        assert_eq!(item.strategy, crate::model::Strategy::Auto);
    }

    #[tokio::test]
    async fn missing_sink_is_not_an_error() {
        let telemetry = Arc::new(TelemetryCollector::new());
        let context = Arc::new(StaticProvider::new(AttentionContext::default()));
        let service = RouterService::new(telemetry, context, RoutingPolicy::default());
        service.handle_task(task(0.92)).await.unwrap();
    }
}
