use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attention::AttentionContext;
use crate::providers::ContextProvider;

/// The capability a Workflow Engine handle exposes to a `QueueAwareProvider`
/// — kept as a narrow trait rather than a direct dependency on
/// `WorkflowEngine` so `providers` and `workflow` don't need to know about
/// each other's internals.
pub trait QueueDepthSource: Send + Sync {
    /// Current total queue depth across the human-facing strategies
    /// (`immediate` + `batch`).
    fn total_depth(&self) -> usize;
}

/// Reads current depth from a Workflow Engine handle. This is the closed
/// feedback loop from spec.md §4.7: enqueuing a WorkItem raises the depth
/// this provider reports, which the Attention Model then folds into future
/// load scores.
pub struct QueueAwareProvider {
    source: Arc<dyn QueueDepthSource>,
}

impl QueueAwareProvider {
    pub fn new(source: Arc<dyn QueueDepthSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ContextProvider for QueueAwareProvider {
    async fn snapshot(&self, _now: DateTime<Utc>) -> AttentionContext {
        AttentionContext {
            queue_depth: self.source.total_depth() as u32,
            calendar_load: 0.0,
            context_switch_rate: 0.0,
        }
    }
}
