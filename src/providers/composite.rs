use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attention::AttentionContext;
use crate::providers::ContextProvider;

/// Combines N providers: `queue_depth = max`, `calendar_load = max`,
/// `context_switch_rate = sum`. These combination rules are contractual
/// (spec.md §4.2) — adding a provider never lowers `queue_depth` or
/// `calendar_load`.
pub struct CompositeProvider {
    providers: Vec<Box<dyn ContextProvider>>,
}

impl CompositeProvider {
    pub fn new(providers: Vec<Box<dyn ContextProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ContextProvider for CompositeProvider {
    async fn snapshot(&self, now: DateTime<Utc>) -> AttentionContext {
        let mut combined = AttentionContext::default();
        for provider in &self.providers {
            let ctx = provider.snapshot(now).await;
            combined.queue_depth = combined.queue_depth.max(ctx.queue_depth);
            combined.calendar_load = combined.calendar_load.max(ctx.calendar_load);
            combined.context_switch_rate += ctx.context_switch_rate;
        }
        combined
    }
}
