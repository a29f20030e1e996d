use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attention::AttentionContext;
use crate::providers::ContextProvider;

/// Returns a fixed context, useful for tests and for operators who want to
/// pin a context manually (e.g. "assume I'm always at queue depth 0").
pub struct StaticProvider {
    context: AttentionContext,
}

impl StaticProvider {
    pub fn new(context: AttentionContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ContextProvider for StaticProvider {
    async fn snapshot(&self, _now: DateTime<Utc>) -> AttentionContext {
        self.context
    }
}
