use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attention::AttentionContext;
use crate::providers::ContextProvider;

/// Delegates to a supplied function; used to plug in host-specific logic
/// (e.g. reading a status field from an external system) without a bespoke
/// provider type.
pub struct CallableProvider<F>
where
    F: Fn(DateTime<Utc>) -> AttentionContext + Send + Sync,
{
    f: F,
}

impl<F> CallableProvider<F>
where
    F: Fn(DateTime<Utc>) -> AttentionContext + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ContextProvider for CallableProvider<F>
where
    F: Fn(DateTime<Utc>) -> AttentionContext + Send + Sync,
{
    async fn snapshot(&self, now: DateTime<Utc>) -> AttentionContext {
        (self.f)(now)
    }
}
