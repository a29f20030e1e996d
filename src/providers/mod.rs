//! Context Providers: pluggable sources of availability signals beyond raw
//! telemetry. See spec.md §4.2.
pub mod calendar_aware;
pub mod callable;
pub mod composite;
pub mod queue_aware;
pub mod static_provider;

pub use calendar_aware::CalendarAwareProvider;
pub use callable::CallableProvider;
pub use composite::CompositeProvider;
pub use queue_aware::{QueueAwareProvider, QueueDepthSource};
pub use static_provider::StaticProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::attention::AttentionContext;

/// Polymorphic over the single capability `snapshot(now) -> AttentionContext`.
/// Providers that fail internally degrade to a zero context rather than
/// propagating an error to the router (spec.md §6/§7: `ProviderFailure` is
/// absorbed locally and logged, never surfaced to `handle_task`'s caller).
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn snapshot(&self, now: DateTime<Utc>) -> AttentionContext;
}
