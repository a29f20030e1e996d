//! Queries an external calendar adapter for minutes blocked within the next
//! hour. Modeled on the teacher's `WeatherProvider`/`WebSearchProvider`
//! shape: a config struct with a `Default`, an owned `reqwest::Client`, and
//! graceful degradation on any I/O failure.
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::attention::AttentionContext;
use crate::providers::ContextProvider;

/// Capability a calendar backend must expose. Kept as a trait so tests can
/// supply a fake without performing real HTTP calls.
#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// Minutes of meetings blocked within the next hour window, as of `now`.
    async fn minutes_blocked_next_hour(&self, now: DateTime<Utc>) -> crate::Result<f64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarHttpConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for CalendarHttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/calendar/busy".to_string(),
            timeout_ms: 2_000,
        }
    }
}

/// A generic JSON-over-HTTP calendar adapter: GETs the endpoint with a
/// `?before=<rfc3339>` query param and expects `{"minutes_blocked": <f64>}`.
pub struct HttpCalendarAdapter {
    config: CalendarHttpConfig,
    http_client: reqwest::Client,
}

impl HttpCalendarAdapter {
    pub fn new() -> Self {
        Self::with_config(CalendarHttpConfig::default())
    }

    pub fn with_config(config: CalendarHttpConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http_client }
    }
}

impl Default for HttpCalendarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    minutes_blocked: f64,
}

#[async_trait]
impl CalendarAdapter for HttpCalendarAdapter {
    async fn minutes_blocked_next_hour(&self, now: DateTime<Utc>) -> crate::Result<f64> {
        let url = format!("{}?before={}", self.config.endpoint, now.to_rfc3339());
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::RouterError::ProviderFailure(format!("calendar request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(crate::RouterError::ProviderFailure(format!(
                "calendar API returned status {}",
                response.status()
            )));
        }

        let parsed: CalendarResponse = response
            .json()
            .await
            .map_err(|e| crate::RouterError::ProviderFailure(format!("failed to parse calendar response: {e}")))?;
        Ok(parsed.minutes_blocked)
    }
}

/// Context Provider backed by a `CalendarAdapter`. On any adapter failure,
/// degrades to a zero context and logs at warning, per spec.md §6/§7.
pub struct CalendarAwareProvider<A: CalendarAdapter> {
    adapter: A,
}

impl<A: CalendarAdapter> CalendarAwareProvider<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<A: CalendarAdapter> ContextProvider for CalendarAwareProvider<A> {
    async fn snapshot(&self, now: DateTime<Utc>) -> AttentionContext {
        match self.adapter.minutes_blocked_next_hour(now).await {
            Ok(minutes) => AttentionContext {
                queue_depth: 0,
                calendar_load: (minutes / 60.0).clamp(0.0, 1.0),
                context_switch_rate: 0.0,
            },
            Err(e) => {
                warn!(target: "providers::calendar", error = %e, "calendar adapter failed, degrading to zero context");
                AttentionContext::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAdapter;
    #[async_trait]
    impl CalendarAdapter for FailingAdapter {
        async fn minutes_blocked_next_hour(&self, _now: DateTime<Utc>) -> crate::Result<f64> {
            Err(crate::RouterError::ProviderFailure("boom".into()))
        }
    }

    #[tokio::test]
    async fn failing_adapter_degrades_to_zero_context() {
        let provider = CalendarAwareProvider::new(FailingAdapter);
        let ctx = provider.snapshot(Utc::now()).await;
        assert_eq!(ctx.calendar_load, 0.0);
        assert_eq!(ctx.queue_depth, 0);
    }
}
