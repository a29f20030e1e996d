//! Telemetry Collector: a rolling time-window aggregator over operator
//! interaction samples. See spec.md §3 and §4.1.
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Result, RouterError};

/// One observation of operator interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub keystrokes: u64,
    pub pager_events: u64,
    pub queue_depth_observed: u64,
    pub calendar_block_minutes: f64,
}

impl TelemetrySample {
    fn validate(&self) -> Result<()> {
        if self.calendar_block_minutes < 0.0 {
            return Err(RouterError::InvalidArgument(
                "calendar_block_minutes must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Derived aggregate emitted by the collector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub keystroke_rate: f64,
    pub pager_rate: f64,
    pub queue_depth: f64,
    pub calendar_load_ratio: f64,
    pub sample_count: usize,
}

/// Tunable knobs for the collector, configuration rather than constants
/// (mirrors the teacher's `WeatherConfig`/`WebSearchConfig` pattern of a
/// `Default` impl plus a `with_config` constructor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub window: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Maintains a time-bounded ordered sequence of `TelemetrySample`.
pub struct TelemetryCollector {
    config: CollectorConfig,
    samples: Mutex<VecDeque<TelemetrySample>>,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::with_config(CollectorConfig::default())
    }

    pub fn with_config(config: CollectorConfig) -> Self {
        Self {
            config,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a sample and evict anything older than `now - window`.
    /// Out-of-order samples (older than the latest already held) are
    /// accepted and inserted in timestamp order; negative counts are
    /// rejected with `InvalidArgument`.
    pub async fn record(&self, sample: TelemetrySample) -> Result<()> {
        sample.validate()?;

        let mut samples = self.samples.lock().await;
        let insert_at = samples
            .iter()
            .rposition(|s| s.timestamp <= sample.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        samples.insert(insert_at, sample);

        let newest = samples.back().map(|s| s.timestamp);
        if let Some(now) = newest {
            Self::evict(&mut samples, now, self.config.window);
        }
        Ok(())
    }

    /// Evict stale entries and compute the normalized summary as of `now`.
    pub async fn summary(&self, now: DateTime<Utc>) -> TelemetrySummary {
        let mut samples = self.samples.lock().await;
        Self::evict(&mut samples, now, self.config.window);

        if samples.is_empty() {
            debug!(target: "telemetry", "no samples in window, returning zeroed summary");
            return TelemetrySummary::default();
        }

        let window_minutes = (self.config.window.as_secs_f64() / 60.0).max(1e-9);
        let count = samples.len() as f64;

        let total_keystrokes: u64 = samples.iter().map(|s| s.keystrokes).sum();
        let total_pager: u64 = samples.iter().map(|s| s.pager_events).sum();
        let mean_queue_depth: f64 =
            samples.iter().map(|s| s.queue_depth_observed as f64).sum::<f64>() / count;
        let mean_calendar_ratio: f64 = samples
            .iter()
            .map(|s| (s.calendar_block_minutes / 60.0).clamp(0.0, 1.0))
            .sum::<f64>()
            / count;

        TelemetrySummary {
            keystroke_rate: total_keystrokes as f64 / window_minutes,
            pager_rate: total_pager as f64 / window_minutes,
            queue_depth: mean_queue_depth,
            calendar_load_ratio: mean_calendar_ratio.clamp(0.0, 1.0),
            sample_count: samples.len(),
        }
    }

    fn evict(samples: &mut VecDeque<TelemetrySample>, now: DateTime<Utc>, window: Duration) {
        let cutoff = now - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        while let Some(front) = samples.front() {
            if front.timestamp < cutoff {
                samples.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
