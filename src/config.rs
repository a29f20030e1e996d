//! `RouterConfig`: defaults overlaid by an optional TOML file, modeled on
//! the teacher's `VoiceAgentConfig::load()` (`demo/voice_agent/src/config.rs`)
//! — a `Default` impl, an all-`Option` TOML mirror struct, and an
//! `overlay`/`apply` pair per nested section.
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::attention::{AttentionWeights, SoftCaps};
use crate::policy::RoutingPolicy;
use crate::telemetry::CollectorConfig;
use crate::Result;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub policy: RoutingPolicy,
    pub soft_caps: SoftCaps,
    pub attention_weights: AttentionWeights,
    pub collector: CollectorConfig,
    pub sink_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            policy: RoutingPolicy::default(),
            soft_caps: SoftCaps::default(),
            attention_weights: AttentionWeights::default(),
            collector: CollectorConfig::default(),
            sink_timeout: Duration::from_millis(5_000),
        }
    }
}

impl RouterConfig {
    /// Loads config from a TOML file (path via `BANDWIDTH_ROUTER_CONFIG`,
    /// default `bandwidth_router.toml`), overlaying values onto defaults.
    /// A missing or unparseable file is not an error: it falls back to
    /// defaults and logs at info/warn respectively. The resulting policy is
    /// always validated against spec.md §3's constraints (normalizing
    /// weights, checking threshold ordering and ranges): a config file that
    /// overlays an invalid policy is rejected with `ConfigError` rather than
    /// silently loading a broken one.
    pub fn load() -> Result<Self> {
        let default = Self::default();
        let path = std::env::var("BANDWIDTH_ROUTER_CONFIG").unwrap_or_else(|_| "bandwidth_router.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "config", path = %path, "no TOML config found, using defaults");
            return Ok(default);
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<RouterConfigToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "failed to parse TOML, using defaults");
                    Ok(default)
                }
            },
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "failed to read TOML, using defaults");
                Ok(default)
            }
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct RouterConfigToml {
    policy: Option<PolicyToml>,
    soft_caps: Option<SoftCapsToml>,
    attention_weights: Option<AttentionWeightsToml>,
    collector_window_secs: Option<u64>,
    sink_timeout_ms: Option<u64>,
}

impl RouterConfigToml {
    fn overlay(self, mut base: RouterConfig) -> Result<RouterConfig> {
        if let Some(p) = self.policy {
            p.apply(&mut base.policy);
        }
        base.policy = base.policy.validate()?;
        if let Some(c) = self.soft_caps {
            c.apply(&mut base.soft_caps);
        }
        if let Some(w) = self.attention_weights {
            w.apply(&mut base.attention_weights);
        }
        if let Some(secs) = self.collector_window_secs {
            base.collector.window = Duration::from_secs(secs);
        }
        if let Some(ms) = self.sink_timeout_ms {
            base.sink_timeout = Duration::from_millis(ms);
        }
        Ok(base)
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PolicyToml {
    slo_weight: Option<f64>,
    uncertainty_weight: Option<f64>,
    severity_weight: Option<f64>,
    attention_weight: Option<f64>,
    immediate_threshold: Option<f64>,
    batch_threshold: Option<f64>,
    min_confidence_for_auto: Option<f64>,
    max_severity_for_auto: Option<u8>,
    park_load_threshold: Option<f64>,
    slo_horizon_minutes: Option<f64>,
    auto_min_slo_minutes: Option<f64>,
}

impl PolicyToml {
    fn apply(self, p: &mut RoutingPolicy) {
        if let Some(v) = self.slo_weight {
            p.slo_weight = v;
        }
        if let Some(v) = self.uncertainty_weight {
            p.uncertainty_weight = v;
        }
        if let Some(v) = self.severity_weight {
            p.severity_weight = v;
        }
        if let Some(v) = self.attention_weight {
            p.attention_weight = v;
        }
        if let Some(v) = self.immediate_threshold {
            p.immediate_threshold = v;
        }
        if let Some(v) = self.batch_threshold {
            p.batch_threshold = v;
        }
        if let Some(v) = self.min_confidence_for_auto {
            p.min_confidence_for_auto = v;
        }
        if let Some(v) = self.max_severity_for_auto {
            p.max_severity_for_auto = v;
        }
        if let Some(v) = self.park_load_threshold {
            p.park_load_threshold = v;
        }
        if let Some(v) = self.slo_horizon_minutes {
            p.slo_horizon_minutes = v;
        }
        if let Some(v) = self.auto_min_slo_minutes {
            p.auto_min_slo_minutes = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SoftCapsToml {
    keystrokes_per_min: Option<f64>,
    pager_events_per_min: Option<f64>,
    queue_depth: Option<f64>,
    calendar_load: Option<f64>,
    context_switches_per_min: Option<f64>,
}

impl SoftCapsToml {
    fn apply(self, c: &mut SoftCaps) {
        if let Some(v) = self.keystrokes_per_min {
            c.keystrokes_per_min = v;
        }
        if let Some(v) = self.pager_events_per_min {
            c.pager_events_per_min = v;
        }
        if let Some(v) = self.queue_depth {
            c.queue_depth = v;
        }
        if let Some(v) = self.calendar_load {
            c.calendar_load = v;
        }
        if let Some(v) = self.context_switches_per_min {
            c.context_switches_per_min = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AttentionWeightsToml {
    keystrokes: Option<f64>,
    pager_events: Option<f64>,
    queue_depth: Option<f64>,
    calendar_load: Option<f64>,
    context_switches: Option<f64>,
}

impl AttentionWeightsToml {
    fn apply(self, w: &mut AttentionWeights) {
        if let Some(v) = self.keystrokes {
            w.keystrokes = v;
        }
        if let Some(v) = self.pager_events {
            w.pager_events = v;
        }
        if let Some(v) = self.queue_depth {
            w.queue_depth = v;
        }
        if let Some(v) = self.calendar_load {
            w.calendar_load = v;
        }
        if let Some(v) = self.context_switches {
            w.context_switches = v;
        }
    }
}
