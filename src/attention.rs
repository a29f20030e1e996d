//! Attention Model: a pure function mapping telemetry + context to a load
//! scalar in [0,1]. See spec.md §4.3. Never blocks, never performs I/O.
use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetrySummary;

/// Inputs to the attention model beyond raw telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AttentionContext {
    pub queue_depth: u32,
    pub calendar_load: f64,
    pub context_switch_rate: f64,
}

/// Soft caps used to saturate each raw signal into [0,1] before weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftCaps {
    pub keystrokes_per_min: f64,
    pub pager_events_per_min: f64,
    pub queue_depth: f64,
    pub calendar_load: f64,
    pub context_switches_per_min: f64,
}

impl Default for SoftCaps {
    fn default() -> Self {
        Self {
            keystrokes_per_min: 120.0,
            pager_events_per_min: 4.0,
            queue_depth: 10.0,
            calendar_load: 1.0,
            context_switches_per_min: 6.0,
        }
    }
}

/// Per-axis weights; must sum to 1 after normalization (enforced in
/// `AttentionModel::new`/`with_weights`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttentionWeights {
    pub keystrokes: f64,
    pub pager_events: f64,
    pub queue_depth: f64,
    pub calendar_load: f64,
    pub context_switches: f64,
}

impl Default for AttentionWeights {
    fn default() -> Self {
        Self {
            keystrokes: 0.2,
            pager_events: 0.2,
            queue_depth: 0.2,
            calendar_load: 0.2,
            context_switches: 0.2,
        }
    }
}

impl AttentionWeights {
    fn sum(&self) -> f64 {
        self.keystrokes + self.pager_events + self.queue_depth + self.calendar_load + self.context_switches
    }

    fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            keystrokes: self.keystrokes / total,
            pager_events: self.pager_events / total,
            queue_depth: self.queue_depth / total,
            calendar_load: self.calendar_load / total,
            context_switches: self.context_switches / total,
        }
    }
}

fn saturate(raw: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 0.0;
    }
    (raw / cap).clamp(0.0, 1.0)
}

/// Pure scoring function: (TelemetrySummary, AttentionContext) -> load.
#[derive(Debug, Clone)]
pub struct AttentionModel {
    caps: SoftCaps,
    weights: AttentionWeights,
}

impl AttentionModel {
    pub fn new() -> Self {
        Self::with_params(SoftCaps::default(), AttentionWeights::default())
    }

    pub fn with_params(caps: SoftCaps, weights: AttentionWeights) -> Self {
        Self {
            caps,
            weights: weights.normalized(),
        }
    }

    /// `clamp(sum(w_i * partial_load_i), 0, 1)`. Monotone non-decreasing in
    /// each raw signal (holding the others fixed) by construction, since
    /// every partial load is a monotone saturating function of its input
    /// and weights are non-negative.
    pub fn score(&self, telemetry: &TelemetrySummary, context: &AttentionContext) -> f64 {
        let keystroke_partial = saturate(telemetry.keystroke_rate, self.caps.keystrokes_per_min);
        let pager_partial = saturate(telemetry.pager_rate, self.caps.pager_events_per_min);
        let queue_partial = saturate(context.queue_depth as f64, self.caps.queue_depth);
        let calendar_partial = saturate(context.calendar_load, self.caps.calendar_load);
        let switch_partial = saturate(context.context_switch_rate, self.caps.context_switches_per_min);

        let load = self.weights.keystrokes * keystroke_partial
            + self.weights.pager_events * pager_partial
            + self.weights.queue_depth * queue_partial
            + self.weights.calendar_load * calendar_partial
            + self.weights.context_switches * switch_partial;

        load.clamp(0.0, 1.0)
    }
}

impl Default for AttentionModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_telemetry_and_zero_context_is_zero_load() {
        let model = AttentionModel::new();
        let load = model.score(&TelemetrySummary::default(), &AttentionContext::default());
        assert_eq!(load, 0.0);
    }

    #[test]
    fn saturates_at_cap() {
        let model = AttentionModel::new();
        let summary = TelemetrySummary {
            keystroke_rate: 10_000.0,
            ..Default::default()
        };
        let load = model.score(&summary, &AttentionContext::default());
        assert!(load <= 1.0);
        assert!(load > 0.0);
    }
}
