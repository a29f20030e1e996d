//! Routing Policy: pure function mapping a task + attention context to a
//! strategy, priority, and rationale. See spec.md §4.4.
use serde::{Deserialize, Serialize};

use crate::model::{Rationale, SensitivityTag, Strategy, TaskIntent, WorkItem};
use crate::{Result, RouterError};

/// Weights and thresholds for the routing policy. Weights are normalized on
/// construction; negative weights and out-of-range thresholds are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub slo_weight: f64,
    pub uncertainty_weight: f64,
    pub severity_weight: f64,
    pub attention_weight: f64,

    pub immediate_threshold: f64,
    pub batch_threshold: f64,
    pub min_confidence_for_auto: f64,
    pub max_severity_for_auto: u8,
    pub park_load_threshold: f64,

    pub slo_horizon_minutes: f64,
    pub auto_min_slo_minutes: f64,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            slo_weight: 0.4,
            uncertainty_weight: 0.25,
            severity_weight: 0.25,
            attention_weight: 0.1,
            immediate_threshold: 0.75,
            batch_threshold: 0.45,
            min_confidence_for_auto: 0.85,
            max_severity_for_auto: 2,
            park_load_threshold: 0.7,
            slo_horizon_minutes: 60.0,
            auto_min_slo_minutes: 15.0,
        }
    }
}

impl RoutingPolicy {
    /// Builds a policy from raw weights/thresholds, normalizing the four
    /// weights to sum to 1 and rejecting invalid configuration with
    /// `ConfigError` (spec.md §3: "the implementation must normalize on
    /// construction and reject negative weights").
    #[allow(clippy::too_many_arguments)]
    pub fn builder(
        slo_weight: f64,
        uncertainty_weight: f64,
        severity_weight: f64,
        attention_weight: f64,
        immediate_threshold: f64,
        batch_threshold: f64,
        min_confidence_for_auto: f64,
        max_severity_for_auto: u8,
        park_load_threshold: f64,
    ) -> Result<Self> {
        let policy = Self {
            slo_weight,
            uncertainty_weight,
            severity_weight,
            attention_weight,
            immediate_threshold,
            batch_threshold,
            min_confidence_for_auto,
            max_severity_for_auto,
            park_load_threshold,
            ..Self::default()
        };
        policy.validate()
    }

    /// Normalizes the four weights to sum to 1 and checks every constraint
    /// in spec.md §3, rejecting the whole policy with `ConfigError` on the
    /// first violation (no partial update). Used by `builder`, by
    /// `RouterService::update_policy`, and by config loading, so every path
    /// that can install a policy runs the same checks.
    pub fn validate(mut self) -> Result<Self> {
        for (name, w) in [
            ("slo_weight", self.slo_weight),
            ("uncertainty_weight", self.uncertainty_weight),
            ("severity_weight", self.severity_weight),
            ("attention_weight", self.attention_weight),
        ] {
            if w < 0.0 {
                return Err(RouterError::ConfigError(format!("{name} must be non-negative, got {w}")));
            }
        }
        let total = self.slo_weight + self.uncertainty_weight + self.severity_weight + self.attention_weight;
        if total <= 0.0 {
            return Err(RouterError::ConfigError("policy weights must sum to a positive value".into()));
        }
        self.slo_weight /= total;
        self.uncertainty_weight /= total;
        self.severity_weight /= total;
        self.attention_weight /= total;

        if self.batch_threshold >= self.immediate_threshold {
            return Err(RouterError::ConfigError(
                "immediate_threshold must be strictly greater than batch_threshold".into(),
            ));
        }
        if self.immediate_threshold <= 0.0 || self.immediate_threshold >= 1.0 {
            return Err(RouterError::ConfigError("immediate_threshold must be in (0,1)".into()));
        }
        if self.batch_threshold <= 0.0 || self.batch_threshold >= 1.0 {
            return Err(RouterError::ConfigError("batch_threshold must be in (0,1)".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_for_auto) || self.min_confidence_for_auto <= 0.0 {
            return Err(RouterError::ConfigError("min_confidence_for_auto must be in (0,1]".into()));
        }
        if !(1..=5).contains(&self.max_severity_for_auto) {
            return Err(RouterError::ConfigError("max_severity_for_auto must be in 1..=5".into()));
        }
        if !(0.0..1.0).contains(&self.park_load_threshold) {
            return Err(RouterError::ConfigError("park_load_threshold must be in (0,1)".into()));
        }
        Ok(self)
    }

    /// Score a task and produce the `WorkItem` the router will dispatch.
    /// Pure: identical inputs always produce an identical result.
    pub fn decide(
        &self,
        task: TaskIntent,
        queue_depth: usize,
        attention_load: f64,
        decided_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<WorkItem> {
        task.validate()?;

        let slo_component = 1.0 - (task.slo_risk_minutes / self.slo_horizon_minutes).min(1.0);
        let slo_contribution = self.slo_weight * slo_component;
        let uncertainty_contribution = self.uncertainty_weight * (1.0 - task.model_confidence);
        let severity_contribution = self.severity_weight * (task.severity as f64 / 5.0);
        let attention_contribution = self.attention_weight * (1.0 - attention_load);

        let priority = (slo_contribution + uncertainty_contribution + severity_contribution + attention_contribution)
            .clamp(0.0, 1.0);

        let (strategy, rule_fired) = self.select_strategy(&task, priority, attention_load);

        let rationale = Rationale {
            slo_component,
            slo_contribution,
            uncertainty_contribution,
            severity_contribution,
            attention_contribution,
            rule_fired,
        };

        Ok(WorkItem {
            task,
            strategy,
            priority,
            attention_load,
            queue_depth,
            rationale,
            decided_at,
        })
    }

    /// Fixed-order strategy selection: auto, then park, then immediate,
    /// then batch, else park. Ties on a boundary resolve upward (toward
    /// the higher-urgency bucket): `>=`/`<` comparisons below already
    /// implement that for every threshold.
    fn select_strategy(&self, task: &TaskIntent, priority: f64, load: f64) -> (Strategy, String) {
        if task.model_confidence >= self.min_confidence_for_auto
            && task.severity <= self.max_severity_for_auto
            && task.slo_risk_minutes >= self.auto_min_slo_minutes
        {
            return (
                Strategy::Auto,
                "auto: confidence/severity/slo within safe-automation bounds".to_string(),
            );
        }

        if load >= self.park_load_threshold
            && priority < self.immediate_threshold
            && task.sensitivity_tag != SensitivityTag::Regulated
        {
            return (Strategy::Park, "park: load >= park_load_threshold, not immediate, not regulated".to_string());
        }

        if priority >= self.immediate_threshold {
            return (Strategy::Immediate, "immediate: priority >= immediate_threshold".to_string());
        }

        if priority >= self.batch_threshold {
            return (Strategy::Batch, "batch: priority >= batch_threshold".to_string());
        }

        // Regulated tasks are never silently parked (spec rule 2); the
        // fallback bucket for them is batch rather than park.
        if task.sensitivity_tag == SensitivityTag::Regulated {
            return (Strategy::Batch, "batch: regulated task falls back from park".to_string());
        }

        (Strategy::Park, "park: fell through, below batch_threshold".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensitivityTag;
    use chrono::Utc;

    fn task(severity: u8, confidence: f64, slo_risk_minutes: f64, sensitivity: SensitivityTag) -> TaskIntent {
        TaskIntent {
            task_id: "t1".into(),
            severity,
            slo_risk_minutes,
            model_confidence: confidence,
            explanation: "test".into(),
            sensitivity_tag: sensitivity,
            source: "test".into(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_1_auto_safe_path() {
        let policy = RoutingPolicy::default();
        let item = policy
            .decide(task(2, 0.92, 30.0, SensitivityTag::Standard), 0, 0.8, Utc::now())
            .unwrap();
        assert_eq!(item.strategy, Strategy::Auto);
    }

    #[test]
    fn scenario_2_immediate_critical() {
        let policy = RoutingPolicy::default();
        let item = policy
            .decide(task(5, 0.40, 5.0, SensitivityTag::Standard), 0, 0.2, Utc::now())
            .unwrap();
        assert_eq!(item.strategy, Strategy::Immediate);
        assert!(item.priority >= 0.75);
    }

    #[test]
    fn scenario_3_batch_medium() {
        let policy = RoutingPolicy::default();
        let item = policy
            .decide(task(3, 0.65, 25.0, SensitivityTag::Standard), 2, 0.4, Utc::now())
            .unwrap();
        assert_eq!(item.strategy, Strategy::Batch);
        assert!(item.priority >= 0.45 && item.priority < 0.75);
    }

    #[test]
    fn scenario_4_park_under_overload() {
        let policy = RoutingPolicy::default();
        let item = policy
            .decide(task(2, 0.5, 40.0, SensitivityTag::Standard), 0, 0.85, Utc::now())
            .unwrap();
        assert_eq!(item.strategy, Strategy::Park);
        assert!(item.rationale.rule_fired.contains("park"));
    }

    #[test]
    fn scenario_5_regulated_never_parked() {
        let policy = RoutingPolicy::default();
        let item = policy
            .decide(task(2, 0.5, 40.0, SensitivityTag::Regulated), 0, 0.85, Utc::now())
            .unwrap();
        assert_ne!(item.strategy, Strategy::Park);
        assert_eq!(item.strategy, Strategy::Batch);
    }

    #[test]
    fn negative_weight_rejected() {
        let result = RoutingPolicy::builder(-0.1, 0.25, 0.25, 0.1, 0.75, 0.45, 0.85, 2, 0.7);
        assert!(result.is_err());
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let result = RoutingPolicy::builder(0.4, 0.25, 0.25, 0.1, 0.4, 0.45, 0.85, 2, 0.7);
        assert!(result.is_err());
    }
}
