//! Core data model: the task that comes in, and the work item the policy
//! produces for it. See spec.md §3 for field-by-field provenance.
use serde::{Deserialize, Serialize};

/// How sensitive the task's content is. Regulated tasks are never silently
/// parked (spec.md §4.4, rule 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityTag {
    Standard,
    Confidential,
    Regulated,
}

/// An agent/alerting request for human time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIntent {
    pub task_id: String,
    pub severity: u8,
    pub slo_risk_minutes: f64,
    pub model_confidence: f64,
    pub explanation: String,
    pub sensitivity_tag: SensitivityTag,
    pub source: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl TaskIntent {
    /// Validates the fields that have documented range constraints.
    /// Everything else (task_id, explanation, source) is an opaque string.
    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=5).contains(&self.severity) {
            return Err(crate::RouterError::InvalidArgument(format!(
                "severity must be in 1..=5, got {}",
                self.severity
            )));
        }
        if self.slo_risk_minutes < 0.0 {
            return Err(crate::RouterError::InvalidArgument(
                "slo_risk_minutes must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.model_confidence) {
            return Err(crate::RouterError::InvalidArgument(format!(
                "model_confidence must be in [0,1], got {}",
                self.model_confidence
            )));
        }
        if self.task_id.is_empty() {
            return Err(crate::RouterError::InvalidArgument(
                "task_id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// The router's decision for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Immediate,
    Batch,
    Auto,
    Park,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Immediate => "immediate",
            Strategy::Batch => "batch",
            Strategy::Auto => "auto",
            Strategy::Park => "park",
        }
    }
}

/// Structured breakdown of the scoring components and the rule that fired,
/// so a WorkItem's decision can be audited after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rationale {
    pub slo_component: f64,
    pub slo_contribution: f64,
    pub uncertainty_contribution: f64,
    pub severity_contribution: f64,
    pub attention_contribution: f64,
    pub rule_fired: String,
}

/// The routed decision: immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub task: TaskIntent,
    pub strategy: Strategy,
    pub priority: f64,
    pub attention_load: f64,
    pub queue_depth: usize,
    pub rationale: Rationale,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}
