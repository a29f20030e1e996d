//! Offline Evaluator & Optimizer: replays historical records through a
//! `RoutingPolicy`, computes aggregate metrics, and grid-searches a weight/
//! threshold space against an objective. Pure: same inputs always produce
//! an identical `Report` (spec.md §4.8). Modeled on the teacher's
//! `ModelRouter::record_decision` bookkeeping (`router.rs`) for the kind of
//! per-strategy counters to keep, generalized from a live metrics sink to a
//! batch replay.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attention::{AttentionContext, AttentionModel};
use crate::model::{Strategy, TaskIntent};
use crate::policy::RoutingPolicy;
use crate::telemetry::TelemetrySummary;

/// One historical observation: the state the router would have seen, plus
/// an optional ground-truth flag for whether a human actually intervened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub telemetry: TelemetrySummary,
    pub context: AttentionContext,
    pub task: TaskIntent,
    pub baseline_human_intervention: Option<bool>,
}

/// Aggregate metrics produced by `evaluate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub total_records: usize,
    pub strategy_counts: BTreeMap<Strategy, usize>,
    pub average_priority: f64,
    pub average_load: f64,
    pub baseline_human_rate: f64,
    pub router_human_rate: f64,
    pub human_intervention_reduction: f64,
}

/// What `optimize` should maximize or minimize over the grid.
pub enum Objective {
    /// Minimize router human-intervention rate.
    HumanRate,
    /// Maximize average priority.
    PriorityMean,
    /// Caller-supplied scalar; `optimize` maximizes it.
    Custom(Arc<dyn Fn(&Report) -> f64 + Send + Sync>),
}

impl Objective {
    fn score(&self, report: &Report) -> f64 {
        match self {
            Objective::HumanRate => -report.router_human_rate,
            Objective::PriorityMean => report.average_priority,
            Objective::Custom(f) => f(report),
        }
    }
}

/// Replays `records` through `policy` and reports aggregate metrics. Pure
/// function: the Attention Model and Routing Policy never perform I/O, so
/// identical `(records, policy)` always yields a byte-identical `Report`.
pub fn evaluate(records: &[HistoricalRecord], policy: &RoutingPolicy) -> Report {
    if records.is_empty() {
        return Report::default();
    }

    let model = AttentionModel::new();
    let mut strategy_counts: BTreeMap<Strategy, usize> = BTreeMap::new();
    let mut priority_sum = 0.0;
    let mut load_sum = 0.0;
    let mut baseline_interventions = 0usize;
    let mut baseline_known = 0usize;
    let mut router_interventions = 0usize;

    for record in records {
        let load = model.score(&record.telemetry, &record.context);
        let decided_at = record.task.submitted_at;
        let decision = policy.decide(record.task.clone(), record.context.queue_depth as usize, load, decided_at);

        let decision = match decision {
            Ok(item) => item,
            Err(_) => continue,
        };

        *strategy_counts.entry(decision.strategy).or_insert(0) += 1;
        priority_sum += decision.priority;
        load_sum += load;

        if matches!(decision.strategy, Strategy::Immediate | Strategy::Batch) {
            router_interventions += 1;
        }

        if let Some(intervened) = record.baseline_human_intervention {
            baseline_known += 1;
            if intervened {
                baseline_interventions += 1;
            }
        }
    }

    let total = records.len();
    let baseline_human_rate = if baseline_known > 0 {
        baseline_interventions as f64 / baseline_known as f64
    } else {
        0.0
    };
    let router_human_rate = router_interventions as f64 / total as f64;
    let human_intervention_reduction = if baseline_human_rate > 0.0 {
        (baseline_human_rate - router_human_rate) / baseline_human_rate
    } else {
        0.0
    };

    Report {
        total_records: total,
        strategy_counts,
        average_priority: priority_sum / total as f64,
        average_load: load_sum / total as f64,
        baseline_human_rate,
        router_human_rate,
        human_intervention_reduction,
    }
}

/// Evaluates `records` against each labeled policy in turn.
pub fn sweep(records: &[HistoricalRecord], labeled_policies: &[(String, RoutingPolicy)]) -> Vec<(String, Report)> {
    labeled_policies
        .iter()
        .map(|(label, policy)| (label.clone(), evaluate(records, policy)))
        .collect()
}

/// One axis of the grid search: a named policy field plus the values to try.
pub struct GridAxis {
    pub name: String,
    pub values: Vec<f64>,
}

/// A single grid point: a full set of weight/threshold values, one per
/// `RoutingPolicy::builder` argument (in its argument order).
#[derive(Debug, Clone)]
pub struct GridPoint {
    pub slo_weight: f64,
    pub uncertainty_weight: f64,
    pub severity_weight: f64,
    pub attention_weight: f64,
    pub immediate_threshold: f64,
    pub batch_threshold: f64,
    pub min_confidence_for_auto: f64,
    pub max_severity_for_auto: u8,
    pub park_load_threshold: f64,
}

/// Enumerates the Cartesian product of `candidates` (one list of grid
/// points to try) against `records`, and returns the best-scoring policy
/// under `objective`. Ties are broken by the first-encountered candidate,
/// i.e. iteration order of `candidates` — grid search itself does not
/// reorder or deduplicate.
pub fn optimize(
    records: &[HistoricalRecord],
    candidates: &[GridPoint],
    objective: &Objective,
) -> Option<(RoutingPolicy, f64)> {
    let mut best: Option<(RoutingPolicy, f64)> = None;

    for point in candidates {
        let policy = match RoutingPolicy::builder(
            point.slo_weight,
            point.uncertainty_weight,
            point.severity_weight,
            point.attention_weight,
            point.immediate_threshold,
            point.batch_threshold,
            point.min_confidence_for_auto,
            point.max_severity_for_auto,
            point.park_load_threshold,
        ) {
            Ok(p) => p,
            Err(_) => continue,
        };

        let report = evaluate(records, &policy);
        let score = objective.score(&report);

        match &best {
            Some((_, best_score)) if score <= *best_score => {}
            _ => best = Some((policy, score)),
        }
    }

    best
}
