//! Workflow Engine: holds routed `WorkItem`s in per-strategy queues for an
//! external human-facing consumer to dequeue/complete, and doubles as a
//! `QueueDepthSource` so its own depth feeds back into the Attention Model
//! (spec.md §4.7). Registry/idempotency shape grounded on the teacher's
//! `ActionBroker` (`action_broker.rs`), adapted from a call-id cache to
//! per-strategy `VecDeque<WorkItem>` queues.
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::model::{Strategy, WorkItem};
use crate::providers::QueueDepthSource;
use crate::Result;

/// Accept/queue/dequeue operations a Workflow Engine exposes. Kept as a
/// trait so an external orchestrator adapter can stand in for the built-in
/// in-memory engine without the rest of the crate knowing the difference.
#[async_trait]
pub trait Workflow: Send + Sync {
    async fn accept(&self, item: WorkItem) -> Result<()>;
    async fn depth(&self, strategy: Option<Strategy>) -> usize;
    async fn next(&self, strategy: Strategy) -> Option<WorkItem>;
    async fn complete(&self, task_id: &str) -> Result<()>;

    /// Non-consuming listing of queued items, for `GET /queue?strategy=`
    /// (spec.md §6). `None` lists every strategy's contents.
    async fn items(&self, strategy: Option<Strategy>) -> Vec<WorkItem>;
}

struct State {
    immediate: VecDeque<WorkItem>,
    batch: VecDeque<WorkItem>,
    seen: HashSet<String>,
    /// `auto`/`park` items are never dequeued by a human-facing worker but
    /// are kept for audit/query (spec.md §4.7).
    recorded: Vec<WorkItem>,
}

/// The built-in in-memory Workflow Engine.
pub struct WorkflowEngine {
    state: Mutex<State>,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                immediate: VecDeque::new(),
                batch: VecDeque::new(),
                seen: HashSet::new(),
                recorded: Vec::new(),
            }),
        }
    }

    /// Items recorded for `auto`/`park` strategies, for audit/inspection.
    pub async fn recorded(&self) -> Vec<WorkItem> {
        self.state.lock().unwrap().recorded.clone()
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Workflow for WorkflowEngine {
    /// Idempotent on `task_id`: a WorkItem already accepted (enqueued or
    /// recorded) is silently ignored on a second `accept`.
    async fn accept(&self, item: WorkItem) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.seen.insert(item.task.task_id.clone()) {
            debug!(target: "workflow", task_id = %item.task.task_id, "idempotent skip, already accepted");
            return Ok(());
        }

        match item.strategy {
            Strategy::Immediate => {
                let pos = state
                    .immediate
                    .iter()
                    .position(|existing| existing.priority < item.priority)
                    .unwrap_or(state.immediate.len());
                state.immediate.insert(pos, item);
            }
            Strategy::Batch => state.batch.push_back(item),
            Strategy::Auto | Strategy::Park => state.recorded.push(item),
        }
        Ok(())
    }

    async fn depth(&self, strategy: Option<Strategy>) -> usize {
        let state = self.state.lock().unwrap();
        match strategy {
            Some(Strategy::Immediate) => state.immediate.len(),
            Some(Strategy::Batch) => state.batch.len(),
            Some(Strategy::Auto) | Some(Strategy::Park) => 0,
            None => state.immediate.len() + state.batch.len(),
        }
    }

    /// Pops the highest-priority item for `immediate` (ties broken FIFO,
    /// since equal-priority items are inserted after existing equal-priority
    /// peers); strict FIFO for `batch`.
    async fn next(&self, strategy: Strategy) -> Option<WorkItem> {
        let mut state = self.state.lock().unwrap();
        match strategy {
            Strategy::Immediate => state.immediate.pop_front(),
            Strategy::Batch => state.batch.pop_front(),
            Strategy::Auto | Strategy::Park => None,
        }
    }

    async fn complete(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.immediate.retain(|i| i.task.task_id != task_id);
        state.batch.retain(|i| i.task.task_id != task_id);
        Ok(())
    }

    /// Clones the requested queue(s) without dequeuing anything.
    async fn items(&self, strategy: Option<Strategy>) -> Vec<WorkItem> {
        let state = self.state.lock().unwrap();
        match strategy {
            Some(Strategy::Immediate) => state.immediate.iter().cloned().collect(),
            Some(Strategy::Batch) => state.batch.iter().cloned().collect(),
            Some(s @ (Strategy::Auto | Strategy::Park)) => {
                state.recorded.iter().filter(|i| i.strategy == s).cloned().collect()
            }
            None => state
                .immediate
                .iter()
                .chain(state.batch.iter())
                .chain(state.recorded.iter())
                .cloned()
                .collect(),
        }
    }
}

/// The engine's own queue depth, read synchronously via a blocking lock so
/// it can implement the non-async `QueueDepthSource` trait the `providers`
/// module exposes. Depth reads need not be linearizable with concurrent
/// `accept`/`next` calls (spec.md §5).
impl QueueDepthSource for WorkflowEngine {
    fn total_depth(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.immediate.len() + state.batch.len()
    }
}

/// Forwards the same operations to an external orchestrator. No concrete
/// third-party orchestrator is implemented here (out of scope); this just
/// demonstrates the seam.
#[async_trait]
pub trait OrchestratorAdapter: Send + Sync {
    async fn submit(&self, item: WorkItem) -> Result<()>;
    async fn queue_depth(&self, strategy: Option<Strategy>) -> usize;
    async fn pop(&self, strategy: Strategy) -> Option<WorkItem>;
    async fn ack(&self, task_id: &str) -> Result<()>;
    async fn list(&self, strategy: Option<Strategy>) -> Vec<WorkItem>;
}

/// Adapts any `OrchestratorAdapter` to the `Workflow` trait.
pub struct ExternalWorkflowEngine {
    adapter: Arc<dyn OrchestratorAdapter>,
}

impl ExternalWorkflowEngine {
    pub fn new(adapter: Arc<dyn OrchestratorAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Workflow for ExternalWorkflowEngine {
    async fn accept(&self, item: WorkItem) -> Result<()> {
        self.adapter.submit(item).await
    }

    async fn depth(&self, strategy: Option<Strategy>) -> usize {
        self.adapter.queue_depth(strategy).await
    }

    async fn next(&self, strategy: Strategy) -> Option<WorkItem> {
        self.adapter.pop(strategy).await
    }

    async fn complete(&self, task_id: &str) -> Result<()> {
        self.adapter.ack(task_id).await
    }

    async fn items(&self, strategy: Option<Strategy>) -> Vec<WorkItem> {
        self.adapter.list(strategy).await
    }
}

/// No-op adapter target, useful as a default when no orchestrator is wired
/// up; every operation is a well-defined no-op rather than an error.
pub struct NullWorkflowEngine;

#[async_trait]
impl OrchestratorAdapter for NullWorkflowEngine {
    async fn submit(&self, _item: WorkItem) -> Result<()> {
        Ok(())
    }

    async fn queue_depth(&self, _strategy: Option<Strategy>) -> usize {
        0
    }

    async fn pop(&self, _strategy: Strategy) -> Option<WorkItem> {
        None
    }

    async fn ack(&self, _task_id: &str) -> Result<()> {
        Ok(())
    }

    async fn list(&self, _strategy: Option<Strategy>) -> Vec<WorkItem> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rationale, SensitivityTag, TaskIntent};
    use chrono::Utc;

    fn item(task_id: &str, strategy: Strategy, priority: f64) -> WorkItem {
        WorkItem {
            task: TaskIntent {
                task_id: task_id.into(),
                severity: 3,
                slo_risk_minutes: 10.0,
                model_confidence: 0.9,
                explanation: "test".into(),
                sensitivity_tag: SensitivityTag::Standard,
                source: "test".into(),
                submitted_at: Utc::now(),
            },
            strategy,
            priority,
            attention_load: 0.1,
            queue_depth: 0,
            rationale: Rationale {
                slo_component: 0.0,
                slo_contribution: 0.0,
                uncertainty_contribution: 0.0,
                severity_contribution: 0.0,
                attention_contribution: 0.0,
                rule_fired: "test".into(),
            },
            decided_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn immediate_queue_pops_highest_priority_first() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Immediate, 0.6)).await.unwrap();
        engine.accept(item("b", Strategy::Immediate, 0.9)).await.unwrap();
        engine.accept(item("c", Strategy::Immediate, 0.75)).await.unwrap();

        let first = engine.next(Strategy::Immediate).await.unwrap();
        assert_eq!(first.task.task_id, "b");
        let second = engine.next(Strategy::Immediate).await.unwrap();
        assert_eq!(second.task.task_id, "c");
    }

    #[tokio::test]
    async fn batch_queue_is_strict_fifo() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Batch, 0.5)).await.unwrap();
        engine.accept(item("b", Strategy::Batch, 0.9)).await.unwrap();

        let first = engine.next(Strategy::Batch).await.unwrap();
        assert_eq!(first.task.task_id, "a");
    }

    #[tokio::test]
    async fn auto_and_park_items_are_recorded_not_enqueued() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Auto, 0.9)).await.unwrap();
        engine.accept(item("b", Strategy::Park, 0.1)).await.unwrap();

        assert_eq!(engine.depth(None).await, 0);
        assert_eq!(engine.recorded().await.len(), 2);
    }

    #[tokio::test]
    async fn accept_is_idempotent_on_task_id() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Batch, 0.5)).await.unwrap();
        engine.accept(item("a", Strategy::Batch, 0.5)).await.unwrap();
        assert_eq!(engine.depth(Some(Strategy::Batch)).await, 1);
    }

    #[tokio::test]
    async fn complete_removes_the_item() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Immediate, 0.9)).await.unwrap();
        engine.complete("a").await.unwrap();
        assert_eq!(engine.depth(Some(Strategy::Immediate)).await, 0);
    }

    #[tokio::test]
    async fn items_lists_a_queue_without_consuming_it() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Batch, 0.5)).await.unwrap();
        engine.accept(item("b", Strategy::Batch, 0.9)).await.unwrap();

        let listed = engine.items(Some(Strategy::Batch)).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].task.task_id, "a");
        assert_eq!(engine.depth(Some(Strategy::Batch)).await, 2);
    }

    #[tokio::test]
    async fn items_with_no_strategy_lists_everything_including_recorded() {
        let engine = WorkflowEngine::new();
        engine.accept(item("a", Strategy::Immediate, 0.9)).await.unwrap();
        engine.accept(item("b", Strategy::Batch, 0.5)).await.unwrap();
        engine.accept(item("c", Strategy::Auto, 0.9)).await.unwrap();

        let listed = engine.items(None).await;
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn enqueuing_raises_reported_queue_depth() {
        let engine = Arc::new(WorkflowEngine::new());
        let before = engine.total_depth();
        engine.accept(item("a", Strategy::Batch, 0.5)).await.unwrap();
        let after = engine.total_depth();
        assert!(after > before);
    }
}
