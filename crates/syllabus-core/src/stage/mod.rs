//! Stage executors.
//!
//! Each stage reads the fields its predecessors filled in, makes its
//! generation call(s) and writes exactly one new field into the
//! [`WorkflowState`]. A failed call never aborts the workflow: the stage
//! substitutes a deterministic fallback record and notes it in the state.

pub mod gap_analysis;
pub mod plan_combiner;
pub mod topic_detail;
pub mod topic_planning;

use std::sync::Arc;

use async_trait::async_trait;

use syllabus_store::StageKind;

use crate::generation::Generator;
use crate::workflow::{WorkflowConfig, WorkflowError, WorkflowState};

pub use gap_analysis::{GapAnalysisStage, fallback_knowledge_gap};
pub use plan_combiner::{PlanCombinerStage, fallback_synthesis};
pub use topic_detail::{TopicDetailStage, fallback_topic_detail, objective_for};
pub use topic_planning::{TopicPlanningStage, fallback_topic_plan};

/// Shared, read-only inputs available to every stage.
#[derive(Clone)]
pub struct StageContext {
    pub generator: Arc<dyn Generator>,
    pub config: WorkflowConfig,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

/// One step of the plan workflow.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Add this stage's field to `state`.
    ///
    /// Generation failures are recovered internally; an `Err` means the
    /// state was not in the shape this stage requires.
    async fn run(&self, state: &mut WorkflowState, ctx: &StageContext) -> Result<(), WorkflowError>;
}

// Compile-time assertion: Stage must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Stage) {}
};

/// The four stages in execution order.
pub fn pipeline() -> [&'static dyn Stage; 4] {
    [
        &GapAnalysisStage,
        &TopicPlanningStage,
        &TopicDetailStage,
        &PlanCombinerStage,
    ]
}

pub(crate) fn missing(stage: StageKind, field: &str) -> WorkflowError {
    WorkflowError::Invariant(format!("{stage} requires {field}, which is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_runs_stages_in_order() {
        let kinds: Vec<StageKind> = pipeline().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, StageKind::ALL);
    }
}
