//! The workflow engine: runs the four stages of one plan in order.
//!
//! ```text
//! UserInput -> GapAnalysis -> TopicPlanning -> TopicDetail -> PlanCombiner -> LearningPlan
//! ```
//!
//! There is no branching and no iteration. Cancellation is observed between
//! stages only.

pub mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use syllabus_store::{LearningPlan, PlanRequest, UserInput};

use crate::generation::Generator;
use crate::stage::{self, StageContext};

pub use state::{PlanRun, WorkflowError, WorkflowState};

/// Tuning knobs for a single workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Upper bound on any one generation call.
    pub call_timeout: Duration,
    /// Maximum topic-detail calls in flight for one plan.
    pub detail_concurrency: usize,
}

impl WorkflowConfig {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_DETAIL_CONCURRENCY: usize = 4;
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
            detail_concurrency: Self::DEFAULT_DETAIL_CONCURRENCY,
        }
    }
}

/// Stateless between invocations; cloning shares the generator.
#[derive(Clone)]
pub struct WorkflowEngine {
    ctx: StageContext,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine").field("ctx", &self.ctx).finish()
    }
}

impl WorkflowEngine {
    pub fn new(generator: Arc<dyn Generator>, config: WorkflowConfig) -> Self {
        Self {
            ctx: StageContext { generator, config },
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.ctx.config
    }

    /// Name of the underlying generation provider.
    pub fn generator_name(&self) -> &str {
        self.ctx.generator.name()
    }

    /// Run the workflow to completion and return the plan.
    pub async fn create_plan(&self, input: UserInput) -> Result<LearningPlan, WorkflowError> {
        self.run(input, CancellationToken::new())
            .await
            .map(|run| run.plan)
    }

    /// Validate a raw request, then run it.
    pub async fn run_request(
        &self,
        request: &PlanRequest,
        cancel: CancellationToken,
    ) -> Result<PlanRun, WorkflowError> {
        let input = request.validate()?;
        self.run(input, cancel).await
    }

    /// Run all four stages, reporting which ones fell back.
    ///
    /// `cancel` is checked before each stage; a stage already in progress
    /// always finishes.
    pub async fn run(
        &self,
        input: UserInput,
        cancel: CancellationToken,
    ) -> Result<PlanRun, WorkflowError> {
        tracing::info!(
            topic = %input.topic,
            format = %input.preferred_format,
            generator = self.generator_name(),
            "starting learning plan workflow"
        );
        if input.max_iterations > 1 {
            tracing::debug!(
                max_iterations = input.max_iterations,
                "multiple iterations requested; running a single pass"
            );
        }

        let started = Instant::now();
        let mut state = WorkflowState::new(input);

        for stage in stage::pipeline() {
            let kind = stage.kind();
            if cancel.is_cancelled() {
                tracing::info!(stage = %kind, "workflow cancelled");
                return Err(WorkflowError::Cancelled { before: kind });
            }

            let stage_started = Instant::now();
            tracing::info!(stage = %kind, "stage started");
            stage.run(&mut state, &self.ctx).await?;
            tracing::info!(
                stage = %kind,
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "stage finished"
            );
        }

        let run = state.finish()?;
        tracing::info!(
            topics = run.plan.topic_plan.main_topics.len(),
            degraded = run.is_degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "learning plan complete"
        );
        Ok(run)
    }
}
