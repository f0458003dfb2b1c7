//! The mutable container threaded through the four stages of one plan.

use thiserror::Error;

use syllabus_store::{
    KnowledgeGap, LearningPlan, StageKind, TopicDetail, TopicPlan, UserInput, ValidationError,
};

/// Errors that stop a single plan's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A structural invariant was violated. This indicates a defect in the
    /// stage or fallback logic, never a generation failure.
    #[error("workflow invariant violated: {0}")]
    Invariant(String),

    #[error("workflow cancelled before {before}")]
    Cancelled { before: StageKind },
}

/// Single-owner state for one workflow execution.
///
/// Fields can only be populated in stage order; each setter rejects an
/// out-of-order or repeated write with [`WorkflowError::Invariant`].
#[derive(Debug, Clone)]
pub struct WorkflowState {
    user_input: UserInput,
    knowledge_gap: Option<KnowledgeGap>,
    topic_plan: Option<TopicPlan>,
    topic_details: Option<Vec<TopicDetail>>,
    learning_plan: Option<LearningPlan>,
    fallbacks: Vec<StageKind>,
}

/// A finished workflow: the plan plus the stages that fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRun {
    pub plan: LearningPlan,
    pub fallbacks: Vec<StageKind>,
}

impl PlanRun {
    /// `true` if any stage used its fallback output.
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

fn invariant(msg: impl Into<String>) -> WorkflowError {
    WorkflowError::Invariant(msg.into())
}

impl WorkflowState {
    pub fn new(user_input: UserInput) -> Self {
        Self {
            user_input,
            knowledge_gap: None,
            topic_plan: None,
            topic_details: None,
            learning_plan: None,
            fallbacks: Vec::new(),
        }
    }

    pub fn user_input(&self) -> &UserInput {
        &self.user_input
    }

    pub fn knowledge_gap(&self) -> Option<&KnowledgeGap> {
        self.knowledge_gap.as_ref()
    }

    pub fn topic_plan(&self) -> Option<&TopicPlan> {
        self.topic_plan.as_ref()
    }

    pub fn topic_details(&self) -> Option<&[TopicDetail]> {
        self.topic_details.as_deref()
    }

    pub fn learning_plan(&self) -> Option<&LearningPlan> {
        self.learning_plan.as_ref()
    }

    pub fn fallbacks(&self) -> &[StageKind] {
        &self.fallbacks
    }

    /// The next stage to run, or `None` once the plan is assembled.
    pub fn next_stage(&self) -> Option<StageKind> {
        if self.knowledge_gap.is_none() {
            Some(StageKind::GapAnalysis)
        } else if self.topic_plan.is_none() {
            Some(StageKind::TopicPlanning)
        } else if self.topic_details.is_none() {
            Some(StageKind::TopicDetail)
        } else if self.learning_plan.is_none() {
            Some(StageKind::PlanCombiner)
        } else {
            None
        }
    }

    fn expect_next(&self, stage: StageKind) -> Result<(), WorkflowError> {
        match self.next_stage() {
            Some(next) if next == stage => Ok(()),
            Some(next) => Err(invariant(format!(
                "cannot record {stage} output while {next} is pending"
            ))),
            None => Err(invariant(format!(
                "cannot record {stage} output on a finished plan"
            ))),
        }
    }

    pub fn set_knowledge_gap(&mut self, gap: KnowledgeGap) -> Result<(), WorkflowError> {
        self.expect_next(StageKind::GapAnalysis)?;
        self.knowledge_gap = Some(gap);
        Ok(())
    }

    pub fn set_topic_plan(&mut self, plan: TopicPlan) -> Result<(), WorkflowError> {
        self.expect_next(StageKind::TopicPlanning)?;
        if plan.main_topics.is_empty() {
            return Err(invariant("topic plan has no main topics"));
        }
        self.topic_plan = Some(plan);
        Ok(())
    }

    /// Details must match `main_topics` one-to-one, in order.
    pub fn set_topic_details(&mut self, details: Vec<TopicDetail>) -> Result<(), WorkflowError> {
        self.expect_next(StageKind::TopicDetail)?;
        let topics = self
            .topic_plan
            .as_ref()
            .map(|p| p.main_topics.as_slice())
            .unwrap_or_default();
        if details.len() != topics.len() {
            return Err(invariant(format!(
                "{} topic details for {} main topics",
                details.len(),
                topics.len()
            )));
        }
        if let Some(i) = details
            .iter()
            .zip(topics)
            .position(|(d, t)| &d.topic_name != t)
        {
            return Err(invariant(format!(
                "topic detail {i} ({:?}) does not match main topic {:?}",
                details[i].topic_name, topics[i]
            )));
        }
        self.topic_details = Some(details);
        Ok(())
    }

    pub fn set_learning_plan(&mut self, plan: LearningPlan) -> Result<(), WorkflowError> {
        self.expect_next(StageKind::PlanCombiner)?;
        self.learning_plan = Some(plan);
        Ok(())
    }

    /// Note that `stage` served its fallback output.
    pub fn record_fallback(&mut self, stage: StageKind) {
        if !self.fallbacks.contains(&stage) {
            self.fallbacks.push(stage);
        }
    }

    /// Consume the state, returning the finished plan after a final
    /// consistency check.
    pub fn finish(self) -> Result<PlanRun, WorkflowError> {
        let plan = self
            .learning_plan
            .ok_or_else(|| invariant("workflow finished without a learning plan"))?;
        plan.check_consistency().map_err(WorkflowError::Invariant)?;
        Ok(PlanRun {
            plan,
            fallbacks: self.fallbacks,
        })
    }
}
