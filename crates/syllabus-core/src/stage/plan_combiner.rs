use async_trait::async_trait;

use syllabus_store::{LearningPlan, PlanSynthesis, StageKind, TopicDetail, TopicPlan};

use super::{Stage, StageContext, missing};
use crate::generation::generate_record;
use crate::prompts;
use crate::workflow::{WorkflowError, WorkflowState};

const DEFAULT_RESOURCES: [&str; 3] = [
    "Online courses and tutorials",
    "Practice platforms and exercises",
    "Community forums and study groups",
];

/// Merges every earlier record into the final [`LearningPlan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanCombinerStage;

#[async_trait]
impl Stage for PlanCombinerStage {
    fn kind(&self) -> StageKind {
        StageKind::PlanCombiner
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &StageContext) -> Result<(), WorkflowError> {
        let gap = state
            .knowledge_gap()
            .ok_or_else(|| missing(self.kind(), "a knowledge gap"))?;
        let plan = state
            .topic_plan()
            .ok_or_else(|| missing(self.kind(), "a topic plan"))?;
        let details = state
            .topic_details()
            .ok_or_else(|| missing(self.kind(), "topic details"))?;

        let request = prompts::plan_combiner_request(state.user_input(), gap, plan, details);
        let result =
            generate_record::<PlanSynthesis>(ctx.generator.as_ref(), &request, ctx.config.call_timeout)
                .await;

        let (synthesis, fell_back) = match result {
            Ok(synthesis) => (synthesis, false),
            Err(e) => {
                tracing::warn!(stage = %self.kind(), error = %e, "plan combiner failed, using fallback");
                (fallback_synthesis(plan, details), true)
            }
        };

        let learning_plan = LearningPlan::assemble(
            state.user_input().clone(),
            gap.clone(),
            plan.clone(),
            details.to_vec(),
            synthesis,
        );
        if fell_back {
            state.record_fallback(self.kind());
        }
        state.set_learning_plan(learning_plan)
    }
}

/// Build the synthesis from known fields alone.
///
/// Every list in the result is non-empty.
pub fn fallback_synthesis(plan: &TopicPlan, details: &[TopicDetail]) -> PlanSynthesis {
    let steps: Vec<String> = details
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. {}", i + 1, d.topic_name))
        .collect();
    let learning_path = if steps.is_empty() {
        "Work through the main topics in order, practicing after each one.".to_string()
    } else {
        format!(
            "Work through the topics in order: {}. Complete the exercises for each topic before moving on.",
            steps.join(", ")
        )
    };

    let mut recommended_resources: Vec<String> = Vec::new();
    for resource in details.iter().flat_map(|d| &d.resources) {
        if !resource.trim().is_empty() && !recommended_resources.contains(resource) {
            recommended_resources.push(resource.clone());
        }
    }
    if recommended_resources.is_empty() {
        recommended_resources = DEFAULT_RESOURCES.iter().map(|r| r.to_string()).collect();
    }

    let duration = if plan.estimated_duration.trim().is_empty() {
        "4-6 weeks"
    } else {
        plan.estimated_duration.as_str()
    };
    let timeline = format!("{duration} across {} topics", plan.main_topics.len());

    let mut success_metrics: Vec<String> = details
        .iter()
        .filter(|d| !d.assessment_criteria.trim().is_empty())
        .map(|d| format!("{}: {}", d.topic_name, d.assessment_criteria))
        .collect();
    success_metrics.extend(
        plan.learning_objectives
            .iter()
            .filter(|o| !o.trim().is_empty())
            .cloned(),
    );
    if success_metrics.is_empty() {
        success_metrics = vec![
            "Complete all exercises".to_string(),
            "Build a small project using what was learned".to_string(),
        ];
    }

    PlanSynthesis {
        learning_path,
        recommended_resources,
        timeline,
        success_metrics,
    }
}
