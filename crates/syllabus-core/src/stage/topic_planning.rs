use async_trait::async_trait;

use syllabus_store::{StageKind, TopicPlan, UserInput};

use super::{Stage, StageContext, missing};
use crate::generation::generate_record;
use crate::prompts;
use crate::workflow::{WorkflowError, WorkflowState};

const FALLBACK_DURATION: &str = "4-6 weeks";

/// Turns the knowledge gaps into an ordered curriculum.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicPlanningStage;

#[async_trait]
impl Stage for TopicPlanningStage {
    fn kind(&self) -> StageKind {
        StageKind::TopicPlanning
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &StageContext) -> Result<(), WorkflowError> {
        let gap = state
            .knowledge_gap()
            .ok_or_else(|| missing(self.kind(), "a knowledge gap"))?;
        let request = prompts::topic_planning_request(state.user_input(), gap);

        let result =
            generate_record::<TopicPlan>(ctx.generator.as_ref(), &request, ctx.config.call_timeout)
                .await;

        let plan = match result {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(stage = %self.kind(), error = %e, "topic planning failed, using fallback");
                state.record_fallback(self.kind());
                fallback_topic_plan(state.user_input())
            }
        };

        tracing::info!(
            topics = plan.main_topics.len(),
            duration = %plan.estimated_duration,
            "topic plan ready"
        );
        state.set_topic_plan(plan)
    }
}

/// A three-topic curriculum derived from the topic string.
pub fn fallback_topic_plan(input: &UserInput) -> TopicPlan {
    let topic = &input.topic;
    TopicPlan {
        main_topics: vec![
            format!("Introduction to {topic}"),
            format!("Core Concepts of {topic}"),
            format!("Applied {topic}"),
        ],
        subtopics: vec![
            "Terminology and first steps".to_string(),
            "Key techniques and patterns".to_string(),
            "Practice projects".to_string(),
        ],
        learning_objectives: vec![
            format!("Understand the basics of {topic}"),
            format!("Master the core concepts of {topic}"),
            format!("Apply {topic} to a practical project"),
        ],
        estimated_duration: FALLBACK_DURATION.to_string(),
    }
}
