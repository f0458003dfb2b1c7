use async_trait::async_trait;

use syllabus_store::{KnowledgeGap, StageKind, UserInput};

use super::{Stage, StageContext};
use crate::generation::generate_record;
use crate::prompts;
use crate::workflow::{WorkflowError, WorkflowState};

/// Compares the learner's background with the topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapAnalysisStage;

#[async_trait]
impl Stage for GapAnalysisStage {
    fn kind(&self) -> StageKind {
        StageKind::GapAnalysis
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &StageContext) -> Result<(), WorkflowError> {
        let request = prompts::gap_analysis_request(state.user_input());
        let result = generate_record::<KnowledgeGap>(
            ctx.generator.as_ref(),
            &request,
            ctx.config.call_timeout,
        )
        .await;

        let gap = match result {
            Ok(gap) => gap,
            Err(e) => {
                tracing::warn!(stage = %self.kind(), error = %e, "gap analysis failed, using fallback");
                state.record_fallback(self.kind());
                fallback_knowledge_gap(state.user_input())
            }
        };

        tracing::debug!(gaps = gap.identified_gaps.len(), "knowledge gaps identified");
        state.set_knowledge_gap(gap)
    }
}

/// Deterministic stand-in used when the generator cannot answer.
pub fn fallback_knowledge_gap(input: &UserInput) -> KnowledgeGap {
    let current_level = if input.background.trim().is_empty() {
        "Beginner".to_string()
    } else {
        input.background.clone()
    };
    KnowledgeGap {
        current_level,
        target_level: format!("Intermediate in {}", input.topic),
        identified_gaps: vec![format!("Foundational understanding of {}", input.topic)],
        gap_analysis: format!(
            "A detailed assessment is not available. The learner should build a \
             working foundation in {} before moving on to applied material.",
            input.topic
        ),
    }
}
