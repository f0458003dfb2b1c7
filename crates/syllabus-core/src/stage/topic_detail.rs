use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use syllabus_store::{LearningFormat, StageKind, TopicDetail, TopicPlan, UserInput};

use super::{Stage, StageContext, missing};
use crate::generation::{GenerationError, GenerationRequest, generate_record};
use crate::prompts;
use crate::workflow::{WorkflowError, WorkflowState};

/// Expands every main topic into a detailed breakdown.
///
/// One generation call is made per topic. Calls run concurrently, bounded by
/// `detail_concurrency`, and are reassembled in topic order. A failure
/// affects only its own topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicDetailStage;

#[async_trait]
impl Stage for TopicDetailStage {
    fn kind(&self) -> StageKind {
        StageKind::TopicDetail
    }

    async fn run(&self, state: &mut WorkflowState, ctx: &StageContext) -> Result<(), WorkflowError> {
        let plan = state
            .topic_plan()
            .ok_or_else(|| missing(self.kind(), "a topic plan"))?;
        let input = state.user_input();
        let generator = ctx.generator.as_ref();
        let timeout = ctx.config.call_timeout;

        // Owned requests keep the fan-out future `Send`.
        let requests: Vec<(usize, GenerationRequest)> = plan
            .main_topics
            .iter()
            .enumerate()
            .map(|(index, topic)| {
                let objective = objective_for(plan, index);
                (index, prompts::topic_detail_request(input, topic, &objective))
            })
            .collect();

        let results: Vec<(usize, Result<TopicDetail, GenerationError>)> = stream::iter(requests)
            .map(|(index, request)| async move {
                let result = generate_record::<TopicDetail>(generator, &request, timeout).await;
                (index, result)
            })
            .buffer_unordered(ctx.config.detail_concurrency.max(1))
            .collect()
            .await;

        let mut slots: Vec<Option<TopicDetail>> = vec![None; plan.main_topics.len()];
        let mut fallbacks = 0usize;
        for (index, result) in results {
            let topic = &plan.main_topics[index];
            let detail = match result {
                Ok(mut detail) => {
                    if &detail.topic_name != topic {
                        tracing::debug!(
                            index,
                            requested = %topic,
                            returned = %detail.topic_name,
                            "normalizing topic name"
                        );
                        detail.topic_name = topic.clone();
                    }
                    detail
                }
                Err(e) => {
                    tracing::warn!(
                        stage = %self.kind(),
                        index,
                        topic = %topic,
                        error = %e,
                        "topic detail failed, using fallback"
                    );
                    fallbacks += 1;
                    fallback_topic_detail(input, topic, &objective_for(plan, index))
                }
            };
            slots[index] = Some(detail);
        }

        let details = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    WorkflowError::Invariant(format!("no topic detail produced for index {index}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(topics = details.len(), fallbacks, "topic details ready");
        if fallbacks > 0 {
            state.record_fallback(self.kind());
        }
        state.set_topic_details(details)
    }
}

/// The learning objective paired with `main_topics[index]`.
pub fn objective_for(plan: &TopicPlan, index: usize) -> String {
    match plan.learning_objectives.get(index) {
        Some(objective) if !objective.trim().is_empty() => objective.clone(),
        _ => format!(
            "Learn {}",
            plan.main_topics.get(index).map(String::as_str).unwrap_or("this topic")
        ),
    }
}

/// A format-aware breakdown for one topic, used when its call fails.
pub fn fallback_topic_detail(input: &UserInput, topic: &str, objective: &str) -> TopicDetail {
    let resources = match input.preferred_format {
        LearningFormat::Video => vec![
            format!("Video lecture series on {topic}"),
            "Recorded walkthroughs and demos".to_string(),
        ],
        LearningFormat::Text => vec![
            format!("Introductory book chapters on {topic}"),
            "Written tutorials".to_string(),
        ],
        LearningFormat::Audio => vec![
            format!("Podcast episodes covering {topic}"),
            "Recorded lectures".to_string(),
        ],
    };
    TopicDetail {
        topic_name: topic.to_string(),
        description: format!("Comprehensive coverage of {topic}. Objective: {objective}"),
        resources: resources
            .into_iter()
            .chain(std::iter::once("Official documentation".to_string()))
            .collect(),
        exercises: vec![
            "Short self-check questions".to_string(),
            format!("A small practical project using {topic}"),
        ],
        assessment_criteria: format!(
            "Demonstrate understanding of {topic} through practical application"
        ),
    }
}
