//! In-crate generator fakes for unit tests.
//!
//! Integration tests use `syllabus-test-utils` instead; these exist because
//! unit tests cannot depend on a crate that depends on this one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use syllabus_store::{LearningFormat, StageKind, UserInput};

use crate::generation::{GenerationError, GenerationRequest, Generator};
use crate::stage::StageContext;
use crate::workflow::WorkflowConfig;

type Respond = dyn Fn(&GenerationRequest) -> Result<serde_json::Value, GenerationError> + Send + Sync;

/// Generator driven by a closure.
pub struct FnGenerator {
    respond: Box<Respond>,
}

impl FnGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<serde_json::Value, GenerationError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            respond: Box::new(respond),
        }
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(GenerationError::Unavailable("test".to_string())))
    }
}

#[async_trait]
impl Generator for FnGenerator {
    fn name(&self) -> &str {
        "fn"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError> {
        (self.respond)(request)
    }
}

pub fn context(generator: FnGenerator) -> StageContext {
    StageContext {
        generator: Arc::new(generator),
        config: WorkflowConfig {
            call_timeout: Duration::from_secs(5),
            detail_concurrency: 2,
        },
    }
}

pub fn input(topic: &str, background: &str) -> UserInput {
    UserInput::new(topic, background, LearningFormat::Video, 1).unwrap()
}

/// A valid response for `stage`, as a well-behaved model would produce it.
pub fn canned(request: &GenerationRequest) -> serde_json::Value {
    match request.stage {
        StageKind::GapAnalysis => serde_json::json!({
            "current_level": "Knows C",
            "target_level": "Writes idiomatic Rust",
            "identified_gaps": ["ownership", "traits"],
            "gap_analysis": "Memory model differs."
        }),
        StageKind::TopicPlanning => serde_json::json!({
            "main_topics": ["Ownership", "Traits"],
            "subtopics": ["Borrowing", "Generics"],
            "learning_objectives": ["Explain moves", "Write a trait"],
            "estimated_duration": "3 weeks"
        }),
        StageKind::TopicDetail => {
            let name = request.inputs.get("topic_name").cloned().unwrap_or_default();
            serde_json::json!({
                "topic_name": name,
                "description": format!("All about {name}"),
                "resources": [format!("{name} chapter"), "The Book"],
                "exercises": ["Exercise"],
                "assessment_criteria": format!("Can use {name}")
            })
        }
        StageKind::PlanCombiner => serde_json::json!({
            "learning_path": "Ownership then Traits",
            "recommended_resources": ["The Book"],
            "timeline": "3 weeks",
            "success_metrics": ["Ships a crate"]
        }),
    }
}
