//! Shared test utilities for syllabus integration tests.
//!
//! Provides scriptable [`Generator`] fakes and request fixtures so tests can
//! drive every workflow path without a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use syllabus_core::generation::{GenerationError, GenerationRequest, Generator};
use syllabus_store::{LearningFormat, PlanRequest, StageKind, UserInput};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// "Python Programming" for a complete beginner, in video format.
pub fn python_beginner_input() -> UserInput {
    UserInput::new(
        "Python Programming",
        "Complete beginner",
        LearningFormat::Video,
        1,
    )
    .expect("fixture input is valid")
}

pub fn python_beginner_request() -> PlanRequest {
    PlanRequest::new("Python Programming", "Complete beginner", "video")
}

/// A valid request for `topic` with a generic background.
pub fn request_for(topic: &str) -> PlanRequest {
    PlanRequest::new(topic, "Some programming experience", "text")
}

/// Topics the default scripted topic plan returns.
pub const DEFAULT_TOPICS: [&str; 3] = ["Foundations", "Techniques", "Projects"];

/// A well-formed response for `stage`.
///
/// Topic detail responses echo the requested topic name.
pub fn healthy_response(request: &GenerationRequest) -> Value {
    match request.stage {
        StageKind::GapAnalysis => json!({
            "current_level": "Has written small scripts",
            "target_level": "Builds real projects",
            "identified_gaps": ["data structures", "testing"],
            "gap_analysis": "Knows syntax but not structure."
        }),
        StageKind::TopicPlanning => topic_plan_json(&DEFAULT_TOPICS),
        StageKind::TopicDetail => {
            let name = request.inputs.get("topic_name").cloned().unwrap_or_default();
            topic_detail_json(&name)
        }
        StageKind::PlanCombiner => json!({
            "learning_path": "Foundations, then Techniques, then Projects",
            "recommended_resources": ["Official tutorial", "Practice site"],
            "timeline": "6 weeks",
            "success_metrics": ["Completes a project", "Passes all quizzes"]
        }),
    }
}

/// A topic plan response listing `topics` with one objective each.
pub fn topic_plan_json(topics: &[&str]) -> Value {
    let objectives: Vec<String> = topics.iter().map(|t| format!("Understand {t}")).collect();
    json!({
        "main_topics": topics,
        "subtopics": topics.iter().map(|t| format!("{t} basics")).collect::<Vec<_>>(),
        "learning_objectives": objectives,
        "estimated_duration": "6 weeks"
    })
}

pub fn topic_detail_json(topic_name: &str) -> Value {
    json!({
        "topic_name": topic_name,
        "description": format!("Generated description of {topic_name}"),
        "resources": [format!("{topic_name} guide")],
        "exercises": [format!("{topic_name} drill")],
        "assessment_criteria": format!("Can explain {topic_name}")
    })
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

type Scripted = Result<Value, GenerationError>;

/// A generator with per-stage (and per-topic) canned responses.
///
/// Anything not scripted gets [`healthy_response`]. Calls can be delayed to
/// force out-of-order completion, and every call is counted.
#[derive(Default)]
pub struct ScriptedGenerator {
    stages: HashMap<StageKind, Scripted>,
    topics: HashMap<String, Scripted>,
    delay: Option<Duration>,
    topic_delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<StageKind, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    /// Every call succeeds with [`healthy_response`].
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Answer every call for `stage` with `value`.
    pub fn respond(mut self, stage: StageKind, value: Value) -> Self {
        self.stages.insert(stage, Ok(value));
        self
    }

    /// Fail every call for `stage`.
    pub fn fail(mut self, stage: StageKind, error: GenerationError) -> Self {
        self.stages.insert(stage, Err(error));
        self
    }

    /// Answer the topic-detail call for `topic` with `value`.
    pub fn respond_topic(mut self, topic: &str, value: Value) -> Self {
        self.topics.insert(topic.to_string(), Ok(value));
        self
    }

    /// Fail the topic-detail call for `topic` only.
    pub fn fail_topic(mut self, topic: &str, error: GenerationError) -> Self {
        self.topics.insert(topic.to_string(), Err(error));
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep before answering the topic-detail call for `topic`.
    pub fn with_topic_delay(mut self, topic: &str, delay: Duration) -> Self {
        self.topic_delays.insert(topic.to_string(), delay);
        self
    }

    /// Calls made for `stage` so far.
    pub fn calls(&self, stage: StageKind) -> usize {
        self.calls
            .lock()
            .expect("call counter poisoned")
            .get(&stage)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("call counter poisoned").values().sum()
    }

    /// Highest number of calls observed in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn scripted(&self, request: &GenerationRequest) -> Scripted {
        if request.stage == StageKind::TopicDetail {
            if let Some(scripted) = request
                .inputs
                .get("topic_name")
                .and_then(|name| self.topics.get(name))
            {
                return scripted.clone();
            }
        }
        match self.stages.get(&request.stage) {
            Some(scripted) => scripted.clone(),
            None => Ok(healthy_response(request)),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        *self
            .calls
            .lock()
            .expect("call counter poisoned")
            .entry(request.stage)
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let topic_delay = request
            .inputs
            .get("topic_name")
            .and_then(|name| self.topic_delays.get(name))
            .copied();
        if let Some(delay) = topic_delay.or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.scripted(request)
    }
}

// ---------------------------------------------------------------------------
// FailingGenerator / HangingGenerator
// ---------------------------------------------------------------------------

/// Fails every call with [`GenerationError::Unavailable`].
#[derive(Default)]
pub struct FailingGenerator {
    calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Value, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerationError::Unavailable("scripted failure".to_string()))
    }
}

/// Never answers; every call runs until the caller's timeout.
#[derive(Debug, Default)]
pub struct HangingGenerator;

#[async_trait]
impl Generator for HangingGenerator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Value, GenerationError> {
        std::future::pending().await
    }
}
