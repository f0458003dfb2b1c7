use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The format a learner prefers to consume material in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningFormat {
    Video,
    Text,
    Audio,
}

impl fmt::Display for LearningFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Text => "text",
            Self::Audio => "audio",
        };
        f.write_str(s)
    }
}

impl FromStr for LearningFormat {
    type Err = FormatParseError;

    /// Parsing is case-insensitive and ignores surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "text" => Ok(Self::Text),
            "audio" => Ok(Self::Audio),
            _ => Err(FormatParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`LearningFormat`] string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatParseError(pub String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid learning format: {:?} (expected video, text, or audio)",
            self.0
        )
    }
}

impl std::error::Error for FormatParseError {}

// ---------------------------------------------------------------------------

/// One of the four ordered steps of the plan workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    GapAnalysis,
    TopicPlanning,
    TopicDetail,
    PlanCombiner,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 4] = [
        Self::GapAnalysis,
        Self::TopicPlanning,
        Self::TopicDetail,
        Self::PlanCombiner,
    ];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GapAnalysis => "gap_analysis",
            Self::TopicPlanning => "topic_planning",
            Self::TopicDetail => "topic_detail",
            Self::PlanCombiner => "plan_combiner",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Stage records
// ---------------------------------------------------------------------------

/// Validated learner request. Build one with [`crate::PlanRequest::validate`]
/// or [`UserInput::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub topic: String,
    pub background: String,
    pub preferred_format: LearningFormat,
    /// Accepted and carried, but the workflow always runs a single pass.
    pub max_iterations: u32,
}

/// Assessment of where the learner stands relative to the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGap {
    pub current_level: String,
    pub target_level: String,
    pub identified_gaps: Vec<String>,
    pub gap_analysis: String,
}

/// Ordered outline of what to study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPlan {
    pub main_topics: Vec<String>,
    pub subtopics: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub estimated_duration: String,
}

/// Breakdown of a single entry of [`TopicPlan::main_topics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetail {
    pub topic_name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub exercises: Vec<String>,
    pub assessment_criteria: String,
}

/// The combiner's own contribution to the final plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSynthesis {
    pub learning_path: String,
    pub recommended_resources: Vec<String>,
    pub timeline: String,
    pub success_metrics: Vec<String>,
}

/// The terminal artifact of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPlan {
    pub user_input: UserInput,
    pub knowledge_gap: KnowledgeGap,
    pub topic_plan: TopicPlan,
    pub topic_details: Vec<TopicDetail>,
    pub learning_path: String,
    pub recommended_resources: Vec<String>,
    pub timeline: String,
    pub success_metrics: Vec<String>,
}

impl LearningPlan {
    /// Assemble the final plan from the earlier stage records and the
    /// combiner's synthesis.
    pub fn assemble(
        user_input: UserInput,
        knowledge_gap: KnowledgeGap,
        topic_plan: TopicPlan,
        topic_details: Vec<TopicDetail>,
        synthesis: PlanSynthesis,
    ) -> Self {
        Self {
            user_input,
            knowledge_gap,
            topic_plan,
            topic_details,
            learning_path: synthesis.learning_path,
            recommended_resources: synthesis.recommended_resources,
            timeline: synthesis.timeline,
            success_metrics: synthesis.success_metrics,
        }
    }

    /// Verify the structural invariants of a finished plan.
    ///
    /// Returns a description of the first violation found.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.topic_plan.main_topics.is_empty() {
            return Err("topic plan has no main topics".to_string());
        }
        if self.topic_details.len() != self.topic_plan.main_topics.len() {
            return Err(format!(
                "{} topic details for {} main topics",
                self.topic_details.len(),
                self.topic_plan.main_topics.len()
            ));
        }
        for (i, (detail, topic)) in self
            .topic_details
            .iter()
            .zip(&self.topic_plan.main_topics)
            .enumerate()
        {
            if &detail.topic_name != topic {
                return Err(format!(
                    "topic detail {i} is {:?}, expected {topic:?}",
                    detail.topic_name
                ));
            }
        }
        if self.success_metrics.is_empty() {
            return Err("plan has no success metrics".to_string());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry records
// ---------------------------------------------------------------------------

/// Caller-supplied and workflow-derived metadata kept next to a stored plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// Stages whose generation call failed and that used their fallback.
    #[serde(default)]
    pub fallbacks: Vec<StageKind>,
}

/// A plan as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlan {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plan: LearningPlan,
    pub metadata: RequestMetadata,
}

impl StoredPlan {
    /// `true` if any stage of this plan fell back to its default output.
    pub fn is_degraded(&self) -> bool {
        !self.metadata.fallbacks.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            request_id: self.request_id,
            created_at: self.created_at,
            topic: self.plan.user_input.topic.clone(),
            preferred_format: self.plan.user_input.preferred_format,
            main_topic_count: self.plan.topic_plan.main_topics.len(),
            degraded: self.is_degraded(),
        }
    }
}

/// Row returned by registry listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub topic: String,
    pub preferred_format: LearningFormat,
    pub main_topic_count: usize,
    pub degraded: bool,
}
