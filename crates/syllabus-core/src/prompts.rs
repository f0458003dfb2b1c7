//! Prompt templates and output shapes for the four workflow stages.
//!
//! Pure logic: each `*_request` function binds a stage's inputs to its
//! template. No I/O happens here.

use syllabus_store::{KnowledgeGap, StageKind, TopicDetail, TopicPlan, UserInput};

use crate::generation::{GenerationRequest, OutputShape, PromptTemplate};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub const GAP_ANALYSIS_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "gap_analysis",
    text: r#"# Knowledge Gap Analysis

Compare what the learner already knows with what the topic demands and list the gaps.

- Topic to learn: {topic}
- Current background: {background}
- Preferred learning format: {preferred_format}

Be specific and actionable. Take the preferred format into account."#,
};

pub const TOPIC_PLANNING_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "topic_planning",
    text: r#"# Topic Plan

Design an ordered curriculum that closes the identified knowledge gaps.

- Topic: {topic}
- Knowledge gaps: {gaps}
- Current level: {current_level}
- Target level: {target_level}
- Preferred format: {preferred_format}

Order main topics from foundational to advanced. Every gap must be addressed by at least one topic."#,
};

pub const TOPIC_DETAIL_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "topic_detail",
    text: r#"# Topic Breakdown

Describe one topic of a learning plan in depth.

- Topic name: {topic_name}
- Part of: {topic}
- Learning objective: {objective}
- Preferred format: {preferred_format}
- Learner background: {background}

Resources must suit the preferred format. Exercises must suit the learner's background.
Use the topic name exactly as given."#,
};

pub const PLAN_COMBINER_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "plan_combiner",
    text: r#"# Learning Plan Synthesis

Combine the analysis, the curriculum and the topic breakdowns into one coherent plan.

- Learner request: {user_input}
- Knowledge gaps: {gaps}
- Topic plan: {plan}
- Topic details: {details}

The learning path must follow the topic order. Success metrics must be measurable."#,
};

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

pub const KNOWLEDGE_GAP_SHAPE: OutputShape = OutputShape {
    name: "KnowledgeGap",
    fields: &["current_level", "target_level", "identified_gaps", "gap_analysis"],
    example: r#"{
  "current_level": "assessment of the learner's current knowledge",
  "target_level": "the level the learner needs to reach",
  "identified_gaps": ["gap 1", "gap 2", "gap 3"],
  "gap_analysis": "why these gaps exist and how they relate"
}"#,
};

pub const TOPIC_PLAN_SHAPE: OutputShape = OutputShape {
    name: "TopicPlan",
    fields: &[
        "main_topics",
        "subtopics",
        "learning_objectives",
        "estimated_duration",
    ],
    example: r#"{
  "main_topics": ["topic 1", "topic 2", "topic 3"],
  "subtopics": ["subtopic 1", "subtopic 2", "subtopic 3"],
  "learning_objectives": ["objective for topic 1", "objective for topic 2", "objective for topic 3"],
  "estimated_duration": "estimated time to complete"
}"#,
};

pub const TOPIC_DETAIL_SHAPE: OutputShape = OutputShape {
    name: "TopicDetail",
    fields: &[
        "topic_name",
        "description",
        "resources",
        "exercises",
        "assessment_criteria",
    ],
    example: r#"{
  "topic_name": "the exact topic name",
  "description": "what this topic covers",
  "resources": ["resource 1", "resource 2", "resource 3"],
  "exercises": ["exercise 1", "exercise 2", "exercise 3"],
  "assessment_criteria": "how to check understanding of this topic"
}"#,
};

pub const PLAN_SYNTHESIS_SHAPE: OutputShape = OutputShape {
    name: "PlanSynthesis",
    fields: &[
        "learning_path",
        "recommended_resources",
        "timeline",
        "success_metrics",
    ],
    example: r#"{
  "learning_path": "step-by-step progression through the topics",
  "recommended_resources": ["overall resource 1", "overall resource 2"],
  "timeline": "suggested schedule for completion",
  "success_metrics": ["metric 1", "metric 2", "metric 3"]
}"#,
};

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

pub fn gap_analysis_request(input: &UserInput) -> GenerationRequest {
    GenerationRequest::new(
        StageKind::GapAnalysis,
        GAP_ANALYSIS_TEMPLATE,
        KNOWLEDGE_GAP_SHAPE,
    )
    .with_input("topic", &input.topic)
    .with_input("background", &input.background)
    .with_input("preferred_format", input.preferred_format.to_string())
}

pub fn topic_planning_request(input: &UserInput, gap: &KnowledgeGap) -> GenerationRequest {
    GenerationRequest::new(
        StageKind::TopicPlanning,
        TOPIC_PLANNING_TEMPLATE,
        TOPIC_PLAN_SHAPE,
    )
    .with_input("topic", &input.topic)
    .with_input("gaps", gap.identified_gaps.join("; "))
    .with_input("current_level", &gap.current_level)
    .with_input("target_level", &gap.target_level)
    .with_input("preferred_format", input.preferred_format.to_string())
}

pub fn topic_detail_request(
    input: &UserInput,
    topic_name: &str,
    objective: &str,
) -> GenerationRequest {
    GenerationRequest::new(
        StageKind::TopicDetail,
        TOPIC_DETAIL_TEMPLATE,
        TOPIC_DETAIL_SHAPE,
    )
    .with_input("topic_name", topic_name)
    .with_input("topic", &input.topic)
    .with_input("objective", objective)
    .with_input("preferred_format", input.preferred_format.to_string())
    .with_input("background", &input.background)
}

/// Earlier records are passed to the combiner as compact JSON.
pub fn plan_combiner_request(
    input: &UserInput,
    gap: &KnowledgeGap,
    plan: &TopicPlan,
    details: &[TopicDetail],
) -> GenerationRequest {
    GenerationRequest::new(
        StageKind::PlanCombiner,
        PLAN_COMBINER_TEMPLATE,
        PLAN_SYNTHESIS_SHAPE,
    )
    .with_input("user_input", to_json(input))
    .with_input("gaps", to_json(gap))
    .with_input("plan", to_json(plan))
    .with_input("details", to_json(details))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    // Plain data records always serialize.
    serde_json::to_string(value).unwrap_or_default()
}
