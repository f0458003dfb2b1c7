//! Turning raw generator output into validated stage records.

use std::time::Duration;

use serde::de::DeserializeOwned;

use syllabus_store::{KnowledgeGap, PlanSynthesis, TopicDetail, TopicPlan};

use super::trait_def::{GenerationError, Generator};
use super::types::GenerationRequest;

/// Structural checks applied to a record after deserialization.
pub trait Validate {
    /// Return a description of the first problem found.
    fn validate(&self) -> Result<(), String>;
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is empty"));
    }
    Ok(())
}

fn require_entries(field: &str, values: &[String]) -> Result<(), String> {
    if values.is_empty() {
        return Err(format!("{field} has no entries"));
    }
    if let Some(i) = values.iter().position(|v| v.trim().is_empty()) {
        return Err(format!("{field}[{i}] is empty"));
    }
    Ok(())
}

impl Validate for KnowledgeGap {
    fn validate(&self) -> Result<(), String> {
        require_text("current_level", &self.current_level)?;
        require_text("target_level", &self.target_level)?;
        require_text("gap_analysis", &self.gap_analysis)
    }
}

impl Validate for TopicPlan {
    fn validate(&self) -> Result<(), String> {
        require_entries("main_topics", &self.main_topics)?;
        require_text("estimated_duration", &self.estimated_duration)
    }
}

impl Validate for TopicDetail {
    fn validate(&self) -> Result<(), String> {
        require_text("description", &self.description)?;
        require_text("assessment_criteria", &self.assessment_criteria)
    }
}

impl Validate for PlanSynthesis {
    fn validate(&self) -> Result<(), String> {
        require_text("learning_path", &self.learning_path)?;
        require_text("timeline", &self.timeline)?;
        require_entries("success_metrics", &self.success_metrics)
    }
}

/// Pull the outermost JSON object out of free-form model output.
///
/// Models often wrap JSON in prose or Markdown code fences; everything
/// outside the first `{` and the last `}` is dropped.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse model output text into a JSON object.
pub fn parse_object(text: &str) -> Result<serde_json::Value, GenerationError> {
    let json = extract_json(text)
        .ok_or_else(|| GenerationError::Malformed("output did not contain JSON".to_string()))?;
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(GenerationError::Malformed(
            "output is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Check that `value` carries every top-level key `request.shape` lists.
pub fn check_fields(
    value: &serde_json::Value,
    request: &GenerationRequest,
) -> Result<(), GenerationError> {
    let shape = &request.shape;
    let object = value
        .as_object()
        .ok_or_else(|| GenerationError::Shape(format!("{}: not a JSON object", shape.name)))?;
    let missing: Vec<&str> = shape
        .fields
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(GenerationError::Shape(format!(
            "{}: missing {}",
            shape.name,
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Run one generation call bounded by `timeout` and convert the result into
/// a validated record of type `T`.
pub async fn generate_record<T>(
    generator: &dyn Generator,
    request: &GenerationRequest,
    timeout: Duration,
) -> Result<T, GenerationError>
where
    T: DeserializeOwned + Validate,
{
    let value = match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result?,
        Err(_) => return Err(GenerationError::Timeout(timeout)),
    };
    check_fields(&value, request)?;

    let record: T = serde_json::from_value(value)
        .map_err(|e| GenerationError::Shape(format!("{}: {e}", request.shape.name)))?;
    record
        .validate()
        .map_err(|e| GenerationError::Shape(format!("{}: {e}", request.shape.name)))?;
    Ok(record)
}
