//! Raw plan requests and their validation into [`UserInput`].
//!
//! A [`PlanRequest`] is what callers submit (HTTP bodies, batch files, CLI
//! flags). Nothing downstream of validation ever sees an unvalidated request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{LearningFormat, RequestMetadata, UserInput};

/// Errors that reject a request before any workflow stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("preferred_format must be 'video', 'text', or 'audio' (got {0:?})")]
    UnknownFormat(String),

    #[error("max_iterations must be a positive integer")]
    ZeroIterations,
}

/// An unvalidated request to generate one learning plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub preferred_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl PlanRequest {
    pub fn new(
        topic: impl Into<String>,
        background: impl Into<String>,
        preferred_format: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            background: background.into(),
            preferred_format: preferred_format.into(),
            ..Self::default()
        }
    }

    /// Validate and normalize the request.
    ///
    /// Topic and background are trimmed; the format is parsed
    /// case-insensitively; `max_iterations` defaults to 1.
    pub fn validate(&self) -> Result<UserInput, ValidationError> {
        let preferred_format = self
            .preferred_format
            .parse::<LearningFormat>()
            .map_err(|_| ValidationError::UnknownFormat(self.preferred_format.clone()))?;
        UserInput::new(
            &self.topic,
            &self.background,
            preferred_format,
            self.max_iterations.unwrap_or(1),
        )
    }

    /// Metadata to store alongside the plan generated for this request.
    pub fn metadata(&self) -> RequestMetadata {
        RequestMetadata {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            fallbacks: Vec::new(),
        }
    }
}

impl UserInput {
    pub fn new(
        topic: &str,
        background: &str,
        preferred_format: LearningFormat,
        max_iterations: u32,
    ) -> Result<Self, ValidationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if max_iterations == 0 {
            return Err(ValidationError::ZeroIterations);
        }
        Ok(Self {
            topic: topic.to_string(),
            background: background.trim().to_string(),
            preferred_format,
            max_iterations,
        })
    }
}
