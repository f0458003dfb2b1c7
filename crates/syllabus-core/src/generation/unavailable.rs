//! Stand-in provider used when no model is configured.

use async_trait::async_trait;

use super::trait_def::{GenerationError, Generator};
use super::types::GenerationRequest;

/// A [`Generator`] that fails every call, so each stage serves its fallback.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Generator for UnavailableGenerator {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError> {
        Err(GenerationError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;
    use syllabus_store::{LearningFormat, UserInput};

    #[tokio::test]
    async fn every_call_fails_with_reason() {
        let generator = UnavailableGenerator::new("no API key configured");
        let input = UserInput::new("Rust", "", LearningFormat::Text, 1).unwrap();
        let err = generator
            .generate(&prompts::gap_analysis_request(&input))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Unavailable("no API key configured".to_string())
        );
    }
}
