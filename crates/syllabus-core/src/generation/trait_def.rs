//! The `Generator` trait -- the seam to the text-generation capability.
//!
//! Each provider (Gemini, the offline stand-in, test fakes) implements this
//! trait. It is object-safe so the workflow can hold an `Arc<dyn Generator>`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::GenerationRequest;

/// Failures of a generation call. Stages recover from every variant by
/// substituting their fallback output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(String),

    #[error("response error: {0}")]
    Response(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response does not match the expected shape: {0}")]
    Shape(String),

    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// Produces a JSON value matching `request.shape`, or fails.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one generation call.
    ///
    /// Implementations return the parsed JSON object; shape validation of
    /// its contents is the caller's job.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError>;
}

// Compile-time assertion: Generator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Generator) {}
};
