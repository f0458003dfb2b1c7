//! Google Gemini provider.
//!
//! Sends the rendered prompt to the `generateContent` endpoint and parses the
//! first candidate's text as a JSON object.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::shape::parse_object;
use super::trait_def::{GenerationError, Generator};
use super::types::GenerationRequest;

const SYSTEM_INSTRUCTION: &str = "You are an expert educational consultant. \
Always answer with a single valid JSON object that matches the requested format.";

const MAX_LOG_CHARS: usize = 2_000;

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Base endpoint URL, without a trailing slash.
    pub endpoint: String,
    pub temperature: f32,
    /// Transport-level timeout for one HTTP request.
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
    pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            temperature: Self::DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// [`Generator`] backed by the Gemini REST API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("model", &self.config.model)
            .field("endpoint", &self.config.endpoint)
            .finish_non_exhaustive()
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn truncate_for_log(input: &str) -> String {
    if input.chars().count() <= MAX_LOG_CHARS {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(MAX_LOG_CHARS).collect();
    preview.push_str("... [truncated]");
    preview
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError> {
        let prompt = request.render();
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                stage = %request.stage,
                template = request.template.name,
                prompt = %truncate_for_log(&prompt),
                "gemini request"
            );
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| GenerationError::Http(e.to_string()))?,
        );

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.url())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.config.request_timeout)
                } else {
                    GenerationError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Response(format!(
                "HTTP {status}: {}",
                truncate_for_log(&text)
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Malformed(format!("invalid Gemini envelope: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(GenerationError::Response(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        let content = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| GenerationError::Response("no content in response".to_string()))?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                stage = %request.stage,
                output = %truncate_for_log(&content),
                "gemini raw output"
            );
        }

        parse_object(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;
    use syllabus_store::{LearningFormat, UserInput};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        let input = UserInput::new("Rust", "C programmer", LearningFormat::Text, 1).unwrap();
        prompts::gap_analysis_request(&input)
    }

    fn generator_for(server: &MockServer) -> GeminiGenerator {
        let mut config = GeminiConfig::new("test-key");
        config.model = "test-model".to_string();
        config.endpoint = server.uri();
        GeminiGenerator::new(config).unwrap()
    }

    fn candidate(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
    }

    #[test]
    fn default_config() {
        let config = GeminiConfig::new("k");
        assert_eq!(config.model, GeminiConfig::DEFAULT_MODEL);
        assert_eq!(config.endpoint, GeminiConfig::DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn parses_json_from_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                "```json\n{\"current_level\": \"novice\"}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let value = generator.generate(&request()).await.unwrap();
        assert_eq!(value["current_level"], "novice");
    }

    #[tokio::test]
    async fn http_error_status_is_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate(&request()).await.unwrap_err();
        match err {
            GenerationError::Response(msg) => assert!(msg.contains("429"), "{msg}"),
            other => panic!("expected Response error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_error_body_is_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": { "message": "model overloaded", "code": 503 }
            })))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Response("Gemini API error: model overloaded".to_string())
        );
    }

    #[tokio::test]
    async fn non_json_text_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("I cannot help")))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn missing_candidates_is_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let generator = generator_for(&server);
        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Response("no content in response".to_string())
        );
    }
}
