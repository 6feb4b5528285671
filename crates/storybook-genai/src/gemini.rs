//! Gemini `generateContent` client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use storybook_models::EncodedVideo;
use tracing::{debug, info, warn};

use crate::error::{GenAiError, GenAiResult};
use crate::types::{
    ApiErrorBody, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the Gemini client.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// API root, without the `/models/...` suffix
    pub base_url: String,
    /// Model used for structured metadata analysis
    pub analysis_model: String,
    /// Model used for free-text script generation
    pub script_model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("analysis_model", &self.analysis_model)
            .field("script_model", &self.script_model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            analysis_model: DEFAULT_MODEL.to_string(),
            script_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GenAiError::config("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            analysis_model: std::env::var("GEMINI_ANALYSIS_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            script_model: std::env::var("GEMINI_SCRIPT_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(180),
            ),
        })
    }
}

/// Requested response shape.
#[derive(Debug, Clone)]
pub enum ResponseFormat {
    Text,
    /// JSON constrained by a Gemini `responseSchema`
    Json(serde_json::Value),
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GenAiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Run one `generateContent` call and return the response text.
    pub async fn generate(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        videos: &[EncodedVideo],
        prompt: &str,
        format: ResponseFormat,
    ) -> GenAiResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let mut parts: Vec<Part<'_>> = videos
            .iter()
            .map(|v| Part::InlineData {
                inline_data: InlineData {
                    mime_type: &v.mime_type,
                    data: &v.data,
                },
            })
            .collect();
        parts.push(Part::Text { text: prompt });

        let generation_config = match format {
            ResponseFormat::Text => None,
            ResponseFormat::Json(schema) => Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Some(schema),
            }),
        };

        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            system_instruction: system_instruction.map(|text| Content {
                parts: vec![Part::Text { text }],
            }),
            generation_config,
        };

        debug!(model, videos = videos.len(), prompt_len = prompt.len(), "Calling Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "Gemini request failed");
            return Err(api_error(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::invalid_response(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            return Err(GenAiError::invalid_response(format!("Prompt blocked: {}", reason)));
        }

        let text = parsed.text().ok_or(GenAiError::EmptyResponse)?;
        info!(model, response_len = text.len(), "Gemini response received");
        Ok(text)
    }

    /// Free-text generation.
    pub async fn generate_text(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        videos: &[EncodedVideo],
        prompt: &str,
    ) -> GenAiResult<String> {
        self.generate(model, system_instruction, videos, prompt, ResponseFormat::Text)
            .await
    }

    /// Structured generation decoded into `T`.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        model: &str,
        system_instruction: Option<&str>,
        videos: &[EncodedVideo],
        prompt: &str,
        schema: serde_json::Value,
    ) -> GenAiResult<T> {
        let text = self
            .generate(model, system_instruction, videos, prompt, ResponseFormat::Json(schema))
            .await?;
        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            GenAiError::invalid_response(format!("Failed to parse JSON output: {}", e))
        })
    }
}

/// Prefer the structured Google error body when one is present.
fn api_error(status: u16, body: String) -> GenAiError {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => GenAiError::Api {
            status,
            message: format!("{} {}", parsed.error.status, parsed.error.message)
                .trim()
                .to_string(),
        },
        Err(_) => GenAiError::from_http_status(status, body),
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_models::AssetRole;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        let mut config = GeminiConfig::new("test-key");
        config.base_url = server.uri();
        GeminiClient::new(config).unwrap()
    }

    fn video() -> EncodedVideo {
        EncodedVideo {
            role: AssetRole::Subject,
            mime_type: "video/webm".into(),
            data: "AAAA".into(),
        }
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[tokio::test]
    async fn test_generate_text_sends_inline_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "parts": [
                    { "inlineData": { "mimeType": "video/webm", "data": "AAAA" } },
                    { "text": "write" }
                ]}]
            })))
            .respond_with(text_response("Page 1"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .generate_text("gemini-2.5-flash", None, &[video()], "write")
            .await
            .unwrap();
        assert_eq!(text, "Page 1");
    }

    #[tokio::test]
    async fn test_generate_json_decodes_fenced_output() {
        #[derive(serde::Deserialize)]
        struct Out {
            title: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(text_response("```json\n{\"title\":\"Moon\"}\n```"))
            .mount(&server)
            .await;

        let out: Out = client(&server)
            .generate_json(
                "gemini-2.5-flash",
                Some("system"),
                &[],
                "analyze",
                serde_json::json!({ "type": "OBJECT" }),
            )
            .await
            .unwrap();
        assert_eq!(out.title, "Moon");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate_text("gemini-2.5-flash", None, &[], "x")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), Some(429));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = client(&server)
            .generate_text("gemini-2.5-flash", None, &[], "x")
            .await
            .unwrap_err();
        assert!(matches!(err, GenAiError::EmptyResponse));
        assert!(!err.is_retryable());
    }
}
