//! Gemini metadata analyzer.

use async_trait::async_trait;
use storybook_genai::{GeminiClient, GenAiError};
use storybook_models::{EncodedVideo, Metadata};
use tracing::debug;
use validator::Validate;

use crate::error::StageError;
use crate::ports::MetadataAnalyzer;
use crate::prompts::{metadata_schema, METADATA_INSTRUCTION, METADATA_PROMPT};

/// Structured metadata extraction over both clips.
#[derive(Clone)]
pub struct GeminiAnalyzer {
    client: GeminiClient,
}

impl GeminiAnalyzer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, videos: &[EncodedVideo]) -> Result<Metadata, StageError> {
        let model = &self.client.config().analysis_model;

        let metadata: Metadata = self
            .client
            .generate_json(
                model,
                Some(METADATA_INSTRUCTION),
                videos,
                METADATA_PROMPT,
                metadata_schema(),
            )
            .await
            .map_err(|e| match e {
                // Malformed model output is worth another attempt
                GenAiError::InvalidResponse(_) | GenAiError::EmptyResponse => {
                    StageError::transient(e.to_string())
                }
                other => other.into(),
            })?;

        let metadata = metadata.normalized();
        metadata
            .validate()
            .map_err(|e| StageError::transient(format!("incomplete metadata: {}", e)))?;

        debug!(title = %metadata.title, "Metadata extracted");
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Transient;
    use storybook_genai::GeminiConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn analyzer_returning(text: &str) -> (MockServer, GeminiAnalyzer) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            })))
            .mount(&server)
            .await;
        let mut config = GeminiConfig::new("key");
        config.base_url = server.uri();
        let analyzer = GeminiAnalyzer::new(GeminiClient::new(config).unwrap());
        (server, analyzer)
    }

    #[tokio::test]
    async fn test_valid_metadata_is_normalized() {
        let (_server, analyzer) = analyzer_returning(
            r#"{"title":" 月亮风筝 ","summary":"A kite trip.","characterAge":"6-year-old","characterGender":"girl","characterClothing":"red coat"}"#,
        )
        .await;

        let metadata = analyzer.analyze(&[]).await.unwrap();
        assert_eq!(metadata.title, "月亮风筝");
        assert_eq!(metadata.character_clothing, "red coat");
    }

    #[tokio::test]
    async fn test_blank_field_is_transient() {
        let (_server, analyzer) = analyzer_returning(
            r#"{"title":"T","summary":"S","characterAge":"  ","characterGender":"boy","characterClothing":"cap"}"#,
        )
        .await;

        let err = analyzer.analyze(&[]).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unparseable_output_is_transient() {
        let (_server, analyzer) = analyzer_returning("not json at all").await;
        let err = analyzer.analyze(&[]).await.unwrap_err();
        assert!(err.is_transient());
    }
}
