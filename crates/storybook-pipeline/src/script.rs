//! Gemini script writer.

use async_trait::async_trait;
use storybook_genai::GeminiClient;
use storybook_models::{EncodedVideo, Metadata};
use tracing::debug;

use crate::error::StageError;
use crate::ports::ScriptGenerator;
use crate::prompts::script_prompt;

/// Free-text page script generation.
#[derive(Clone)]
pub struct GeminiScriptWriter {
    client: GeminiClient,
    page_count: usize,
}

impl GeminiScriptWriter {
    pub fn new(client: GeminiClient, page_count: usize) -> Self {
        Self { client, page_count }
    }
}

#[async_trait]
impl ScriptGenerator for GeminiScriptWriter {
    async fn generate(
        &self,
        metadata: &Metadata,
        videos: &[EncodedVideo],
    ) -> Result<String, StageError> {
        let prompt = script_prompt(metadata, self.page_count);
        let model = &self.client.config().script_model;

        let text = self.client.generate_text(model, None, videos, &prompt).await?;
        debug!(chars = text.chars().count(), "Script generated");
        Ok(text)
    }
}
