//! Structured story logging utilities.

use tracing::{error, info, warn, Span};

use storybook_models::StoryRequestId;

/// Logger carrying the request id and the current stage.
#[derive(Debug, Clone)]
pub struct StoryLogger {
    request_id: String,
    stage: &'static str,
}

impl StoryLogger {
    pub fn new(request_id: &StoryRequestId) -> Self {
        Self {
            request_id: request_id.to_string(),
            stage: "start",
        }
    }

    /// Same request, another stage.
    pub fn stage(&self, stage: &'static str) -> Self {
        Self {
            request_id: self.request_id.clone(),
            stage,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(request_id = %self.request_id, stage = self.stage, "Story started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(request_id = %self.request_id, stage = self.stage, "Story progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(request_id = %self.request_id, stage = self.stage, "Story warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(request_id = %self.request_id, stage = self.stage, "Story error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(request_id = %self.request_id, stage = self.stage, "Story completed: {}", message);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn current_stage(&self) -> &'static str {
        self.stage
    }

    /// Span instrumenting a whole story run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("story", request_id = %self.request_id)
    }
}
