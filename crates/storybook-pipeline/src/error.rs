//! Pipeline error types.

use storybook_genai::GenAiError;
use storybook_media::MediaError;
use storybook_models::AssetRole;
use storybook_storage::StorageError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures that abort a story request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing input: {0} clip")]
    InputMissing(AssetRole),

    #[error("Frame extraction failed: {0}")]
    FrameExtractionFailed(#[source] StageError),

    #[error("Asset publishing failed: {0}")]
    AssetPublishFailed(#[source] StageError),

    #[error("Metadata analysis failed: {0}")]
    AnalysisFailed(#[source] StageError),

    #[error("Script generation failed: {0}")]
    ScriptGenerationFailed(#[source] StageError),

    #[error("Video encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputMissing(_) => "INPUT_MISSING",
            Self::FrameExtractionFailed(_) => "FRAME_EXTRACTION_FAILED",
            Self::AssetPublishFailed(_) => "ASSET_PUBLISH_FAILED",
            Self::AnalysisFailed(_) => "ANALYSIS_FAILED",
            Self::ScriptGenerationFailed(_) => "SCRIPT_GENERATION_FAILED",
            Self::EncodingFailed(_) => "ENCODING_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Failure caused by a remote service rather than the request itself.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::AssetPublishFailed(_) | Self::AnalysisFailed(_) | Self::ScriptGenerationFailed(_)
        )
    }
}

/// Failure of a single stage call, classified for the retry policy.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("{0} (transient)")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),
}

impl StageError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }
}

impl From<GenAiError> for StageError {
    fn from(e: GenAiError) -> Self {
        if e.is_retryable() {
            Self::Transient(e.to_string())
        } else {
            Self::Permanent(e.to_string())
        }
    }
}

impl From<StorageError> for StageError {
    fn from(e: StorageError) -> Self {
        Self::Permanent(e.to_string())
    }
}

impl From<MediaError> for StageError {
    fn from(e: MediaError) -> Self {
        Self::Permanent(e.to_string())
    }
}

/// Per-scene illustration failures. These never abort the request.
#[derive(Debug, Error)]
pub enum IllustrationError {
    #[error("Image job submission failed: {0}")]
    SubmitFailed(#[source] GenAiError),

    #[error("Image job {job_id} not ready after {attempts} polls")]
    Timeout { job_id: String, attempts: u32 },

    #[error("Image job {job_id} failed")]
    JobFailed { job_id: String },
}

impl IllustrationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubmitFailed(_) => "submit_failed",
            Self::Timeout { .. } => "timeout",
            Self::JobFailed { .. } => "job_failed",
        }
    }
}

/// Errors the retry policy may re-run.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for StageError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl Transient for IllustrationError {
    fn is_transient(&self) -> bool {
        match self {
            Self::SubmitFailed(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl Transient for GenAiError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}
