//! Stage seams of the story pipeline.
//!
//! Each stage is an async trait so the orchestrator can run against the
//! real services or against test doubles.

use async_trait::async_trait;
use storybook_models::{EncodedVideo, Metadata, StillImage, VideoAsset};

use crate::error::{IllustrationError, StageError};

#[cfg(test)]
use mockall::automock;

/// Derives a representative still from the subject clip.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn extract(&self, subject: &VideoAsset) -> Result<StillImage, StageError>;
}

/// Stores a still image and returns its public URL.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn publish(&self, image: StillImage) -> Result<String, StageError>;
}

/// Extracts story metadata from both clips.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataAnalyzer: Send + Sync {
    async fn analyze(&self, videos: &[EncodedVideo]) -> Result<Metadata, StageError>;
}

/// Writes the raw page script.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(
        &self,
        metadata: &Metadata,
        videos: &[EncodedVideo],
    ) -> Result<String, StageError>;
}

/// Produces one illustration URL for a page prompt.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Illustrator: Send + Sync {
    async fn illustrate(
        &self,
        page_number: u32,
        prompt: &str,
        reference_url: &str,
    ) -> Result<String, IllustrationError>;
}

/// Stand-in illustration for pages whose generation failed.
#[cfg_attr(test, automock)]
pub trait PlaceholderProvider: Send + Sync {
    fn placeholder(&self, page_number: u32) -> String;
}
