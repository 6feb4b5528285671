//! FFmpeg-backed frame source.

use async_trait::async_trait;
use storybook_media::{extract_frame, FrameConfig};
use storybook_models::{StillImage, VideoAsset};

use crate::error::StageError;
use crate::ports::FrameSource;

/// Extracts stills with the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSource {
    config: FrameConfig,
}

impl FfmpegFrameSource {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(FrameConfig::from_env())
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn extract(&self, subject: &VideoAsset) -> Result<StillImage, StageError> {
        Ok(extract_frame(subject, &self.config).await?)
    }
}
