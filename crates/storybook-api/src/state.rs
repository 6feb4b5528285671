//! Application state.

use std::sync::Arc;

use storybook_pipeline::{AssetPublisher, PipelineError, StoryPipeline};
use storybook_storage::CosPublisher;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<StoryPipeline>,
    /// Publisher behind `/api/upload`
    pub publisher: Arc<dyn AssetPublisher>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        pipeline: StoryPipeline,
        publisher: Arc<dyn AssetPublisher>,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            publisher,
        }
    }

    /// Wire the production pipeline and publisher from environment variables.
    pub fn from_env(config: ApiConfig) -> Result<Self, PipelineError> {
        let pipeline = StoryPipeline::from_env()?;
        let publisher =
            CosPublisher::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?;
        Ok(Self::new(config, pipeline, Arc::new(publisher)))
    }
}
