//! Object storage publisher stage.

use async_trait::async_trait;
use storybook_models::StillImage;
use storybook_storage::CosPublisher;

use crate::error::StageError;
use crate::ports::AssetPublisher;

#[async_trait]
impl AssetPublisher for CosPublisher {
    async fn publish(&self, image: StillImage) -> Result<String, StageError> {
        if image.is_empty() {
            return Err(StageError::permanent("still image is empty"));
        }
        Ok(CosPublisher::publish(self, image).await?)
    }
}
