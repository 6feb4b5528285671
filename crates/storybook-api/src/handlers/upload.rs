//! Standalone image upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use storybook_models::StillImage;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::handlers::stories::media_type;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub code: u16,
    pub data: UploadData,
}

#[derive(Debug, Serialize)]
pub struct UploadData {
    pub url: String,
}

/// `POST /api/upload` with a multipart `file` field.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        if !data.is_empty() {
            image = Some(StillImage::new(
                data.to_vec(),
                media_type(content_type, "image/", "image/jpeg"),
            ));
        }
        break;
    }

    let image = image.ok_or_else(|| ApiError::bad_request("no file found in upload"))?;
    let url = state
        .publisher
        .publish(image)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    info!(url = %url, "Image uploaded");
    Ok(Json(UploadResponse {
        code: 200,
        data: UploadData { url },
    }))
}
