//! Story generation handler.

use axum::extract::{Multipart, State};
use axum::Json;
use storybook_models::{AssetRole, StillImage, Story, VideoAsset};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_VIDEO_TYPE: &str = "video/webm";
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// `POST /api/stories`
///
/// Multipart fields: `subject` and `narrative` clips (the capture tags
/// `protagonist` and `story` are accepted too) and an optional `snapshot`.
pub async fn create_story(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Story>> {
    let mut subject: Option<VideoAsset> = None;
    let mut narrative: Option<VideoAsset> = None;
    let mut snapshot: Option<StillImage> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        if name == "snapshot" || name == "faceSnapshot" {
            let data = field.bytes().await?;
            if !data.is_empty() {
                let mime = media_type(content_type, "image/", DEFAULT_IMAGE_TYPE);
                snapshot = Some(StillImage::new(data.to_vec(), mime));
            }
            continue;
        }

        let Ok(role) = name.parse::<AssetRole>() else {
            debug!(field = %name, "Ignoring unknown multipart field");
            continue;
        };

        let data = field.bytes().await?;
        let mime = media_type(content_type, "video/", DEFAULT_VIDEO_TYPE);
        let asset = VideoAsset::new(data.to_vec(), mime, role);
        match role {
            AssetRole::Subject => subject = Some(asset),
            AssetRole::Narrative => narrative = Some(asset),
        }
    }

    info!(
        subject_bytes = subject.as_ref().map(|a| a.len()).unwrap_or(0),
        narrative_bytes = narrative.as_ref().map(|a| a.len()).unwrap_or(0),
        snapshot = snapshot.is_some(),
        "Story request received"
    );

    let timeout = state.config.request_timeout;
    let story = tokio::time::timeout(
        timeout,
        state
            .pipeline
            .generate_story(subject.as_ref(), narrative.as_ref(), snapshot),
    )
    .await
    .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    Ok(Json(story))
}

/// Part content type when it matches `family`, else `fallback`.
pub(crate) fn media_type(content_type: Option<String>, family: &str, fallback: &str) -> String {
    content_type
        .filter(|ct| ct.starts_with(family))
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_fallback() {
        assert_eq!(media_type(Some("video/mp4".into()), "video/", DEFAULT_VIDEO_TYPE), "video/mp4");
        assert_eq!(
            media_type(Some("application/octet-stream".into()), "video/", DEFAULT_VIDEO_TYPE),
            "video/webm"
        );
        assert_eq!(media_type(None, "image/", DEFAULT_IMAGE_TYPE), "image/jpeg");
    }
}
