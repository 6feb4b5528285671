//! Representative still frame extraction.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use storybook_models::{StillImage, VideoAsset};
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Distance kept from the end of the clip so the seek lands on a decodable frame.
const END_OF_CLIP_MARGIN_SECS: f64 = 0.05;

/// Frame extraction settings.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Offset into the clip, clamped to its length
    pub seek_secs: f64,
    /// Lossy encoding quality in 0.0..=1.0
    pub quality: f32,
    /// Upper bound for a single FFmpeg run
    pub timeout: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            seek_secs: 1.0,
            quality: 0.8,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FrameConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            seek_secs: std::env::var("FRAME_SEEK_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            quality: std::env::var("FRAME_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.8),
            timeout: Duration::from_secs(
                std::env::var("FRAME_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// FFmpeg `-q:v` value for the configured quality.
    pub fn qscale(&self) -> u8 {
        qscale_for_quality(self.quality)
    }
}

/// Map a 0.0..=1.0 quality onto FFmpeg's JPEG scale (2 best, 31 worst).
pub fn qscale_for_quality(quality: f32) -> u8 {
    let q = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 0.8 };
    (31.0 - q * 29.0).round() as u8
}

/// Seek offset clamped to the clip length. Unknown durations start at the first frame.
pub fn seek_offset(requested: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d > 0.0 => requested
            .max(0.0)
            .min((d - END_OF_CLIP_MARGIN_SECS).max(0.0)),
        _ => 0.0,
    }
}

/// Extract one JPEG still from a video clip held in memory.
pub async fn extract_frame(asset: &VideoAsset, config: &FrameConfig) -> MediaResult<StillImage> {
    if asset.is_empty() {
        return Err(MediaError::invalid_video("video payload is empty"));
    }

    let work_dir = tempfile::tempdir()?;
    let input_path = work_dir.path().join(format!("input.{}", container_extension(asset.mime_type())));
    let output_path = work_dir.path().join("frame.jpg");

    tokio::fs::write(&input_path, asset.data()).await?;

    let duration = get_duration(&input_path).await?;
    let offset = seek_offset(config.seek_secs, duration);
    debug!(
        role = %asset.role(),
        duration = ?duration,
        offset,
        "Extracting still frame"
    );

    let frame = render_with_fallback(offset, |at| {
        render_frame(&input_path, &output_path, at, config)
    })
    .await?;

    let data = frame.ok_or_else(|| {
        MediaError::EmptyFrame(format!("no decodable frame in {} clip", asset.role()))
    })?;

    info!(role = %asset.role(), bytes = data.len(), "Extracted still frame");
    Ok(StillImage::jpeg(data))
}

/// Render at `offset`, retrying once at the first frame when that yields nothing or fails.
///
/// Variable frame rate clips can end before the probed duration.
async fn render_with_fallback<F, Fut>(offset: f64, mut render: F) -> MediaResult<Option<Vec<u8>>>
where
    F: FnMut(f64) -> Fut,
    Fut: Future<Output = MediaResult<Option<Vec<u8>>>>,
{
    match render(offset).await {
        Ok(Some(frame)) => return Ok(Some(frame)),
        Ok(None) if offset > 0.0 => {
            warn!(offset, "No frame at requested offset, falling back to first frame");
        }
        Err(e) if offset > 0.0 => {
            warn!(offset, error = %e, "Seek failed, falling back to first frame");
        }
        other => return other,
    }
    render(0.0).await
}

async fn render_frame(
    input: &Path,
    output: &Path,
    offset: f64,
    config: &FrameConfig,
) -> MediaResult<Option<Vec<u8>>> {
    let cmd = FfmpegCommand::new(input, output)
        .seek(offset)
        .single_frame()
        .jpeg_quality(config.qscale())
        .log_level("error");

    FfmpegRunner::new().with_timeout(config.timeout).run(&cmd).await?;

    match tokio::fs::read(output).await {
        Ok(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn container_extension(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or_default().trim();
    match base {
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        _ => "webm",
    }
}
