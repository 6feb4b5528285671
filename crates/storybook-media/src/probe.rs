//! FFprobe duration lookup.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    duration: Option<String>,
}

/// Get video duration in seconds, if known.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<Option<f64>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_duration(&output.stdout)
}

fn parse_duration(stdout: &[u8]) -> MediaResult<Option<f64>> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    // Browser-recorded WebM often carries no container duration
    let duration = probe
        .format
        .duration
        .as_deref()
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_without_container_duration() {
        let json = br#"{
            "format": {},
            "streams": [
                {"codec_type": "audio", "codec_name": "opus"},
                {"codec_type": "video", "codec_name": "vp9", "width": 720, "height": 1280,
                 "avg_frame_rate": "0/0", "r_frame_rate": "30/1"}
            ]
        }"#;
        assert_eq!(parse_duration(json).unwrap(), None);

        let json = br#"{
            "format": {},
            "streams": [{"codec_type": "video", "duration": "3.5"}]
        }"#;
        assert_eq!(parse_duration(json).unwrap(), Some(3.5));
    }

    #[test]
    fn test_parse_probe_requires_video_stream() {
        let json = br#"{"format": {"duration": "4.2"}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_duration(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
