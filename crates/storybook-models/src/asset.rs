//! Captured media assets.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role a captured clip plays in the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// Clip establishing the main character's appearance.
    Subject,
    /// Clip in which the plot is narrated.
    Narrative,
}

impl AssetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Subject => "subject",
            AssetRole::Narrative => "narrative",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role tag is not recognized.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown asset role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for AssetRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subject" | "protagonist" | "hero" => Ok(AssetRole::Subject),
            "narrative" | "story" => Ok(AssetRole::Narrative),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A captured video clip.
///
/// The payload is reference counted so the pipeline can hand it to blocking
/// encode tasks without copying.
#[derive(Clone)]
pub struct VideoAsset {
    data: Arc<[u8]>,
    mime_type: String,
    role: AssetRole,
}

impl VideoAsset {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>, role: AssetRole) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            role,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the payload.
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn role(&self) -> AssetRole {
        self.role
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoAsset")
            .field("role", &self.role)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A single still frame of the subject, or a caller-supplied snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct StillImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl StillImage {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: "image/jpeg".to_string(),
        }
    }

    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// File extension matching the declared media type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for StillImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StillImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A video payload encoded for inline transmission (base64).
#[derive(Clone, Serialize, Deserialize)]
pub struct EncodedVideo {
    pub role: AssetRole,
    pub mime_type: String,
    pub data: String,
}

impl fmt::Debug for EncodedVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedVideo")
            .field("role", &self.role)
            .field("mime_type", &self.mime_type)
            .field("encoded_len", &self.data.len())
            .finish()
    }
}
