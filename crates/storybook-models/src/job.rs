//! Request and image-generation job identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one story generation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryRequestId(pub String);

impl StoryRequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StoryRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoryRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status code the image service reports for a finished picture.
pub const PIC_STATUS_READY: &str = "5";

/// Status of a remote image-generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl JobStatus {
    /// Map the service's `picStatus` value.
    ///
    /// Only the ready code is terminal; every other value keeps the job pending.
    pub fn from_pic_status(pic_status: &str) -> Self {
        if pic_status.trim() == PIC_STATUS_READY {
            JobStatus::Ready
        } else {
            JobStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }
}

/// Snapshot of a remote image-generation job as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl GenerationJob {
    /// A freshly submitted job.
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            result_url: None,
        }
    }

    /// Ready with a usable result URL.
    pub fn ready_url(&self) -> Option<&str> {
        match (self.status, self.result_url.as_deref()) {
            (JobStatus::Ready, Some(url)) if !url.trim().is_empty() => Some(url),
            _ => None,
        }
    }
}
