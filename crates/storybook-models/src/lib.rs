//! Shared data models for the storybook pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Captured video assets and still images
//! - Story metadata produced by the analysis stage
//! - Scenes and the finished story
//! - Image generation jobs

pub mod asset;
pub mod job;
pub mod metadata;
pub mod story;

// Re-export common types
pub use asset::{AssetRole, EncodedVideo, StillImage, UnknownRole, VideoAsset};
pub use job::{GenerationJob, JobStatus, StoryRequestId, PIC_STATUS_READY};
pub use metadata::Metadata;
pub use story::{Character, Scene, Story};
