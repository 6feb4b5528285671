//! FFmpeg CLI wrapper for still frame extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Timeout-bounded FFmpeg execution
//! - FFprobe duration lookup
//! - Representative frame extraction from in-memory clips

pub mod command;
pub mod error;
pub mod frame;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame::{extract_frame, FrameConfig};
pub use probe::get_duration;
