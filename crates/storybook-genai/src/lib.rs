//! Generation service clients.
//!
//! - [`GeminiClient`]: multimodal `generateContent` calls with inline video
//! - [`ImageGenClient`]: image job submission and status polling

pub mod error;
pub mod gemini;
pub mod image;
pub mod types;

pub use error::{is_transient_signature, GenAiError, GenAiResult};
pub use gemini::{GeminiClient, GeminiConfig, ResponseFormat};
pub use image::{ImageGenClient, ImageGenConfig};
