//! Story generation pipeline.
//!
//! Turns a subject clip and a narrative clip into an illustrated story:
//! frame extraction and publishing, metadata analysis, script generation,
//! block parsing, and concurrent illustration with placeholder fallback.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod frames;
pub mod illustrator;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod parser;
pub mod placeholder;
pub mod ports;
pub mod prompts;
pub mod publish;
pub mod retry;
pub mod script;

pub use config::PipelineConfig;
pub use error::{IllustrationError, PipelineError, PipelineResult, StageError, Transient};
pub use orchestrator::{PipelineStages, StoryPipeline};
pub use parser::{parse_script, ParsedScript};
pub use placeholder::TemplatePlaceholder;
pub use ports::{
    AssetPublisher, FrameSource, Illustrator, MetadataAnalyzer, PlaceholderProvider,
    ScriptGenerator,
};
pub use retry::RetryPolicy;
