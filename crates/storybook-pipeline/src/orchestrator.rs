//! Story pipeline orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use storybook_genai::{GeminiClient, ImageGenClient};
use storybook_models::{
    AssetRole, Character, EncodedVideo, Metadata, Scene, StillImage, Story, StoryRequestId,
    VideoAsset,
};
use storybook_storage::CosPublisher;
use tracing::{warn, Instrument};

use crate::analyzer::GeminiAnalyzer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, StageError};
use crate::frames::FfmpegFrameSource;
use crate::illustrator::PollingIllustrator;
use crate::logging::StoryLogger;
use crate::metrics;
use crate::parser::{parse_script, ParsedScript};
use crate::placeholder::TemplatePlaceholder;
use crate::ports::{
    AssetPublisher, FrameSource, Illustrator, MetadataAnalyzer, PlaceholderProvider,
    ScriptGenerator,
};
use crate::prompts::BLOCK_SENTINEL;
use crate::script::GeminiScriptWriter;

/// The collaborators a pipeline runs against.
#[derive(Clone)]
pub struct PipelineStages {
    pub frames: Arc<dyn FrameSource>,
    pub publisher: Arc<dyn AssetPublisher>,
    pub analyzer: Arc<dyn MetadataAnalyzer>,
    pub scripts: Arc<dyn ScriptGenerator>,
    pub illustrator: Arc<dyn Illustrator>,
    pub placeholders: Arc<dyn PlaceholderProvider>,
}

/// Turns a subject clip and a narrative clip into an illustrated story.
#[derive(Clone)]
pub struct StoryPipeline {
    stages: PipelineStages,
    config: PipelineConfig,
}

impl StoryPipeline {
    pub fn new(stages: PipelineStages, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    /// Wire the production stages from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        let config = PipelineConfig::from_env();

        let gemini =
            GeminiClient::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?;
        let images =
            ImageGenClient::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?;
        let publisher =
            CosPublisher::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?;

        let stages = PipelineStages {
            frames: Arc::new(FfmpegFrameSource::from_env()),
            publisher: Arc::new(publisher),
            analyzer: Arc::new(GeminiAnalyzer::new(gemini.clone())),
            scripts: Arc::new(GeminiScriptWriter::new(gemini, config.page_count)),
            illustrator: Arc::new(PollingIllustrator::new(
                images,
                config.poll_interval,
                config.poll_max_attempts,
            )),
            placeholders: Arc::new(TemplatePlaceholder::new(config.placeholder_url.clone())),
        };

        Ok(Self::new(stages, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one story request.
    ///
    /// Fails only for missing input, frame extraction, publishing, or an
    /// unrecovered metadata or script stage. Illustration failures become
    /// placeholders.
    pub async fn generate_story(
        &self,
        subject: Option<&VideoAsset>,
        narrative: Option<&VideoAsset>,
        snapshot: Option<StillImage>,
    ) -> PipelineResult<Story> {
        let request_id = StoryRequestId::new();
        let logger = StoryLogger::new(&request_id);
        let span = logger.create_span();
        let started = Instant::now();

        let result = self
            .run(subject, narrative, snapshot, &logger)
            .instrument(span)
            .await;

        match &result {
            Ok(story) => {
                metrics::record_story_generated(story.scenes.len());
                logger.log_completion(&format!(
                    "\"{}\" with {} scenes in {:.1}s",
                    story.title,
                    story.scenes.len(),
                    started.elapsed().as_secs_f64()
                ));
            }
            Err(e) => {
                metrics::record_story_failed(e.code());
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        subject: Option<&VideoAsset>,
        narrative: Option<&VideoAsset>,
        snapshot: Option<StillImage>,
        logger: &StoryLogger,
    ) -> PipelineResult<Story> {
        let subject = require(subject, AssetRole::Subject)?;
        let narrative = require(narrative, AssetRole::Narrative)?;
        logger.log_start(&format!(
            "subject {} bytes, narrative {} bytes, snapshot: {}",
            subject.len(),
            narrative.len(),
            snapshot.is_some()
        ));

        let publish_logger = logger.stage("publish");
        let (videos, reference_url) = tokio::try_join!(
            encode_videos(subject, narrative),
            self.prepare_reference(subject, snapshot, &publish_logger),
        )?;

        let metadata = timed(
            "metadata",
            self.config
                .retry
                .run("metadata", || self.stages.analyzer.analyze(&videos)),
        )
        .await
        .map_err(PipelineError::AnalysisFailed)?;
        logger
            .stage("metadata")
            .log_progress(&format!("title \"{}\"", metadata.title));

        let script = timed(
            "script",
            self.config
                .retry
                .run("script", || self.stages.scripts.generate(&metadata, &videos)),
        )
        .await
        .map_err(PipelineError::ScriptGenerationFailed)?;

        let parsed = self.parse(&script, &logger.stage("parse"))?;

        let scenes = timed(
            "illustrations",
            self.illustrate_all(parsed.scenes, Arc::from(reference_url), logger),
        )
        .await;

        Ok(self.assemble(metadata, scenes))
    }

    /// Still image (snapshot or extracted frame) published to storage.
    async fn prepare_reference(
        &self,
        subject: &VideoAsset,
        snapshot: Option<StillImage>,
        logger: &StoryLogger,
    ) -> PipelineResult<String> {
        let still = match snapshot.filter(|s| !s.is_empty()) {
            Some(still) => {
                logger.log_progress("using supplied snapshot");
                still
            }
            None => timed("frame", self.stages.frames.extract(subject))
                .await
                .map_err(PipelineError::FrameExtractionFailed)?,
        };

        let url = timed("publish", self.stages.publisher.publish(still))
            .await
            .map_err(PipelineError::AssetPublishFailed)?;
        logger.log_progress(&format!("reference image at {}", url));
        Ok(url)
    }

    fn parse(&self, script: &str, logger: &StoryLogger) -> PipelineResult<ParsedScript> {
        let parsed = parse_script(script, BLOCK_SENTINEL, self.config.page_count);

        if parsed.is_empty() {
            return Err(PipelineError::ScriptGenerationFailed(StageError::permanent(
                "script contained no recognizable pages",
            )));
        }
        if parsed.degraded {
            metrics::record_parse_degraded();
            logger.log_warning(&format!(
                "no page labels found, using the last {} blocks",
                parsed.scenes.len()
            ));
        } else {
            logger.log_progress(&format!("{} pages parsed", parsed.scenes.len()));
        }
        Ok(parsed)
    }

    /// Illustrate every scene concurrently; failures fall back to placeholders.
    async fn illustrate_all(
        &self,
        scenes: Vec<Scene>,
        reference_url: Arc<str>,
        logger: &StoryLogger,
    ) -> Vec<Scene> {
        let logger = logger.stage("illustration");

        let tasks = scenes.into_iter().map(|scene| {
            let reference_url = Arc::clone(&reference_url);
            let logger = &logger;
            async move {
                let page_number = scene.page_number;
                let result = self
                    .config
                    .retry
                    .run("illustration", || {
                        self.stages
                            .illustrator
                            .illustrate(page_number, &scene.image_prompt, &reference_url)
                    })
                    .await;

                match result {
                    Ok(url) => scene.with_image_url(url),
                    Err(e) => {
                        warn!(
                            request_id = logger.request_id(),
                            page_number,
                            reason = e.kind(),
                            error = %e,
                            "Illustration failed, using placeholder"
                        );
                        metrics::record_scene_placeholder(e.kind());
                        let url = self.stages.placeholders.placeholder(page_number);
                        scene.with_image_url(url)
                    }
                }
            }
        });

        join_all(tasks).await
    }

    fn assemble(&self, metadata: Metadata, scenes: Vec<Scene>) -> Story {
        let character = Character {
            name: self.config.character_name.clone(),
            visual_description: metadata.visual_description(),
        };
        Story::new(metadata.title, character, scenes)
    }
}

fn require(asset: Option<&VideoAsset>, role: AssetRole) -> PipelineResult<&VideoAsset> {
    asset
        .filter(|a| !a.is_empty())
        .ok_or(PipelineError::InputMissing(role))
}

async fn encode_videos(
    subject: &VideoAsset,
    narrative: &VideoAsset,
) -> PipelineResult<Vec<EncodedVideo>> {
    let (subject, narrative) = tokio::try_join!(encode(subject), encode(narrative))?;
    Ok(vec![subject, narrative])
}

async fn encode(asset: &VideoAsset) -> PipelineResult<EncodedVideo> {
    let bytes = asset.shared_data();
    let data = tokio::task::spawn_blocking(move || STANDARD.encode(&bytes[..]))
        .await
        .map_err(|e| PipelineError::EncodingFailed(e.to_string()))?;

    Ok(EncodedVideo {
        role: asset.role(),
        mime_type: asset.mime_type().to_string(),
        data,
    })
}

async fn timed<F: Future>(stage: &'static str, future: F) -> F::Output {
    let started = Instant::now();
    let output = future.await;
    metrics::record_stage_duration(stage, started.elapsed().as_secs_f64());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IllustrationError;
    use crate::ports::{
        MockAssetPublisher, MockFrameSource, MockIllustrator, MockMetadataAnalyzer,
        MockPlaceholderProvider, MockScriptGenerator,
    };
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::time::Duration;

    fn metadata() -> Metadata {
        Metadata {
            title: "月亮风筝".into(),
            summary: "A kite trip to the moon.".into(),
            character_age: "6-year-old".into(),
            character_gender: "girl".into(),
            character_clothing: "red raincoat".into(),
        }
    }

    fn three_page_script() -> String {
        [
            "Cover: 月亮风筝",
            "Introduction: meet Mia",
            "Page 1\n中文文案：米娅找到了风筝。",
            "Page 2\n中文文案：风筝飞起来了。",
            "Page 3\n中文文案：她们到了月亮上。",
        ]
        .join(&format!("\n{}\n", BLOCK_SENTINEL))
    }

    fn video(role: AssetRole) -> VideoAsset {
        VideoAsset::new(vec![1u8, 2, 3, 4], "video/webm", role)
    }

    fn snapshot() -> StillImage {
        StillImage::jpeg(vec![0xff, 0xd8])
    }

    struct Doubles {
        frames: MockFrameSource,
        publisher: MockAssetPublisher,
        analyzer: MockMetadataAnalyzer,
        scripts: MockScriptGenerator,
        illustrator: Arc<dyn Illustrator>,
        placeholders: Arc<dyn PlaceholderProvider>,
    }

    impl Doubles {
        /// Publisher, analyzer and script writer succeed; the frame source must not be called.
        fn happy(illustrator: Arc<dyn Illustrator>) -> Self {
            let mut frames = MockFrameSource::new();
            frames.expect_extract().never();

            let mut publisher = MockAssetPublisher::new();
            publisher
                .expect_publish()
                .returning(|_| Ok("https://cdn/hero.jpg".to_string()));

            let mut analyzer = MockMetadataAnalyzer::new();
            analyzer
                .expect_analyze()
                .withf(|videos| videos.len() == 2 && videos[0].role == AssetRole::Subject)
                .returning(|_| Ok(metadata()));

            let mut scripts = MockScriptGenerator::new();
            scripts
                .expect_generate()
                .returning(|_, _| Ok(three_page_script()));

            Self {
                frames,
                publisher,
                analyzer,
                scripts,
                illustrator,
                placeholders: Arc::new(TemplatePlaceholder::new("https://placeholder/{page}.png")),
            }
        }

        fn pipeline(self) -> StoryPipeline {
            StoryPipeline::new(
                PipelineStages {
                    frames: Arc::new(self.frames),
                    publisher: Arc::new(self.publisher),
                    analyzer: Arc::new(self.analyzer),
                    scripts: Arc::new(self.scripts),
                    illustrator: self.illustrator,
                    placeholders: self.placeholders,
                },
                PipelineConfig::default(),
            )
        }
    }

    fn illustrator_ok() -> Arc<dyn Illustrator> {
        let mut illustrator = MockIllustrator::new();
        illustrator
            .expect_illustrate()
            .withf(|_, _, reference| reference == "https://cdn/hero.jpg")
            .returning(|page, _, _| Ok(format!("https://img/{}.png", page)));
        Arc::new(illustrator)
    }

    /// Finishes pages in reverse order.
    struct ReverseOrderIllustrator;

    #[async_trait]
    impl Illustrator for ReverseOrderIllustrator {
        async fn illustrate(
            &self,
            page_number: u32,
            _prompt: &str,
            _reference_url: &str,
        ) -> Result<String, IllustrationError> {
            tokio::time::sleep(Duration::from_secs(10 - page_number as u64)).await;
            Ok(format!("https://img/{}.png", page_number))
        }
    }

    #[tokio::test]
    async fn test_story_from_snapshot() {
        let pipeline = Doubles::happy(illustrator_ok()).pipeline();
        let story = pipeline
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap();

        assert_eq!(story.title, "月亮风筝");
        assert_eq!(story.character.name, "Little Hero");
        assert_eq!(
            story.character.visual_description,
            "6-year-old, girl, wearing red raincoat"
        );
        let pages: Vec<u32> = story.scenes.iter().map(|s| s.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(story.scenes[1].narration, "风筝飞起来了。");
        assert_eq!(story.scenes[2].image_url.as_deref(), Some("https://img/3.png"));
    }

    #[tokio::test]
    async fn test_frame_extracted_without_snapshot() {
        let mut doubles = Doubles::happy(illustrator_ok());
        doubles.frames = MockFrameSource::new();
        doubles
            .frames
            .expect_extract()
            .times(1)
            .returning(|_| Ok(StillImage::jpeg(vec![9, 9])));

        let story = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                None,
            )
            .await
            .unwrap();
        assert_eq!(story.scenes.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_scene_gets_placeholder() {
        let mut illustrator = MockIllustrator::new();
        illustrator.expect_illustrate().returning(|page, _, _| {
            if page == 2 {
                Err(IllustrationError::Timeout {
                    job_id: "job-2".into(),
                    attempts: 30,
                })
            } else {
                Ok(format!("https://img/{}.png", page))
            }
        });

        let mut placeholders = MockPlaceholderProvider::new();
        placeholders
            .expect_placeholder()
            .with(eq(2))
            .times(1)
            .returning(|page| format!("https://placeholder/{}.png", page));

        let mut doubles = Doubles::happy(Arc::new(illustrator));
        doubles.placeholders = Arc::new(placeholders);

        let story = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap();

        assert_eq!(story.scenes.len(), 3);
        assert_eq!(story.scenes[0].image_url.as_deref(), Some("https://img/1.png"));
        assert_eq!(
            story.scenes[1].image_url.as_deref(),
            Some("https://placeholder/2.png")
        );
        assert_eq!(story.scenes[2].image_url.as_deref(), Some("https://img/3.png"));
    }

    #[tokio::test]
    async fn test_publish_failure_stops_before_analysis() {
        let mut publisher = MockAssetPublisher::new();
        publisher
            .expect_publish()
            .returning(|_| Err(StageError::permanent("broker rejected request")));

        let mut analyzer = MockMetadataAnalyzer::new();
        analyzer.expect_analyze().never();
        let mut scripts = MockScriptGenerator::new();
        scripts.expect_generate().never();
        let mut illustrator = MockIllustrator::new();
        illustrator.expect_illustrate().never();

        let mut doubles = Doubles::happy(Arc::new(illustrator));
        doubles.publisher = publisher;
        doubles.analyzer = analyzer;
        doubles.scripts = scripts;

        let err = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AssetPublishFailed(_)));
    }

    #[tokio::test]
    async fn test_frame_failure_is_fatal() {
        let mut doubles = Doubles::happy(illustrator_ok());
        doubles.frames = MockFrameSource::new();
        doubles
            .frames
            .expect_extract()
            .returning(|_| Err(StageError::permanent("invalid data found when processing input")));
        doubles.publisher = MockAssetPublisher::new();
        doubles.publisher.expect_publish().never();
        doubles.analyzer = MockMetadataAnalyzer::new();
        doubles.analyzer.expect_analyze().never();

        let err = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FrameExtractionFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenes_sorted_regardless_of_completion_order() {
        let pipeline = Doubles::happy(Arc::new(ReverseOrderIllustrator)).pipeline();
        let story = pipeline
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap();

        let pages: Vec<u32> = story.scenes.iter().map(|s| s.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(story.scenes[0].image_url.as_deref(), Some("https://img/1.png"));
    }

    #[tokio::test]
    async fn test_missing_inputs() {
        let pipeline = Doubles::happy(illustrator_ok()).pipeline();

        let err = pipeline
            .generate_story(None, Some(&video(AssetRole::Narrative)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputMissing(AssetRole::Subject)));

        let empty = VideoAsset::new(Vec::new(), "video/webm", AssetRole::Narrative);
        let err = pipeline
            .generate_story(Some(&video(AssetRole::Subject)), Some(&empty), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputMissing(AssetRole::Narrative)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_analysis_is_retried() {
        let mut doubles = Doubles::happy(illustrator_ok());
        let mut analyzer = MockMetadataAnalyzer::new();
        let mut seq = Sequence::new();
        analyzer
            .expect_analyze()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(StageError::transient("429 RESOURCE_EXHAUSTED")));
        analyzer
            .expect_analyze()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(metadata()));
        doubles.analyzer = analyzer;

        let story = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap();
        assert_eq!(story.scenes.len(), 3);
    }

    #[tokio::test]
    async fn test_script_without_pages_fails() {
        let mut doubles = Doubles::happy(Arc::new({
            let mut illustrator = MockIllustrator::new();
            illustrator.expect_illustrate().never();
            illustrator
        }));
        doubles.scripts = MockScriptGenerator::new();
        doubles
            .scripts
            .expect_generate()
            .returning(|_, _| Ok("Once upon a time.".to_string()));

        let err = doubles
            .pipeline()
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ScriptGenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_permanent_analysis_failure_is_not_retried() {
        let mut doubles = Doubles::happy(illustrator_ok());
        doubles.analyzer = MockMetadataAnalyzer::new();
        doubles
            .analyzer
            .expect_analyze()
            .times(1)
            .returning(|_| Err(StageError::permanent("400 invalid argument")));
        doubles.scripts = MockScriptGenerator::new();
        doubles.scripts.expect_generate().never();

        let mut pipeline = doubles.pipeline();
        pipeline.config.retry = RetryPolicy::new(3, Duration::from_millis(1));

        let err = pipeline
            .generate_story(
                Some(&video(AssetRole::Subject)),
                Some(&video(AssetRole::Narrative)),
                Some(snapshot()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AnalysisFailed(_)));
    }
}
