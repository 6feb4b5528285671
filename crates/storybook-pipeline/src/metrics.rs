//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; binaries decide whether a
//! recorder is installed.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const STORIES_GENERATED_TOTAL: &str = "storybook_stories_generated_total";
    pub const STORIES_FAILED_TOTAL: &str = "storybook_stories_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "storybook_stage_duration_seconds";
    pub const SCENE_PLACEHOLDERS_TOTAL: &str = "storybook_scene_placeholders_total";
    pub const PARSE_DEGRADED_TOTAL: &str = "storybook_parse_degraded_total";
    pub const RETRIES_TOTAL: &str = "storybook_retries_total";
}

pub fn record_story_generated(scenes: usize) {
    let labels = [("scenes", scenes.to_string())];
    counter!(names::STORIES_GENERATED_TOTAL, &labels).increment(1);
}

pub fn record_story_failed(code: &'static str) {
    counter!(names::STORIES_FAILED_TOTAL, "code" => code).increment(1);
}

pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

pub fn record_scene_placeholder(reason: &'static str) {
    counter!(names::SCENE_PLACEHOLDERS_TOTAL, "reason" => reason).increment(1);
}

pub fn record_parse_degraded() {
    counter!(names::PARSE_DEGRADED_TOTAL).increment(1);
}

pub fn record_retry(operation: &'static str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation).increment(1);
}
