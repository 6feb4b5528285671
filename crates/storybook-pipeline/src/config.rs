//! Pipeline configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default placeholder template; `{page}` is replaced with the page number.
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://picsum.photos/seed/storybook-page-{page}/600/600";

/// Default protagonist name.
pub const DEFAULT_CHARACTER_NAME: &str = "Little Hero";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Story pages requested from the script stage
    pub page_count: usize,
    /// Retry policy for stage calls
    pub retry: RetryPolicy,
    /// Interval between image job polls
    pub poll_interval: Duration,
    /// Poll budget per image job
    pub poll_max_attempts: u32,
    /// Placeholder illustration template
    pub placeholder_url: String,
    /// Protagonist name in the finished story
    pub character_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_count: 3,
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(3),
            poll_max_attempts: 30,
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            character_name: DEFAULT_CHARACTER_NAME.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let retry = RetryPolicy::new(
            env_parse("RETRY_MAX").unwrap_or(defaults.retry.max_retries),
            env_parse("RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
        );

        Self {
            page_count: env_parse::<usize>("STORY_PAGE_COUNT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_count),
            retry,
            poll_interval: env_parse("POLL_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            poll_max_attempts: env_parse::<u32>("POLL_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.poll_max_attempts),
            placeholder_url: std::env::var("PLACEHOLDER_IMAGE_URL")
                .unwrap_or(defaults.placeholder_url),
            character_name: std::env::var("CHARACTER_NAME").unwrap_or(defaults.character_name),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
