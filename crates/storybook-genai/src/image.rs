//! Image generation job client.

use std::time::Duration;

use reqwest::Client;
use storybook_models::{GenerationJob, JobStatus};
use tracing::{debug, info};

use crate::error::{GenAiError, GenAiResult};
use crate::types::{Envelope, PicResult, SubmitRequest};

/// Envelope codes treated as success.
const SUCCESS_CODES: &[i64] = &[0, 200];

/// Configuration for the image generation service.
#[derive(Clone)]
pub struct ImageGenConfig {
    pub api_key: String,
    /// Job submission endpoint
    pub submit_url: String,
    /// Job status root; the job id is appended as a path segment
    pub query_url: String,
    /// Aspect ratio / size hint
    pub size: String,
    pub resolution: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ImageGenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGenConfig")
            .field("submit_url", &self.submit_url)
            .field("query_url", &self.query_url)
            .field("size", &self.size)
            .field("resolution", &self.resolution)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ImageGenConfig {
    pub fn new(
        api_key: impl Into<String>,
        submit_url: impl Into<String>,
        query_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            submit_url: submit_url.into(),
            query_url: query_url.into(),
            size: "1:1".to_string(),
            resolution: "1K".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key = std::env::var("IMAGE_GEN_API_KEY")
            .map_err(|_| GenAiError::config("IMAGE_GEN_API_KEY not set"))?;
        let submit_url = std::env::var("IMAGE_GEN_SUBMIT_URL")
            .map_err(|_| GenAiError::config("IMAGE_GEN_SUBMIT_URL not set"))?;
        let query_url = std::env::var("IMAGE_GEN_QUERY_URL")
            .map_err(|_| GenAiError::config("IMAGE_GEN_QUERY_URL not set"))?;

        let mut config = Self::new(api_key, submit_url, query_url);
        if let Ok(size) = std::env::var("IMAGE_GEN_SIZE") {
            config.size = size;
        }
        if let Ok(resolution) = std::env::var("IMAGE_GEN_RESOLUTION") {
            config.resolution = resolution;
        }
        if let Some(secs) = std::env::var("IMAGE_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// Client for submitting and polling image jobs.
#[derive(Clone)]
pub struct ImageGenClient {
    http: Client,
    config: ImageGenConfig,
}

impl ImageGenClient {
    pub fn new(config: ImageGenConfig) -> GenAiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::new(ImageGenConfig::from_env()?)
    }

    /// Submit a job and return its id.
    pub async fn submit(&self, prompt: &str, reference_url: &str) -> GenAiResult<String> {
        let request = SubmitRequest {
            prompt,
            size: &self.config.size,
            resolution: &self.config.resolution,
            reference_images: vec![reference_url],
        };

        let response = self
            .http
            .post(&self.config.submit_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(status.as_u16(), body));
        }

        let envelope: Envelope<serde_json::Value> = response.json().await.map_err(|e| {
            GenAiError::invalid_response(format!("Failed to parse submit response: {}", e))
        })?;
        check_code(envelope.code, envelope.message.as_deref())?;

        let job_id = match envelope.data {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            other => {
                return Err(GenAiError::invalid_response(format!(
                    "submit response has no job id: {:?}",
                    other
                )))
            }
        };

        info!(job_id = %job_id, "Image job submitted");
        Ok(job_id)
    }

    /// Read the current state of a job.
    pub async fn poll(&self, job_id: &str) -> GenAiResult<GenerationJob> {
        let url = format!("{}/{}", self.config.query_url.trim_end_matches('/'), job_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_http_status(status.as_u16(), body));
        }

        let envelope: Envelope<PicResult> = response.json().await.map_err(|e| {
            GenAiError::invalid_response(format!("Failed to parse poll response: {}", e))
        })?;

        let mut job = GenerationJob::submitted(job_id);
        if !SUCCESS_CODES.contains(&envelope.code) {
            let rejection = GenAiError::Rejected {
                code: envelope.code,
                message: envelope.message.clone().unwrap_or_default(),
            };
            // Throttled polls say nothing about the job itself
            if rejection.is_retryable() {
                debug!(job_id, code = envelope.code, "Poll throttled");
                return Err(rejection);
            }
            debug!(job_id, code = envelope.code, "Image job reported failure");
            job.status = JobStatus::Failed;
            return Ok(job);
        }

        if let Some(result) = envelope.data {
            job.status = JobStatus::from_pic_status(&result.pic_status);
            if job.status == JobStatus::Ready {
                job.result_url = result.pic_url.filter(|u| !u.is_empty());
            }
        }
        debug!(job_id, status = job.status.as_str(), "Polled image job");
        Ok(job)
    }
}

fn check_code(code: i64, message: Option<&str>) -> GenAiResult<()> {
    if SUCCESS_CODES.contains(&code) {
        Ok(())
    } else {
        Err(GenAiError::Rejected {
            code,
            message: message.unwrap_or("no message").to_string(),
        })
    }
}
