//! Image job illustrator: submit, then poll on a fixed interval.

use std::time::Duration;

use async_trait::async_trait;
use storybook_genai::{GenAiError, ImageGenClient};
use storybook_models::{GenerationJob, JobStatus};
use tracing::{debug, info, warn};

use crate::error::IllustrationError;
use crate::ports::Illustrator;
use crate::prompts::illustration_prompt;

/// Remote image job operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageJobs: Send + Sync {
    async fn submit(&self, prompt: &str, reference_url: &str) -> Result<String, GenAiError>;
    async fn poll(&self, job_id: &str) -> Result<GenerationJob, GenAiError>;
}

#[async_trait]
impl ImageJobs for ImageGenClient {
    async fn submit(&self, prompt: &str, reference_url: &str) -> Result<String, GenAiError> {
        ImageGenClient::submit(self, prompt, reference_url).await
    }

    async fn poll(&self, job_id: &str) -> Result<GenerationJob, GenAiError> {
        ImageGenClient::poll(self, job_id).await
    }
}

/// One submit followed by a bounded poll loop.
pub struct PollingIllustrator<J> {
    jobs: J,
    interval: Duration,
    max_attempts: u32,
}

impl<J: ImageJobs> PollingIllustrator<J> {
    pub fn new(jobs: J, interval: Duration, max_attempts: u32) -> Self {
        Self {
            jobs,
            interval,
            max_attempts,
        }
    }

    async fn wait_for(&self, page_number: u32, job_id: &str) -> Result<String, IllustrationError> {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            let job = match self.jobs.poll(job_id).await {
                Ok(job) => job,
                Err(e) => {
                    // Transport errors count against the budget but do not end the job
                    debug!(page_number, job_id, attempt, error = %e, "Poll failed, still waiting");
                    continue;
                }
            };

            match job.status {
                JobStatus::Ready => match job.ready_url() {
                    Some(url) => {
                        info!(page_number, job_id, attempt, "Illustration ready");
                        return Ok(url.to_string());
                    }
                    None => {
                        warn!(page_number, job_id, "Job ready without an image URL");
                        return Err(IllustrationError::JobFailed {
                            job_id: job_id.to_string(),
                        });
                    }
                },
                JobStatus::Failed => {
                    return Err(IllustrationError::JobFailed {
                        job_id: job_id.to_string(),
                    })
                }
                JobStatus::Pending => {}
            }
        }

        Err(IllustrationError::Timeout {
            job_id: job_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[async_trait]
impl<J: ImageJobs> Illustrator for PollingIllustrator<J> {
    async fn illustrate(
        &self,
        page_number: u32,
        prompt: &str,
        reference_url: &str,
    ) -> Result<String, IllustrationError> {
        let prompt = illustration_prompt(prompt);
        let job_id = self
            .jobs
            .submit(&prompt, reference_url)
            .await
            .map_err(IllustrationError::SubmitFailed)?;

        debug!(page_number, job_id = %job_id, "Waiting for illustration");
        self.wait_for(page_number, &job_id).await
    }
}
