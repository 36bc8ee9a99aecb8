//! Vision calls: one image plus one prompt in, raw reply text out.
//!
//! [`ImageExtractor`] is the seam between the pipeline and the model. The
//! pipeline never looks past it, so tests drive the whole extraction flow
//! with a scripted implementation and no network.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors and slow responses from LLM APIs are transient.
//! [`VisionExtractor`] retries with exponential backoff
//! (`retry_backoff_ms * 2^attempt`) and bounds every attempt with
//! `api_timeout_secs`. With 500 ms base and 2 retries the wait sequence is
//! 500 ms → 1 s.

use crate::config::ExtractionConfig;
use crate::error::ScheduleError;
use crate::pipeline::encode::encode_file;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Turns one image and a prompt into the model's raw reply.
///
/// The reply is usually JSON but nothing guarantees it; callers parse it.
#[async_trait]
pub trait ImageExtractor: Send + Sync {
    async fn extract(&self, image: &Path, prompt: &str) -> Result<String, ScheduleError>;
}

#[async_trait]
impl<T: ImageExtractor + ?Sized> ImageExtractor for Arc<T> {
    async fn extract(&self, image: &Path, prompt: &str) -> Result<String, ScheduleError> {
        (**self).extract(image, prompt).await
    }
}

/// [`ImageExtractor`] backed by an `edgequake-llm` vision provider.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout: Duration,
}

impl VisionExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageExtractor for VisionExtractor {
    /// Send `prompt` and the image as one user message.
    ///
    /// The prompt travels as the message text, not as a system message:
    /// it describes this particular image.
    async fn extract(&self, image: &Path, prompt: &str) -> Result<String, ScheduleError> {
        let start = Instant::now();
        let image_data = encode_file(image).await?;
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image_data])];
        let options = self.options();

        let mut last_err: Option<String> = None;
        let mut timed_out = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    image.display(),
                    attempt,
                    self.max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.api_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        image.display(),
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    let err_msg = e.to_string();
                    warn!(
                        "{}: attempt {} failed: {}",
                        image.display(),
                        attempt + 1,
                        err_msg
                    );
                    timed_out = false;
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    warn!(
                        "{}: attempt {} timed out after {}s",
                        image.display(),
                        attempt + 1,
                        self.api_timeout.as_secs()
                    );
                    timed_out = true;
                }
            }
        }

        if timed_out {
            return Err(ScheduleError::ApiTimeout {
                image: image.to_path_buf(),
                secs: self.api_timeout.as_secs(),
            });
        }
        Err(ScheduleError::LlmApiError {
            image: image.to_path_buf(),
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ImageExtractor for Echo {
        async fn extract(&self, image: &Path, prompt: &str) -> Result<String, ScheduleError> {
            Ok(format!("{}|{}", image.display(), prompt))
        }
    }

    #[tokio::test]
    async fn arc_forwards_to_inner_extractor() {
        let shared: Arc<dyn ImageExtractor> = Arc::new(Echo);
        let reply = shared.extract(Path::new("page_1.png"), "hi").await.unwrap();
        assert_eq!(reply, "page_1.png|hi");
    }
}
