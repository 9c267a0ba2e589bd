use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::NanoBananaConfig;
use crate::download;
use crate::error::{DrawError, Result};
use crate::poll::{HttpStatusSource, PollPolicy, Poller};
use crate::submit;
use crate::types::*;

/// Async client for the Nano Banana draw API.
///
/// Runs one generation as submit, poll, extract and (for URL results)
/// download, strictly in sequence. The client is cheap to clone; run
/// several generations concurrently by spawning one task per call.
///
/// # Example
/// ```no_run
/// use nanobanana_rs::{GenerationRequest, NanoBananaClient, NanoBananaConfig};
///
/// # async fn example() -> nanobanana_rs::Result<()> {
/// let config = NanoBananaConfig::builder().with_api_key("sk-...").build();
/// let client = NanoBananaClient::new(config);
/// let png = client.generate(&GenerationRequest::new("a paper boat")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NanoBananaClient {
    http: Client,
    config: NanoBananaConfig,
    cancellation: Option<Arc<AtomicBool>>,
}

impl NanoBananaClient {
    /// Create a new client from a configuration.
    pub fn new(config: NanoBananaConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            cancellation: None,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Set a flag that aborts the generation at the next checkpoint
    /// (before submitting, and before each poll attempt).
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancel);
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &NanoBananaConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(ref cancel) = self.cancellation {
            if cancel.load(Ordering::Relaxed) {
                return Err(DrawError::Cancelled);
            }
        }
        Ok(())
    }

    fn policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.config.max_poll_attempts,
            interval: self.config.poll_interval,
        }
    }

    /// Generate one image and return its bytes.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<ImageBytes> {
        self.check_cancelled()?;
        let handle = self.submit(request).await?;
        let location = self.poll(&handle).await?;
        let bytes = self.resolve(location).await?;
        tracing::info!(task_id = %handle, bytes = bytes.len(), "image generated");
        Ok(bytes)
    }

    /// Submit a request. Returns the task handle to poll.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        submit::submit(&self.http, &self.config, request).await
    }

    /// Poll a submitted task until it finishes and return where its image is.
    pub async fn poll(&self, handle: &TaskHandle) -> Result<ImageLocation> {
        let api_key = self.config.require_api_key()?;
        let source = HttpStatusSource::new(
            &self.http,
            self.config.result_url(),
            api_key,
            self.config.query_timeout,
        );
        Poller::new(source, self.policy())
            .with_cancellation(self.cancellation.clone())
            .run(handle)
            .await
    }

    /// Download an image by URL.
    pub async fn fetch(&self, url: &str) -> Result<ImageBytes> {
        download::fetch(&self.http, url, self.config.download_timeout).await
    }

    /// Turn a location into bytes, downloading only when it is a URL.
    pub async fn resolve(&self, location: ImageLocation) -> Result<ImageBytes> {
        match location {
            ImageLocation::RemoteUrl(url) => self.fetch(&url).await,
            ImageLocation::InlineEncoded(bytes) => {
                tracing::info!(bytes = bytes.len(), "image delivered inline");
                Ok(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_keeps_config() {
        let client = NanoBananaClient::new(
            NanoBananaConfig::builder()
                .with_base_url("http://localhost:9000/")
                .with_max_poll_attempts(7)
                .with_poll_interval(Duration::from_millis(250))
                .build(),
        );
        assert_eq!(client.config().base_url, "http://localhost:9000");
        assert_eq!(
            client.policy(),
            PollPolicy {
                max_attempts: 7,
                interval: Duration::from_millis(250)
            }
        );
    }

    #[tokio::test]
    async fn test_inline_location_skips_download() {
        let client = NanoBananaClient::new(NanoBananaConfig::default());
        let bytes = client
            .resolve(ImageLocation::InlineEncoded(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_before_submit() {
        let cancel = Arc::new(AtomicBool::new(true));
        let client = NanoBananaClient::new(
            NanoBananaConfig::builder()
                .with_base_url("http://127.0.0.1:1")
                .with_api_key("sk")
                .build(),
        )
        .with_cancellation(cancel);
        let err = client
            .generate(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::Cancelled));
    }

    #[tokio::test]
    async fn test_poll_without_key_is_config_error() {
        let client = NanoBananaClient::new(NanoBananaConfig::default());
        let err = client.poll(&TaskHandle::new("t")).await.unwrap_err();
        assert!(matches!(err, DrawError::Config(_)));
    }
}
