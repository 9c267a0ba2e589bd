use std::time::Duration;

use crate::error::{DrawError, Result};
use crate::types::AspectRatio;

pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
/// Longer than the API calls since images can be large.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_BASE_URL: &str = "https://grsai.dakka.com.cn";
pub const DEFAULT_MODEL: &str = "nano-banana-fast";

/// Path of the task submission endpoint, relative to `base_url`.
pub const SUBMIT_PATH: &str = "/v1/draw/nano-banana";
/// Path of the task result endpoint, relative to `base_url`.
pub const RESULT_PATH: &str = "/v1/draw/result";

/// Configuration for the Nano Banana client.
///
/// Use [`NanoBananaConfig::builder()`] for ergonomic construction,
/// [`NanoBananaConfig::from_env()`] to read `NANO_BANANA_*` variables, or
/// [`NanoBananaConfig::default()`] for the service defaults (no API key).
#[derive(Clone)]
pub struct NanoBananaConfig {
    /// API root, without a trailing slash.
    pub base_url: String,

    /// Model used when a request does not name one.
    pub model: String,

    /// Aspect ratio used when a request does not name one.
    pub default_aspect_ratio: AspectRatio,

    /// Maximum number of status queries per task.
    pub max_poll_attempts: u32,

    /// Sleep between status queries.
    pub poll_interval: Duration,

    /// Bearer token. `None` fails every submission before it is sent.
    pub api_key: Option<String>,

    /// Deadline for the submission request.
    pub submit_timeout: Duration,

    /// Deadline for each status query.
    pub query_timeout: Duration,

    /// Deadline for downloading the finished image.
    pub download_timeout: Duration,
}

impl std::fmt::Debug for NanoBananaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NanoBananaConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("default_aspect_ratio", &self.default_aspect_ratio)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_interval", &self.poll_interval)
            .field("has_api_key", &self.api_key.is_some())
            .field("submit_timeout", &self.submit_timeout)
            .field("query_timeout", &self.query_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

impl Default for NanoBananaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            default_aspect_ratio: AspectRatio::default(),
            max_poll_attempts: 60,
            poll_interval: Duration::from_secs(2),
            api_key: None,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

fn normalize(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

impl NanoBananaConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> NanoBananaConfigBuilder {
        NanoBananaConfigBuilder::default()
    }

    /// Read configuration from `NANO_BANANA_*` environment variables.
    ///
    /// Unset variables keep their defaults. A variable that is set but cannot
    /// be parsed is logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("NANO_BANANA_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup("NANO_BANANA_BASE_URL") {
            config.base_url = normalize(&url);
        }
        if let Some(model) = lookup("NANO_BANANA_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("NANO_BANANA_ASPECT_RATIO") {
            match raw.parse::<AspectRatio>() {
                Ok(ratio) => config.default_aspect_ratio = ratio,
                Err(_) => tracing::warn!(value = %raw, "ignoring NANO_BANANA_ASPECT_RATIO"),
            }
        }
        if let Some(raw) = lookup("NANO_BANANA_MAX_POLL_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(n) => config.max_poll_attempts = n,
                Err(_) => tracing::warn!(value = %raw, "ignoring NANO_BANANA_MAX_POLL_ATTEMPTS"),
            }
        }
        if let Some(raw) = lookup("NANO_BANANA_POLL_INTERVAL_SECS") {
            match raw.trim().parse::<f64>() {
                Ok(secs) => match Duration::try_from_secs_f64(secs) {
                    Ok(interval) => config.poll_interval = interval,
                    Err(_) => tracing::warn!(value = %raw, "ignoring NANO_BANANA_POLL_INTERVAL_SECS"),
                },
                Err(_) => tracing::warn!(value = %raw, "ignoring NANO_BANANA_POLL_INTERVAL_SECS"),
            }
        }

        config
    }

    /// Full URL of the submission endpoint.
    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, SUBMIT_PATH)
    }

    /// Full URL of the result endpoint.
    pub fn result_url(&self) -> String {
        format!("{}{}", self.base_url, RESULT_PATH)
    }

    /// Upper bound on time spent sleeping between polls for one task.
    /// Saturates at `Duration::MAX`.
    pub fn max_poll_wait(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.max_poll_attempts)
            .unwrap_or(Duration::MAX)
    }

    /// Return the API key, or a [`DrawError::Config`] if none is set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DrawError::Config(
                    "Nano Banana API key is not configured; set NANO_BANANA_API_KEY \
                     or NanoBananaConfig::api_key"
                        .into(),
                )
            })
    }

    /// Check the configuration without touching the network.
    pub fn validate(&self) -> ConfigReport {
        let mut problems = Vec::new();
        let has_api_key = self.require_api_key().is_ok();

        if !has_api_key {
            problems.push("API key is not configured".to_string());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            problems.push(format!(
                "base URL must start with http:// or https:// (got {:?})",
                self.base_url
            ));
        }
        if self.max_poll_attempts == 0 {
            problems.push("max_poll_attempts must be at least 1".to_string());
        }

        ConfigReport {
            submit_url: self.submit_url(),
            result_url: self.result_url(),
            model: self.model.clone(),
            default_aspect_ratio: self.default_aspect_ratio,
            has_api_key,
            max_poll_wait: self.max_poll_wait(),
            problems,
        }
    }
}

/// Result of [`NanoBananaConfig::validate`].
#[derive(Debug, Clone)]
pub struct ConfigReport {
    pub submit_url: String,
    pub result_url: String,
    pub model: String,
    pub default_aspect_ratio: AspectRatio,
    pub has_api_key: bool,
    pub max_poll_wait: Duration,
    pub problems: Vec<String>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Builder for [`NanoBananaConfig`].
#[derive(Default)]
pub struct NanoBananaConfigBuilder {
    config: NanoBananaConfig,
}

impl NanoBananaConfigBuilder {
    /// Set the API root. Trailing slashes are removed.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = normalize(&url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_default_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.config.default_aspect_ratio = ratio;
        self
    }

    /// Set the attempt budget shared by in-progress polls and transient failures.
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = attempts;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the deadline for the submission request.
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.config.submit_timeout = timeout;
        self
    }

    /// Set the deadline for each status query. A query that times out counts
    /// as a transient failure.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = timeout;
        self
    }

    /// Build the final [`NanoBananaConfig`].
    pub fn build(self) -> NanoBananaConfig {
        self.config
    }
}
