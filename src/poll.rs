use reqwest::Client;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{excerpt, DrawError, Result};
use crate::extract::extract;
use crate::types::{ImageLocation, PollObservation, TaskHandle, TaskStatus};

/// A failed status query. Always transient: the poll loop retries it while
/// attempts remain.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("status query timed out")]
    Timeout,

    #[error("status query failed: {0}")]
    Transport(String),

    #[error("status query returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("status response was not valid JSON: {0}")]
    Decode(String),
}

/// Something that can report the current state of a task.
pub trait StatusSource: Send + Sync {
    fn query(
        &self,
        handle: &TaskHandle,
    ) -> impl Future<Output = std::result::Result<PollObservation, QueryError>> + Send;
}

/// Waits between poll attempts.
pub trait Pacer: Send + Sync {
    fn pause(&self, interval: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Pacer`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Attempt budget and cadence for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

/// [`StatusSource`] that queries the `/v1/draw/result` endpoint.
pub struct HttpStatusSource<'a> {
    http: &'a Client,
    url: String,
    api_key: &'a str,
    timeout: Duration,
}

impl<'a> HttpStatusSource<'a> {
    pub fn new(
        http: &'a Client,
        url: impl Into<String>,
        api_key: &'a str,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            api_key,
            timeout,
        }
    }
}

impl StatusSource for HttpStatusSource<'_> {
    async fn query(&self, handle: &TaskHandle) -> std::result::Result<PollObservation, QueryError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                QueryError::Timeout
            } else {
                QueryError::Transport(e.to_string())
            }
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key)
            .timeout(self.timeout)
            .json(&json!({ "id": handle.as_str() }))
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        let text = resp.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(QueryError::Http {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        let json: Value =
            serde_json::from_str(&text).map_err(|e| QueryError::Decode(e.to_string()))?;
        Ok(PollObservation::from_json(json))
    }
}

/// Fixed-interval poll loop over a shared attempt budget.
///
/// Every attempt counts against `max_attempts`, whether it failed in
/// transit or observed an in-progress task, so a task costs at most
/// `max_attempts` queries and `max_attempts - 1` pauses.
pub struct Poller<S, P = TokioPacer> {
    source: S,
    pacer: P,
    policy: PollPolicy,
    cancellation: Option<Arc<AtomicBool>>,
}

impl<S: StatusSource> Poller<S, TokioPacer> {
    pub fn new(source: S, policy: PollPolicy) -> Self {
        Self {
            source,
            pacer: TokioPacer,
            policy,
            cancellation: None,
        }
    }
}

impl<S: StatusSource, P: Pacer> Poller<S, P> {
    /// Replace the pacer, e.g. with one that records pauses instead of sleeping.
    pub fn with_pacer<Q: Pacer>(self, pacer: Q) -> Poller<S, Q> {
        Poller {
            source: self.source,
            pacer,
            policy: self.policy,
            cancellation: self.cancellation,
        }
    }

    /// Set a cancellation flag checked before every attempt.
    pub fn with_cancellation(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancellation = cancel;
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(ref cancel) = self.cancellation {
            if cancel.load(Ordering::Relaxed) {
                return Err(DrawError::Cancelled);
            }
        }
        Ok(())
    }

    /// Poll until the task reaches a terminal status or the budget runs out.
    pub async fn run(&self, handle: &TaskHandle) -> Result<ImageLocation> {
        let start = Instant::now();
        let max = self.policy.max_attempts;
        tracing::info!(task_id = %handle, max_attempts = max, "polling task result");

        for attempt in 1..=max {
            self.check_cancelled()?;
            let last = attempt == max;

            match self.source.query(handle).await {
                Err(err) => {
                    tracing::warn!(
                        task_id = %handle,
                        attempt,
                        max_attempts = max,
                        error = %err,
                        "status query failed"
                    );
                    if last {
                        return Err(DrawError::PollExhausted {
                            task_id: handle.to_string(),
                            attempts: attempt,
                            elapsed: start.elapsed(),
                            last_error: err.to_string(),
                        });
                    }
                }
                Ok(obs) => match obs.task_status() {
                    TaskStatus::Completed => {
                        tracing::info!(task_id = %handle, attempt, "task completed");
                        return extract(&obs);
                    }
                    TaskStatus::Failed => {
                        let message = obs.error.unwrap_or_else(|| "unknown error".to_string());
                        tracing::warn!(task_id = %handle, attempt, message = %message, "task failed");
                        return Err(DrawError::TaskFailed {
                            task_id: handle.to_string(),
                            message,
                        });
                    }
                    TaskStatus::Pending => {
                        tracing::debug!(
                            task_id = %handle,
                            attempt,
                            status = %obs.status,
                            progress = obs.progress.unwrap_or(0.0),
                            "task in progress"
                        );
                    }
                    TaskStatus::Unrecognized => {
                        tracing::warn!(
                            task_id = %handle,
                            attempt,
                            status = %obs.status,
                            "unknown task status, continuing to poll"
                        );
                    }
                },
            }

            if !last {
                self.pacer.pause(self.policy.interval).await;
            }
        }

        Err(DrawError::PollTimeout {
            task_id: handle.to_string(),
            attempts: max,
            elapsed: start.elapsed(),
        })
    }
}
