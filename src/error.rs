use std::time::Duration;

use thiserror::Error;

/// Maximum number of characters of a response body kept in an error.
pub const BODY_EXCERPT_LEN: usize = 500;

/// Errors returned by Nano Banana operations.
#[derive(Error, Debug)]
pub enum DrawError {
    /// Required configuration is missing or invalid. Raised before any
    /// network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The draw endpoint rejected the submission.
    #[error("Task submission to {url} failed with HTTP {status}: {body}")]
    Submission {
        status: u16,
        body: String,
        url: String,
    },

    /// The submission did not complete within its deadline.
    #[error("Task submission to {url} timed out after {}s", .timeout.as_secs())]
    SubmissionTimeout { url: String, timeout: Duration },

    /// The submission succeeded but no task id could be found in the response.
    #[error("Cannot extract task id from response: {body}")]
    MalformedResponse { body: String },

    /// The final poll attempt failed at the transport or HTTP layer.
    #[error(
        "Polling task {task_id} failed after {attempts} attempts ({:.1}s): {last_error}",
        .elapsed.as_secs_f64()
    )]
    PollExhausted {
        task_id: String,
        attempts: u32,
        elapsed: Duration,
        last_error: String,
    },

    /// The attempt budget ran out while the task was still in progress.
    #[error(
        "Task {task_id} still not finished after {attempts} polls ({:.1}s)",
        .elapsed.as_secs_f64()
    )]
    PollTimeout {
        task_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The remote service reported the task as failed.
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    /// The task completed but the response carried no usable image.
    #[error("Task completed but no image could be extracted: {body}")]
    ExtractionFailed { body: String },

    /// The image URL returned a non-success status.
    #[error("Image download from {url} failed with HTTP {status}")]
    Download { status: u16, url: String },

    /// The image download did not complete within its deadline.
    #[error("Image download from {url} timed out")]
    DownloadTimeout { url: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The caller raised the cancellation flag.
    #[error("Generation was cancelled")]
    Cancelled,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DrawError>;

/// Cut a response body down to [`BODY_EXCERPT_LEN`] characters.
pub(crate) fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_body_unchanged() {
        assert_eq!(excerpt("{\"code\":401}"), "{\"code\":401}");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "图".repeat(600);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), BODY_EXCERPT_LEN);
    }

    #[test]
    fn test_display_carries_context() {
        let err = DrawError::PollTimeout {
            task_id: "t-1".into(),
            attempts: 60,
            elapsed: Duration::from_secs(120),
        };
        let msg = err.to_string();
        assert!(msg.contains("t-1"));
        assert!(msg.contains("60 polls"));
        assert!(msg.contains("120.0s"));

        let err = DrawError::SubmissionTimeout {
            url: "http://x/v1/draw/nano-banana".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("after 30s"));
    }

    #[test]
    fn test_task_failed_carries_remote_message() {
        let err = DrawError::TaskFailed {
            task_id: "t".into(),
            message: "content policy violation".into(),
        };
        assert_eq!(err.to_string(), "Task t failed: content policy violation");
    }
}
