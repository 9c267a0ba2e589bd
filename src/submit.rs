use reqwest::Client;
use serde_json::{json, Value};

use crate::config::NanoBananaConfig;
use crate::error::{excerpt, DrawError, Result};
use crate::types::{GenerationRequest, TaskHandle};

/// Fields that may carry the task id in a submission response, highest
/// priority first.
pub const TASK_ID_KEYS: &[&str] = &["id", "task_id"];

/// Build the JSON body for the submission endpoint.
pub fn build_payload(config: &NanoBananaConfig, request: &GenerationRequest) -> Value {
    let model = request.requested_model().unwrap_or(&config.model);
    let ratio = request
        .requested_aspect_ratio()
        .unwrap_or(config.default_aspect_ratio);

    json!({
        "model": model,
        "prompt": request.prompt(),
        "aspectRatio": ratio.as_str(),
        "urls": [],
        "webHook": "",
        "shutProgress": false,
    })
}

/// Pull the task id out of a submission response body.
///
/// String ids are used verbatim; numeric ids are stringified.
pub fn extract_task_id(body: &Value) -> Option<TaskHandle> {
    TASK_ID_KEYS
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(TaskHandle::new(s.clone())),
            Value::Number(n) => Some(TaskHandle::new(n.to_string())),
            _ => None,
        })
}

/// Submit a generation request and return its task handle.
///
/// The API key is checked before anything is sent. Reference images on the
/// request are not forwarded yet; their presence is logged as a warning.
pub async fn submit(
    http: &Client,
    config: &NanoBananaConfig,
    request: &GenerationRequest,
) -> Result<TaskHandle> {
    let api_key = config.require_api_key()?;

    let refs = request.reference_image_count();
    if refs > 0 {
        tracing::warn!(
            count = refs,
            "reference images are not supported by the Nano Banana API yet; ignoring them"
        );
    }

    let url = config.submit_url();
    let timeout = config.submit_timeout;
    let payload = build_payload(config, request);
    tracing::info!(
        url = %url,
        model = %payload["model"],
        aspect_ratio = %payload["aspectRatio"],
        "submitting generation task"
    );

    let resp = http
        .post(&url)
        .bearer_auth(api_key)
        .timeout(timeout)
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                DrawError::SubmissionTimeout {
                    url: url.clone(),
                    timeout,
                }
            } else {
                DrawError::Network {
                    context: format!("Cannot reach Nano Banana at {}", url),
                    source: e,
                }
            }
        })?;

    let status = resp.status();
    let text = resp.text().await.map_err(|e| {
        if e.is_timeout() {
            DrawError::SubmissionTimeout {
                url: url.clone(),
                timeout,
            }
        } else {
            DrawError::Network {
                context: "Failed to read Nano Banana submission response".into(),
                source: e,
            }
        }
    })?;

    if !status.is_success() {
        let body = excerpt(&text);
        tracing::error!(status = status.as_u16(), url = %url, body = %body, "task submission rejected");
        return Err(DrawError::Submission {
            status: status.as_u16(),
            body,
            url,
        });
    }

    let json: Value = serde_json::from_str(&text).map_err(|_| DrawError::MalformedResponse {
        body: excerpt(&text),
    })?;
    tracing::debug!(response = %json, "submission response");

    let handle = extract_task_id(&json).ok_or_else(|| DrawError::MalformedResponse {
        body: excerpt(&text),
    })?;
    tracing::info!(task_id = %handle, "task submitted");
    Ok(handle)
}
