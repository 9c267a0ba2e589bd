use reqwest::Client;
use std::time::Duration;

use crate::error::{DrawError, Result};
use crate::types::ImageBytes;

fn short(url: &str) -> &str {
    match url.char_indices().nth(100) {
        Some((idx, _)) => &url[..idx],
        None => url,
    }
}

/// Download an image by URL within `timeout`. Returns raw bytes.
pub async fn fetch(http: &Client, url: &str, timeout: Duration) -> Result<ImageBytes> {
    tracing::info!(url = short(url), "downloading image");

    let as_error = |e: reqwest::Error| {
        if e.is_timeout() {
            DrawError::DownloadTimeout {
                url: url.to_string(),
            }
        } else {
            DrawError::Network {
                context: format!("Failed to fetch image from {}", short(url)),
                source: e,
            }
        }
    };

    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(as_error)?;

    if !resp.status().is_success() {
        return Err(DrawError::Download {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = resp.bytes().await.map_err(as_error)?;
    tracing::info!(bytes = bytes.len(), "image downloaded");
    Ok(bytes.to_vec())
}
