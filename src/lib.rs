//! # nanobanana-rs
//!
//! Async Rust client for the Nano Banana image generation API, a remote
//! task-based service: a prompt is submitted as a task, the task is polled
//! until it finishes, and the finished image is returned as raw bytes.
//!
//! ## Workflow
//!
//! - **Submit**: `POST /v1/draw/nano-banana` returns a task id
//! - **Poll**: `POST /v1/draw/result` on a fixed interval, bounded by an
//!   attempt budget shared by in-progress polls and transient failures
//! - **Extract**: a finished task carries either an image URL or inline
//!   base64 data (optionally a `data:` URI)
//! - **Download**: URL results are fetched; inline results are decoded
//!
//! Every stage logs through [`tracing`]; install a subscriber to see it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nanobanana_rs::{AspectRatio, GenerationRequest, NanoBananaClient, NanoBananaConfig};
//!
//! # async fn example() -> nanobanana_rs::Result<()> {
//! let config = NanoBananaConfig::from_env();
//! let client = NanoBananaClient::new(config);
//!
//! let request = GenerationRequest::new("a watercolor lighthouse at dusk")
//!     .aspect_ratio(AspectRatio::Landscape16x9);
//!
//! // Or step by step:
//! let task = client.submit(&request).await?;
//! let location = client.poll(&task).await?;
//! let bytes = client.resolve(location).await?;
//! std::fs::write("lighthouse.png", &bytes).unwrap();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod poll;
pub mod submit;
pub mod types;

pub use client::NanoBananaClient;
pub use config::{ConfigReport, NanoBananaConfig, NanoBananaConfigBuilder};
pub use error::{DrawError, Result};
pub use extract::extract;
pub use poll::{Pacer, PollPolicy, Poller, QueryError, StatusSource, TokioPacer};
pub use types::{
    AspectRatio, GenerationRequest, ImageBytes, ImageLocation, PollObservation, Resolution,
    TaskHandle, TaskStatus,
};
