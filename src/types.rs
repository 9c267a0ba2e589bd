use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::DrawError;

/// Raw image bytes handed back to the caller.
pub type ImageBytes = Vec<u8>;

/// Aspect ratios accepted by the draw endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[default]
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
    #[serde(rename = "auto")]
    Auto,
}

impl AspectRatio {
    /// Every supported ratio, in the order the service documents them.
    pub const ALL: [AspectRatio; 11] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Ultrawide21x9,
        AspectRatio::Auto,
    ];

    /// The string sent as `aspectRatio`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Ultrawide21x9 => "21:9",
            AspectRatio::Auto => "auto",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DrawError::Config(format!("Unsupported aspect ratio: {}", s)))
    }
}

/// Nominal output resolution tiers. Reporting metadata only; the service
/// picks the actual pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::OneK, Resolution::TwoK, Resolution::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneK => "1K",
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single image generation request.
///
/// Fields left unset fall back to the client configuration at submit time.
///
/// # Example
/// ```
/// use nanobanana_rs::{AspectRatio, GenerationRequest};
///
/// let req = GenerationRequest::new("a red fox in fresh snow")
///     .aspect_ratio(AspectRatio::Landscape16x9)
///     .model("nano-banana");
/// assert_eq!(req.prompt(), "a red fox in fresh snow");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    aspect_ratio: Option<AspectRatio>,
    model: Option<String>,
    reference_images: Vec<Vec<u8>>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: None,
            model: None,
            reference_images: Vec::new(),
        }
    }

    pub fn aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach a reference image.
    ///
    /// Reference images are accepted but not yet forwarded to the service;
    /// submitting a request that carries any logs a warning. An image that is
    /// byte-identical to one already attached is ignored.
    pub fn reference_image(mut self, image: impl Into<Vec<u8>>) -> Self {
        let image = image.into();
        if !self.reference_images.contains(&image) {
            self.reference_images.push(image);
        }
        self
    }

    /// Attach several reference images. See [`GenerationRequest::reference_image`].
    pub fn reference_images<I, B>(self, images: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        images
            .into_iter()
            .fold(self, |req, img| req.reference_image(img))
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn requested_aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio
    }

    pub fn requested_model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn reference_image_count(&self) -> usize {
        self.reference_images.len()
    }
}

/// Opaque id of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task state derived from the `status` field of a poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
    /// A status token the service has not documented. Polled like `Pending`.
    Unrecognized,
}

impl TaskStatus {
    /// Map a raw status token, ignoring case.
    ///
    /// A missing or empty token counts as `Pending`. Nothing outside the
    /// known success tokens ever maps to `Completed`.
    pub fn classify(raw: &str) -> TaskStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "success" => TaskStatus::Completed,
            "failed" | "error" => TaskStatus::Failed,
            "" | "processing" | "pending" | "running" => TaskStatus::Pending,
            _ => TaskStatus::Unrecognized,
        }
    }

    /// Whether polling stops at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One parsed response from the result endpoint.
#[derive(Debug, Clone)]
pub struct PollObservation {
    pub status: String,
    pub progress: Option<f64>,
    pub error: Option<String>,
    pub raw: Value,
}

impl PollObservation {
    pub fn from_json(raw: Value) -> Self {
        let status = raw
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let progress = raw.get("progress").and_then(|v| v.as_f64());
        let error = ["error", "message"]
            .iter()
            .filter_map(|key| raw.get(*key))
            .filter_map(|v| v.as_str())
            .find(|s| !s.is_empty())
            .map(String::from);
        Self {
            status,
            progress,
            error,
            raw,
        }
    }

    pub fn task_status(&self) -> TaskStatus {
        TaskStatus::classify(&self.status)
    }
}

/// Where the finished image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation {
    /// A URL the image must be downloaded from.
    RemoteUrl(String),
    /// Image bytes that arrived inline, already base64-decoded.
    InlineEncoded(Vec<u8>),
}
