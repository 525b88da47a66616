//! Video source and sampled frame models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{ValidationError, ValidationResult};

/// Immutable description of the analysed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoSource {
    /// Local file the decoders read from
    pub path: PathBuf,

    /// Duration in seconds
    pub duration: f64,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Whether the container carries an audio stream
    #[serde(default = "default_has_audio")]
    pub has_audio: bool,
}

fn default_has_audio() -> bool {
    true
}

impl VideoSource {
    pub fn new(path: impl Into<PathBuf>, duration: f64, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            duration,
            width,
            height,
            has_audio: true,
        }
    }

    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    /// Check duration and dimensions before any decoding starts.
    pub fn validate(&self) -> ValidationResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::InvalidVideoDuration(self.duration));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// A still frame taken at a known timestamp.
#[derive(Clone, PartialEq)]
pub struct SampledFrame {
    /// Position in the source video (seconds)
    pub timestamp: f64,

    /// JPEG-encoded still
    pub image: Vec<u8>,
}

impl SampledFrame {
    pub fn new(timestamp: f64, image: Vec<u8>) -> Self {
        Self { timestamp, image }
    }
}

impl fmt::Debug for SampledFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampledFrame")
            .field("timestamp", &self.timestamp)
            .field("image_bytes", &self.image.len())
            .finish()
    }
}
