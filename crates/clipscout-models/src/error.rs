//! Validation errors for analysis inputs.

use thiserror::Error;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Malformed input rejected before any analysis work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Minimum duration ({min:.1}s) exceeds maximum duration ({max:.1}s)")]
    DurationBoundsInverted { min: f64, max: f64 },

    #[error("Duration bound must be a positive number, got {0}")]
    InvalidDurationBound(f64),

    #[error("Frame count must be at least 1")]
    ZeroFrameCount,

    #[error("Video duration must be positive, got {0}")]
    InvalidVideoDuration(f64),

    #[error("Video dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("No analysis providers configured")]
    NoProviders,

    #[error("Invalid setting {field}: {message}")]
    InvalidSetting { field: &'static str, message: String },
}

impl ValidationError {
    /// Create an invalid setting error.
    pub fn invalid_setting(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            message: message.into(),
        }
    }
}
