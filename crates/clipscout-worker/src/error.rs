//! Worker error types.

use thiserror::Error;

use clipscout_media::MediaError;
use clipscout_models::ValidationError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Fatal job errors.
///
/// Provider failures are not here: they are recovered per provider and
/// reported on the output instead.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Frame extraction failed at {timestamp:.3}s: {message}")]
    FrameExtraction { timestamp: f64, message: String },

    #[error("Audio analysis failed: {0}")]
    AudioAnalysis(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Cancelled)
    }

    /// Validation failures are raised before any decoding starts.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkerError::Validation(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::Validation(_) => "validation",
            WorkerError::FrameExtraction { .. } => "frame_extraction",
            WorkerError::AudioAnalysis(_) => "audio_analysis",
            WorkerError::Cancelled => "cancelled",
            WorkerError::Media(_) => "media",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Io(_) => "io",
        }
    }
}

impl From<MediaError> for WorkerError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Cancelled => WorkerError::Cancelled,
            MediaError::Validation(e) => WorkerError::Validation(e),
            MediaError::FrameExtraction { timestamp, message } => {
                WorkerError::FrameExtraction { timestamp, message }
            }
            MediaError::AudioAnalysis(message) => WorkerError::AudioAnalysis(message),
            other => WorkerError::Media(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_map_to_job_errors() {
        assert!(WorkerError::from(MediaError::Cancelled).is_cancelled());
        assert!(WorkerError::from(MediaError::from(ValidationError::ZeroFrameCount)).is_validation());

        match WorkerError::from(MediaError::frame_extraction(4.5, "decoder error")) {
            WorkerError::FrameExtraction { timestamp, .. } => assert_eq!(timestamp, 4.5),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            WorkerError::from(MediaError::FfmpegNotFound),
            WorkerError::Media(MediaError::FfmpegNotFound)
        ));
    }

    #[test]
    fn test_kind_labels_follow_taxonomy() {
        assert_eq!(WorkerError::Cancelled.kind(), "cancelled");
        assert_eq!(
            WorkerError::from(MediaError::frame_extraction(1.0, "eof")).kind(),
            "frame_extraction"
        );
        assert_eq!(WorkerError::AudioAnalysis("bad pcm".into()).kind(), "audio_analysis");
    }
}
