//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clipscout_media::{AudioConfig, FrameSpec};

use crate::consensus::ConsensusConfig;
use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deadline for a single provider call
    pub provider_timeout: Duration,
    /// Maximum provider calls in flight per job
    pub max_provider_parallel: usize,
    /// Frames sampled when the request does not say
    pub frame_count: usize,
    pub frame_width: u32,
    pub frame_height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Seconds between audio samples
    pub audio_step: f64,
    /// PCM decode rate in Hz
    pub audio_sample_rate: u32,
    /// Minimum overlap ratio for two candidates to share a cluster
    pub overlap_threshold: f64,
    /// Deadline for a single FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Work directory for spooled inputs
    pub work_dir: PathBuf,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(90),
            max_provider_parallel: 4,
            frame_count: 10,
            frame_width: 1280,
            frame_height: 720,
            jpeg_quality: 85,
            audio_step: 0.1,
            audio_sample_rate: 22050,
            overlap_threshold: 0.5,
            ffmpeg_timeout: Duration::from_secs(120),
            work_dir: PathBuf::from("/tmp/clipscout"),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider_timeout: Duration::from_secs(env_or(
                "CLIPSCOUT_PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout.as_secs(),
            )),
            max_provider_parallel: env_or(
                "CLIPSCOUT_MAX_PROVIDER_PARALLEL",
                defaults.max_provider_parallel,
            ),
            frame_count: env_or("CLIPSCOUT_FRAME_COUNT", defaults.frame_count),
            frame_width: env_or("CLIPSCOUT_FRAME_WIDTH", defaults.frame_width),
            frame_height: env_or("CLIPSCOUT_FRAME_HEIGHT", defaults.frame_height),
            jpeg_quality: env_or("CLIPSCOUT_JPEG_QUALITY", defaults.jpeg_quality),
            audio_step: env_or("CLIPSCOUT_AUDIO_STEP_SECS", defaults.audio_step),
            audio_sample_rate: env_or("CLIPSCOUT_AUDIO_SAMPLE_RATE", defaults.audio_sample_rate),
            overlap_threshold: env_or("CLIPSCOUT_OVERLAP_THRESHOLD", defaults.overlap_threshold),
            ffmpeg_timeout: Duration::from_secs(env_or(
                "CLIPSCOUT_FFMPEG_TIMEOUT_SECS",
                defaults.ffmpeg_timeout.as_secs(),
            )),
            work_dir: std::env::var("CLIPSCOUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            metrics_addr: std::env::var("METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.provider_timeout.is_zero() {
            return Err(WorkerError::config_error("provider timeout must be positive"));
        }
        if self.max_provider_parallel == 0 {
            return Err(WorkerError::config_error("max provider parallelism must be positive"));
        }
        if self.frame_count == 0 {
            return Err(WorkerError::config_error("frame count must be positive"));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(WorkerError::config_error("frame resolution must be non-zero"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(WorkerError::config_error("JPEG quality must be within 1-100"));
        }
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold <= 1.0) {
            return Err(WorkerError::config_error("overlap threshold must be within (0, 1]"));
        }
        self.audio_config()
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))
    }

    pub fn frame_spec(&self) -> FrameSpec {
        FrameSpec {
            width: self.frame_width,
            height: self.frame_height,
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            step: self.audio_step,
            sample_rate: self.audio_sample_rate,
            ..AudioConfig::default()
        }
    }

    pub fn consensus_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            overlap_threshold: self.overlap_threshold,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_spec(), FrameSpec::default());
        assert_eq!(config.audio_config(), AudioConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = WorkerConfig {
            max_provider_parallel: 0,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WorkerConfig {
            overlap_threshold: 1.5,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WorkerConfig {
            audio_step: -0.1,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
