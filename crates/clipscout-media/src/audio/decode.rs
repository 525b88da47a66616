//! PCM decoding of the audio track.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::cancel::CancelReceiver;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Mono PCM samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decoded length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Something that can hand over the whole audio track as mono PCM.
#[async_trait]
pub trait PcmSource: Send + Sync {
    /// Decode the track. `Ok(None)` means the source has no audio at all.
    async fn read_pcm(&self, cancel: &CancelReceiver) -> MediaResult<Option<PcmAudio>>;
}

/// Decodes through FFmpeg to raw 32-bit float little-endian on stdout.
#[derive(Debug, Clone)]
pub struct FfmpegPcmSource {
    path: PathBuf,
    sample_rate: u32,
    has_audio: bool,
    timeout_secs: Option<u64>,
}

impl FfmpegPcmSource {
    pub fn new(path: impl AsRef<Path>, sample_rate: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sample_rate,
            has_audio: true,
            timeout_secs: None,
        }
    }

    /// Mark whether the container carries an audio stream at all.
    pub fn with_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl PcmSource for FfmpegPcmSource {
    async fn read_pcm(&self, cancel: &CancelReceiver) -> MediaResult<Option<PcmAudio>> {
        if !self.has_audio {
            debug!(path = %self.path.display(), "No audio stream, skipping decode");
            return Ok(None);
        }

        let cmd = FfmpegCommand::to_stdout(&self.path)
            .no_video()
            .audio_layout(1, self.sample_rate)
            .format("f32le");

        let mut runner = FfmpegRunner::new().with_cancel(cancel.clone());
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let bytes = runner.run_capture(&cmd).await.map_err(|e| match e {
            MediaError::Cancelled => MediaError::Cancelled,
            other => MediaError::audio_analysis(other.to_string()),
        })?;

        let samples = decode_f32le(&bytes);
        debug!(
            path = %self.path.display(),
            samples = samples.len(),
            sample_rate = self.sample_rate,
            "Decoded audio track"
        );

        Ok(Some(PcmAudio::new(samples, self.sample_rate)))
    }
}

/// Convert raw f32le bytes to samples, ignoring a trailing partial sample.
pub fn decode_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::never_cancelled;

    #[test]
    fn test_decode_f32le() {
        let mut bytes = Vec::new();
        for v in [0.5f32, -0.25, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(0xAB);

        assert_eq!(decode_f32le(&bytes), vec![0.5, -0.25, 1.0]);
        assert!(decode_f32le(&[]).is_empty());
    }

    #[test]
    fn test_pcm_duration() {
        assert!((PcmAudio::new(vec![0.0; 22050], 22050).duration() - 1.0).abs() < 1e-12);
        assert_eq!(PcmAudio::new(vec![0.0; 10], 0).duration(), 0.0);
    }

    #[test]
    fn test_source_without_audio_skips_decode() {
        let source = FfmpegPcmSource::new("missing.mp4", 22050).with_audio(false);
        let pcm = tokio_test::block_on(source.read_pcm(&never_cancelled()));
        assert!(tokio_test::assert_ok!(pcm).is_none());
    }
}
