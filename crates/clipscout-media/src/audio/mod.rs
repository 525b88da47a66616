//! Audio feature extraction.
//!
//! The track is decoded once to mono PCM, sampled at a fixed step
//! ([`features`]), and summarised into an [`AudioProfile`] ([`profile`]).

pub mod decode;
pub mod features;
pub mod profile;
pub mod spectrum;

pub use decode::{FfmpegPcmSource, PcmAudio, PcmSource};
pub use features::extract_samples;
pub use profile::build_profile;
pub use spectrum::SpectrumAnalyzer;

use tracing::{debug, info};

use clipscout_models::{AudioProfile, ValidationError};

use crate::cancel::{is_cancelled, CancelReceiver};
use crate::error::{MediaError, MediaResult};

/// Sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Seconds between samples
    pub step: f64,
    /// FFT window length in samples
    pub fft_size: usize,
    /// Decode rate in Hz
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            step: 0.1,
            fft_size: 2048,
            sample_rate: 22050,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ValidationError::invalid_setting(
                "audio_step",
                format!("must be positive, got {}", self.step),
            ));
        }
        if self.fft_size < 2 {
            return Err(ValidationError::invalid_setting(
                "fft_size",
                format!("must be at least 2, got {}", self.fft_size),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ValidationError::invalid_setting("sample_rate", "must be positive"));
        }
        Ok(())
    }
}

/// Turns an audio track into an [`AudioProfile`].
#[derive(Debug, Clone, Default)]
pub struct AudioFeatureExtractor {
    config: AudioConfig,
}

impl AudioFeatureExtractor {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Decode `source` and profile the first `duration` seconds.
    ///
    /// Missing or silent audio yields [`AudioProfile::silent`].
    pub async fn extract(
        &self,
        source: &dyn PcmSource,
        duration: f64,
        cancel: &CancelReceiver,
    ) -> MediaResult<AudioProfile> {
        self.config.validate()?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ValidationError::InvalidVideoDuration(duration).into());
        }

        let pcm = match source.read_pcm(cancel).await? {
            Some(pcm) if !pcm.samples.is_empty() => pcm,
            _ => {
                debug!("No audio samples, using silent profile");
                return Ok(AudioProfile::silent());
            }
        };

        if is_cancelled(cancel) {
            return Err(MediaError::Cancelled);
        }

        let config = self.config.clone();
        let cancel = cancel.clone();
        let profile = tokio::task::spawn_blocking(move || -> MediaResult<AudioProfile> {
            let samples = extract_samples(&pcm, &config, duration, &cancel)?;
            Ok(build_profile(&samples, config.step))
        })
        .await
        .map_err(|e| MediaError::audio_analysis(format!("audio task failed: {}", e)))??;

        info!(
            has_music = profile.has_music,
            speech_coverage = profile.speech_coverage,
            peaks = profile.emotional_peaks.len(),
            tempo = ?profile.tempo,
            "Audio profile ready"
        );

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::never_cancelled;
    use async_trait::async_trait;

    struct FixedPcm(Option<PcmAudio>);

    #[async_trait]
    impl PcmSource for FixedPcm {
        async fn read_pcm(&self, _cancel: &CancelReceiver) -> MediaResult<Option<PcmAudio>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPcm;

    #[async_trait]
    impl PcmSource for BrokenPcm {
        async fn read_pcm(&self, _cancel: &CancelReceiver) -> MediaResult<Option<PcmAudio>> {
            Err(MediaError::audio_analysis("corrupt stream"))
        }
    }

    fn test_extractor() -> AudioFeatureExtractor {
        AudioFeatureExtractor::new(AudioConfig {
            step: 0.1,
            fft_size: 256,
            sample_rate: 8000,
        })
    }

    #[tokio::test]
    async fn test_missing_audio_is_silent_profile() {
        let profile = test_extractor()
            .extract(&FixedPcm(None), 5.0, &never_cancelled())
            .await
            .unwrap();
        assert_eq!(profile, AudioProfile::silent());
    }

    #[tokio::test]
    async fn test_zero_samples_are_silent_profile() {
        let pcm = PcmAudio::new(vec![0.0; 8000 * 2], 8000);
        let profile = test_extractor()
            .extract(&FixedPcm(Some(pcm)), 2.0, &never_cancelled())
            .await
            .unwrap();
        assert!(profile.is_silent());
        assert!(!profile.has_music);
        assert!(profile.tempo.is_none());
    }

    #[tokio::test]
    async fn test_tone_produces_audible_profile() {
        let samples: Vec<f32> = (0..8000 * 3)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 8000.0).sin())
            .collect();
        let profile = test_extractor()
            .extract(&FixedPcm(Some(PcmAudio::new(samples, 8000))), 3.0, &never_cancelled())
            .await
            .unwrap();

        assert!(profile.volume.peak > 0.3);
        assert!(profile.volume.dynamic < 1e-3);
        assert!(profile.emotional_peaks.is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_propagates() {
        let err = test_extractor()
            .extract(&BrokenPcm, 2.0, &never_cancelled())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::AudioAnalysis(_)));
    }

    #[test]
    fn test_config_validation() {
        assert!(AudioConfig::default().validate().is_ok());
        let bad = AudioConfig {
            step: 0.0,
            ..AudioConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
