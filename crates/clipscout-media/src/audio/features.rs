//! Fixed-step sampling of RMS and band energies.

use clipscout_models::AudioSample;

use super::decode::PcmAudio;
use super::spectrum::{band_energy, SpectrumAnalyzer};
use super::AudioConfig;
use crate::cancel::{is_cancelled, CancelReceiver};
use crate::error::{MediaError, MediaResult};

/// Speech band in Hz.
pub const SPEECH_BAND_HZ: (f64, f64) = (500.0, 2000.0);
/// Broadband music range in Hz.
pub const MUSIC_BAND_HZ: (f64, f64) = (250.0, 5000.0);

/// Sample `pcm` every `config.step` seconds over `duration`.
///
/// Produces `ceil(duration / step)` samples. Windows start at the sample
/// instant and are zero-padded past the end of the track.
pub fn extract_samples(
    pcm: &PcmAudio,
    config: &AudioConfig,
    duration: f64,
    cancel: &CancelReceiver,
) -> MediaResult<Vec<AudioSample>> {
    let analyzer = SpectrumAnalyzer::new(config.fft_size);
    let speech_bins = analyzer.bin_range(SPEECH_BAND_HZ.0, SPEECH_BAND_HZ.1, pcm.sample_rate);
    let music_bins = analyzer.bin_range(MUSIC_BAND_HZ.0, MUSIC_BAND_HZ.1, pcm.sample_rate);

    let count = (duration / config.step).ceil() as usize;
    let mut samples = Vec::with_capacity(count);

    for i in 0..count {
        if is_cancelled(cancel) {
            return Err(MediaError::Cancelled);
        }

        let timestamp = i as f64 * config.step;
        let window = window_at(&pcm.samples, pcm.sample_rate, timestamp, config.fft_size);

        let frequency_bins = analyzer.analyze(window);
        let speech_score = band_energy(&frequency_bins, speech_bins.clone());
        let music_score = band_energy(&frequency_bins, music_bins.clone());

        samples.push(AudioSample {
            timestamp,
            rms: rms(window, config.fft_size),
            frequency_bins,
            speech_score,
            music_score,
        });
    }

    Ok(samples)
}

fn window_at(samples: &[f32], sample_rate: u32, timestamp: f64, size: usize) -> &[f32] {
    let start = ((timestamp * sample_rate as f64).round() as usize).min(samples.len());
    let end = start.saturating_add(size).min(samples.len());
    &samples[start..end]
}

/// RMS over a window of `size` samples; missing samples count as silence.
fn rms(window: &[f32], size: usize) -> f64 {
    if size == 0 {
        return 0.0;
    }
    let sum: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / size as f64).sqrt().min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{cancel_channel, never_cancelled};

    fn config() -> AudioConfig {
        AudioConfig {
            step: 0.1,
            fft_size: 256,
            sample_rate: 8000,
        }
    }

    #[test]
    fn test_sample_count_rounds_up() {
        let pcm = PcmAudio::new(vec![0.0; 8000], 8000);
        let samples = extract_samples(&pcm, &config(), 1.05, &never_cancelled()).unwrap();
        assert_eq!(samples.len(), 11);
        assert!((samples[10].timestamp - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_signal_rms() {
        let pcm = PcmAudio::new(vec![0.5; 8000], 8000);
        let samples = extract_samples(&pcm, &config(), 0.5, &never_cancelled()).unwrap();
        assert!(samples.iter().all(|s| (s.rms - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_window_past_end_is_zero_padded() {
        let pcm = PcmAudio::new(vec![1.0; 128], 8000);
        let samples = extract_samples(&pcm, &config(), 0.15, &never_cancelled()).unwrap();
        // First window holds 128 of 256 samples; the second starts after the data.
        assert!((samples[0].rms - 0.5f64.sqrt()).abs() < 1e-6);
        assert_eq!(samples[1].rms, 0.0);
    }

    #[test]
    fn test_cancelled_extraction() {
        let (tx, rx) = cancel_channel();
        tx.send(true).unwrap();
        let pcm = PcmAudio::new(vec![0.1; 8000], 8000);
        assert!(extract_samples(&pcm, &config(), 1.0, &rx).unwrap_err().is_cancelled());
    }
}
