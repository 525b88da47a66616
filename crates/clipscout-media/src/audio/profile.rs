//! Video-level audio profile derived from the sample sequence.
//!
//! Everything here is a pure function of the materialised samples.

use clipscout_models::{AudioProfile, AudioSample, VolumeStats};

/// Spike must exceed the previous sample by this factor.
const PEAK_RISE: f64 = 1.5;
/// ...and the next sample by this factor.
const PEAK_FALL: f64 = 1.2;
/// ...and the track average by this factor.
const PEAK_OVER_AVERAGE: f64 = 1.3;

const SPEECH_THRESHOLD: f64 = 0.7;
const MUSIC_THRESHOLD: f64 = 0.8;
/// Fraction of samples above the music threshold needed to call it music.
const MUSIC_MIN_COVERAGE: f64 = 0.3;

/// Autocorrelation lags searched for the beat period, in samples. At the
/// default 0.1s step this covers 1s to 10s periods, both ends included.
const TEMPO_LAGS: std::ops::RangeInclusive<usize> = 10..=100;

/// Build the profile for samples taken every `step` seconds.
pub fn build_profile(samples: &[AudioSample], step: f64) -> AudioProfile {
    let rms: Vec<f64> = samples.iter().map(|s| s.rms).collect();
    let volume = volume_stats(&rms);
    if volume.peak == 0.0 {
        return AudioProfile::silent();
    }

    let speech: Vec<f64> = samples.iter().map(|s| s.speech_score).collect();
    let music: Vec<f64> = samples.iter().map(|s| s.music_score).collect();

    let (has_music, music_intensity) = detect_music(&music);
    let tempo = if has_music {
        estimate_tempo(&music, step)
    } else {
        None
    };

    AudioProfile {
        has_music,
        music_intensity,
        speech_coverage: speech_coverage(&speech),
        emotional_peaks: detect_emotional_peaks(&rms, volume.average, step),
        volume,
        tempo,
    }
}

/// Average and peak over audible samples; dynamic over all of them.
pub fn volume_stats(rms: &[f64]) -> VolumeStats {
    let audible: Vec<f64> = rms.iter().copied().filter(|&r| r > 0.0).collect();
    if audible.is_empty() {
        return VolumeStats::default();
    }

    let average = mean(&audible);
    let peak = audible.iter().copied().fold(0.0, f64::max);

    let all_mean = mean(rms);
    let variance = rms.iter().map(|r| (r - all_mean).powi(2)).sum::<f64>() / rms.len() as f64;

    VolumeStats {
        average,
        peak,
        dynamic: variance.sqrt(),
    }
}

/// Timestamps of sudden loudness spikes, ascending.
pub fn detect_emotional_peaks(rms: &[f64], average: f64, step: f64) -> Vec<f64> {
    if rms.len() < 3 {
        return Vec::new();
    }

    (1..rms.len() - 1)
        .filter(|&i| {
            rms[i] > PEAK_RISE * rms[i - 1]
                && rms[i] > PEAK_FALL * rms[i + 1]
                && rms[i] > PEAK_OVER_AVERAGE * average
        })
        .map(|i| i as f64 * step)
        .collect()
}

/// Fraction of samples strictly above 70% of the mean speech energy.
pub fn speech_coverage(speech: &[f64]) -> f64 {
    if speech.is_empty() {
        return 0.0;
    }
    let threshold = SPEECH_THRESHOLD * mean(speech);
    let above = speech.iter().filter(|&&s| s > threshold).count();
    above as f64 / speech.len() as f64
}

/// Returns `(has_music, music_intensity)`.
pub fn detect_music(music: &[f64]) -> (bool, f64) {
    if music.is_empty() {
        return (false, 0.0);
    }
    let average = mean(music);
    let threshold = MUSIC_THRESHOLD * average;
    let above = music.iter().filter(|&&m| m > threshold).count();

    let has_music = above as f64 > MUSIC_MIN_COVERAGE * music.len() as f64;
    (has_music, (average / 255.0).clamp(0.0, 1.0))
}

/// Beats per minute from the strongest autocorrelation lag.
///
/// Ties keep the shortest lag. `None` when no lag correlates positively.
pub fn estimate_tempo(music: &[f64], step: f64) -> Option<f64> {
    let mut best: Option<(usize, f64)> = None;

    for lag in TEMPO_LAGS {
        if lag >= music.len() {
            break;
        }
        let correlation: f64 = music[..music.len() - lag]
            .iter()
            .zip(&music[lag..])
            .map(|(a, b)| a * b)
            .sum();

        if correlation > best.map_or(0.0, |(_, c)| c) {
            best = Some((lag, correlation));
        }
    }

    best.map(|(lag, _)| 60.0 / (lag as f64 * step))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
