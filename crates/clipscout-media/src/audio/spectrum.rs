//! Windowed FFT magnitudes in the analyser byte domain.

use std::ops::RangeInclusive;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Decibel floor mapped to byte 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Decibel ceiling mapped to byte 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// Reusable FFT plan plus Blackman window for one window size.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    size: usize,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("size", &self.size)
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(size),
            window: blackman_window(size),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of frequency bins produced per window.
    pub fn bin_count(&self) -> usize {
        self.size / 2
    }

    /// Byte-domain magnitudes of `samples`, zero-padded to the window size.
    pub fn analyze(&self, samples: &[f32]) -> Vec<u8> {
        let mut buffer: Vec<Complex<f32>> = (0..self.size)
            .map(|i| {
                let s = samples.get(i).copied().unwrap_or(0.0);
                Complex::new(s * self.window[i], 0.0)
            })
            .collect();

        self.fft.process(&mut buffer);

        let scale = 1.0 / self.size as f32;
        buffer[..self.bin_count()]
            .iter()
            .map(|c| magnitude_to_byte(c.norm() * scale))
            .collect()
    }

    /// Inclusive bin indices whose centre frequency lies within `[low_hz, high_hz]`.
    pub fn bin_range(&self, low_hz: f64, high_hz: f64, sample_rate: u32) -> RangeInclusive<usize> {
        let hz_per_bin = sample_rate as f64 / self.size as f64;
        let last = self.bin_count().saturating_sub(1);
        let start = ((low_hz / hz_per_bin).ceil() as usize).min(last);
        let end = ((high_hz / hz_per_bin).floor() as usize).clamp(start, last);
        start..=end
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42f64, 0.5f64, 0.08f64);
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f64::consts::PI * i as f64 / n;
            (a0 - a1 * x.cos() + a2 * (2.0 * x).cos()) as f32
        })
        .collect()
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS) * 255.0;
    scaled.clamp(0.0, 255.0) as u8
}

/// Mean of `bins` over `range`.
pub fn band_energy(bins: &[u8], range: RangeInclusive<usize>) -> f64 {
    let band = match bins.get(range) {
        Some(band) if !band.is_empty() => band,
        _ => return 0.0,
    };
    band.iter().map(|&b| b as f64).sum::<f64>() / band.len() as f64
}
