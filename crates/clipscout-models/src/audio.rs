//! Audio feature models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Features measured at one sampling step.
///
/// Only lives inside the extractor; the profile is what leaves it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    /// Position in the source (seconds)
    pub timestamp: f64,
    /// Root-mean-square amplitude (0-1)
    pub rms: f64,
    /// Per-bin energy in the 0-255 analyser domain
    pub frequency_bins: Vec<u8>,
    /// Mean energy of the speech band (0-255)
    pub speech_score: f64,
    /// Mean energy of the broadband music range (0-255)
    pub music_score: f64,
}

/// Loudness statistics over the whole track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VolumeStats {
    pub average: f64,
    pub peak: f64,
    /// Population standard deviation of RMS
    pub dynamic: f64,
}

/// Video-level audio summary shared with every provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioProfile {
    pub has_music: bool,
    /// Mean music-band energy normalized to 0-1
    pub music_intensity: f64,
    /// Fraction of samples carrying speech-band energy (0-1)
    pub speech_coverage: f64,
    /// Timestamps (seconds) of sudden loudness spikes, ascending
    pub emotional_peaks: Vec<f64>,
    pub volume: VolumeStats,
    /// Estimated beats per minute, only when music was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

impl AudioProfile {
    /// Profile for a silent or missing audio track.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn is_silent(&self) -> bool {
        self.volume.peak == 0.0
    }
}
