//! Clip candidate and consensus models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::rect::CropRegions;

/// Upper bound of every score axis.
pub const MAX_SCORE: u8 = 100;

/// Multi-axis virality score, each axis in 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ViralScore {
    pub overall: u8,
    pub engagement: u8,
    pub shareability: u8,
    pub retention: u8,
    pub trend: u8,
}

impl ViralScore {
    pub fn new(overall: u8, engagement: u8, shareability: u8, retention: u8, trend: u8) -> Self {
        Self {
            overall,
            engagement,
            shareability,
            retention,
            trend,
        }
    }

    /// Same value on every axis.
    pub fn uniform(value: u8) -> Self {
        Self::new(value, value, value, value, value)
    }

    /// Axis values in declaration order.
    pub fn axes(&self) -> [u8; 5] {
        [
            self.overall,
            self.engagement,
            self.shareability,
            self.retention,
            self.trend,
        ]
    }

    pub fn from_axes(axes: [u8; 5]) -> Self {
        let [overall, engagement, shareability, retention, trend] = axes;
        Self::new(overall, engagement, shareability, retention, trend)
    }

    /// Clamp a raw provider value into the score domain.
    pub fn clamp_axis(value: f64) -> u8 {
        value.round().clamp(0.0, MAX_SCORE as f64) as u8
    }
}

/// One provider's opinion about a clip-worthy moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipCandidate {
    pub provider_id: String,
    pub title: String,
    pub reason: String,
    /// Start of the clip (seconds)
    pub start_time: f64,
    /// End of the clip (seconds)
    pub end_time: f64,
    pub viral_score: ViralScore,
    pub score_explanation: String,
}

impl ClipCandidate {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Consensus over a cluster of candidates pointing at the same moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedClip {
    /// Earliest start among cluster members
    pub start_time: f64,
    /// Latest end among cluster members
    pub end_time: f64,
    pub title: String,
    pub reason: String,
    pub score_explanation: String,
    /// Providers that proposed this moment
    pub recommended_by: BTreeSet<String>,
    /// Each provider's own proposal, verbatim
    pub variations: BTreeMap<String, ClipCandidate>,
    pub aggregated_viral_score: ViralScore,
    /// Share of invoked providers that agree, 0-100
    pub confidence_score: f64,
    /// Crop rectangles keyed by aspect ratio tag
    pub crop_regions: CropRegions,
}

impl AggregatedClip {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Final result of one analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusOutput {
    pub clips: Vec<AggregatedClip>,
    /// Mean confidence across emitted clips, 0 when none
    pub consensus_score: f64,
    pub providers_invoked: usize,
    #[serde(default)]
    pub failed_providers: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ConsensusOutput {
    pub fn new(clips: Vec<AggregatedClip>, providers_invoked: usize) -> Self {
        let consensus_score = if clips.is_empty() {
            0.0
        } else {
            clips.iter().map(|c| c.confidence_score).sum::<f64>() / clips.len() as f64
        };

        Self {
            clips,
            consensus_score,
            providers_invoked,
            failed_providers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_axis() {
        assert_eq!(ViralScore::clamp_axis(-4.0), 0);
        assert_eq!(ViralScore::clamp_axis(87.6), 88);
        assert_eq!(ViralScore::clamp_axis(140.0), 100);
    }

    #[test]
    fn test_empty_output_has_zero_consensus() {
        let output = ConsensusOutput::new(Vec::new(), 3);
        assert!(output.is_empty());
        assert_eq!(output.consensus_score, 0.0);
    }

    #[test]
    fn test_candidate_serializes_camel_case() {
        let candidate = ClipCandidate {
            provider_id: "gemini".into(),
            title: "Hook".into(),
            reason: "Big laugh".into(),
            start_time: 1.0,
            end_time: 21.0,
            viral_score: ViralScore::uniform(70),
            score_explanation: String::new(),
        };
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["providerId"], "gemini");
        assert_eq!(json["viralScore"]["overall"], 70);
        assert_eq!(candidate.duration(), 20.0);
    }
}
