//! Raw provider proposals and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use clipscout_models::{parse_timestamp, ClipCandidate, DurationBounds, ViralScore};

/// A time as a provider sends it: seconds, or a clock string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    /// `HH:MM:SS(.mmm)`, `MM:SS` or `SS`
    Timestamp(String),
}

impl TimeValue {
    pub fn to_seconds(&self) -> Option<f64> {
        match self {
            TimeValue::Seconds(s) if s.is_finite() => Some(*s),
            TimeValue::Seconds(_) => None,
            TimeValue::Timestamp(ts) => parse_timestamp(ts).ok(),
        }
    }
}

impl From<f64> for TimeValue {
    fn from(seconds: f64) -> Self {
        TimeValue::Seconds(seconds)
    }
}

/// Score axes as sent; any may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawViralScore {
    pub overall: Option<f64>,
    pub engagement: Option<f64>,
    pub shareability: Option<f64>,
    pub retention: Option<f64>,
    pub trend: Option<f64>,
}

impl RawViralScore {
    pub fn uniform(value: f64) -> Self {
        Self {
            overall: Some(value),
            engagement: Some(value),
            shareability: Some(value),
            retention: Some(value),
            trend: Some(value),
        }
    }

    /// Clamp every axis into 0-100, or name the first missing one.
    fn resolve(&self) -> Result<ViralScore, RejectionReason> {
        let axis = |name: &'static str, value: Option<f64>| match value {
            Some(v) if v.is_finite() => Ok(ViralScore::clamp_axis(v)),
            _ => Err(RejectionReason::MissingScore(name)),
        };

        Ok(ViralScore::new(
            axis("overall", self.overall)?,
            axis("engagement", self.engagement)?,
            axis("shareability", self.shareability)?,
            axis("retention", self.retention)?,
            axis("trend", self.trend)?,
        ))
    }
}

/// One proposal exactly as the provider returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(alias = "start")]
    pub start_time: TimeValue,
    #[serde(alias = "end")]
    pub end_time: TimeValue,
    #[serde(default)]
    pub viral_score: RawViralScore,
    #[serde(default)]
    pub score_explanation: String,
}

impl RawCandidate {
    pub fn new(start: impl Into<TimeValue>, end: impl Into<TimeValue>, score: RawViralScore) -> Self {
        Self {
            title: String::new(),
            reason: String::new(),
            start_time: start.into(),
            end_time: end.into(),
            viral_score: score,
            score_explanation: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Why a raw proposal was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionReason {
    #[error("unparseable {0} time")]
    UnparseableTime(&'static str),

    #[error("times {start:.3}-{end:.3}s fall outside the video (0-{duration:.3}s)")]
    OutOfRange { start: f64, end: f64, duration: f64 },

    #[error("end {end:.3}s is not after start {start:.3}s")]
    NonPositiveLength { start: f64, end: f64 },

    #[error("length {length:.3}s outside {min:.1}-{max:.1}s")]
    DurationOutOfBounds { length: f64, min: f64, max: f64 },

    #[error("missing {0} score")]
    MissingScore(&'static str),
}

impl RejectionReason {
    /// Short label for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::UnparseableTime(_) => "unparseable_time",
            RejectionReason::OutOfRange { .. } => "out_of_range",
            RejectionReason::NonPositiveLength { .. } => "non_positive_length",
            RejectionReason::DurationOutOfBounds { .. } => "duration_out_of_bounds",
            RejectionReason::MissingScore(_) => "missing_score",
        }
    }
}

/// Validate one raw proposal against the video and the requested window.
pub fn validate_candidate(
    provider_id: &str,
    raw: &RawCandidate,
    video_duration: f64,
    bounds: &DurationBounds,
) -> Result<ClipCandidate, RejectionReason> {
    let start = raw
        .start_time
        .to_seconds()
        .ok_or(RejectionReason::UnparseableTime("start"))?;
    let end = raw
        .end_time
        .to_seconds()
        .ok_or(RejectionReason::UnparseableTime("end"))?;

    if start < 0.0 || end < 0.0 || start > video_duration || end > video_duration {
        return Err(RejectionReason::OutOfRange {
            start,
            end,
            duration: video_duration,
        });
    }
    if end <= start {
        return Err(RejectionReason::NonPositiveLength { start, end });
    }

    let length = end - start;
    if !bounds.contains(length) {
        return Err(RejectionReason::DurationOutOfBounds {
            length,
            min: bounds.min,
            max: bounds.max,
        });
    }

    let viral_score = raw.viral_score.resolve()?;

    Ok(ClipCandidate {
        provider_id: provider_id.to_string(),
        title: raw.title.clone(),
        reason: raw.reason.clone(),
        start_time: start,
        end_time: end,
        viral_score,
        score_explanation: raw.score_explanation.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: DurationBounds = DurationBounds::new(5.0, 60.0);

    #[test]
    fn test_accepts_seconds_and_clock_strings() {
        let json = r#"{"title": "Hook", "startTime": "00:01:05.5", "endTime": 80,
                       "viralScore": {"overall": 88.4, "engagement": 120, "shareability": -3,
                                      "retention": 70, "trend": 50}}"#;
        let raw: RawCandidate = serde_json::from_str(json).unwrap();
        let candidate = validate_candidate("gemini", &raw, 300.0, &BOUNDS).unwrap();

        assert_eq!(candidate.provider_id, "gemini");
        assert_eq!(candidate.start_time, 65.5);
        assert_eq!(candidate.end_time, 80.0);
        assert_eq!(candidate.viral_score, ViralScore::new(88, 100, 0, 70, 50));
    }

    #[test]
    fn test_rejects_times_outside_video() {
        let raw = RawCandidate::new(90.0, 110.0, RawViralScore::uniform(50.0));
        assert!(matches!(
            validate_candidate("p", &raw, 100.0, &BOUNDS),
            Err(RejectionReason::OutOfRange { .. })
        ));

        let raw = RawCandidate::new(-1.0, 10.0, RawViralScore::uniform(50.0));
        assert!(validate_candidate("p", &raw, 100.0, &BOUNDS).is_err());
    }

    #[test]
    fn test_rejects_reversed_and_empty_ranges() {
        let raw = RawCandidate::new(20.0, 20.0, RawViralScore::uniform(50.0));
        assert_eq!(
            validate_candidate("p", &raw, 100.0, &BOUNDS).unwrap_err().as_str(),
            "non_positive_length"
        );
    }

    #[test]
    fn test_rejects_length_outside_bounds() {
        let raw = RawCandidate::new(0.0, 3.0, RawViralScore::uniform(50.0));
        assert_eq!(
            validate_candidate("p", &raw, 100.0, &BOUNDS).unwrap_err().as_str(),
            "duration_out_of_bounds"
        );
    }

    #[test]
    fn test_rejects_missing_score_axis() {
        let mut score = RawViralScore::uniform(50.0);
        score.trend = None;
        let raw = RawCandidate::new(0.0, 10.0, score);
        assert_eq!(
            validate_candidate("p", &raw, 100.0, &BOUNDS),
            Err(RejectionReason::MissingScore("trend"))
        );
    }

    #[test]
    fn test_rejects_garbled_timestamp() {
        let raw = RawCandidate::new(TimeValue::Timestamp("soon".into()), 10.0, RawViralScore::uniform(50.0));
        assert_eq!(
            validate_candidate("p", &raw, 100.0, &BOUNDS),
            Err(RejectionReason::UnparseableTime("start"))
        );
    }
}
