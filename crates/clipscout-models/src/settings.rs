//! Analysis settings supplied by the caller.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::style::AspectRatio;

/// Kind of content the caller is hunting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Funny,
    Educational,
    Emotional,
    Inspirational,
    Controversial,
    Dramatic,
    Surprising,
    Gaming,
    Music,
    #[serde(other)]
    Other,
}

/// Publishing platform; implies duration bounds and a target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Tiktok,
    InstagramReels,
    InstagramFeed,
    YoutubeShorts,
    Youtube,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::InstagramReels => "instagram_reels",
            Platform::InstagramFeed => "instagram_feed",
            Platform::YoutubeShorts => "youtube_shorts",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
        }
    }

    /// Clip length the platform favours, in seconds.
    pub fn default_bounds(&self) -> DurationBounds {
        match self {
            Platform::Tiktok => DurationBounds::new(15.0, 60.0),
            Platform::InstagramReels => DurationBounds::new(15.0, 90.0),
            Platform::InstagramFeed => DurationBounds::new(15.0, 60.0),
            Platform::YoutubeShorts => DurationBounds::new(15.0, 60.0),
            Platform::Youtube => DurationBounds::new(30.0, 180.0),
            Platform::Twitter => DurationBounds::new(10.0, 140.0),
        }
    }

    pub fn target_aspect(&self) -> AspectRatio {
        match self {
            Platform::Tiktok | Platform::InstagramReels | Platform::YoutubeShorts => {
                AspectRatio::PORTRAIT
            }
            Platform::InstagramFeed => AspectRatio::SQUARE,
            Platform::Youtube | Platform::Twitter => AspectRatio::LANDSCAPE,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tiktok" => Ok(Platform::Tiktok),
            "instagram_reels" | "reels" => Ok(Platform::InstagramReels),
            "instagram_feed" | "instagram" => Ok(Platform::InstagramFeed),
            "youtube_shorts" | "shorts" => Ok(Platform::YoutubeShorts),
            "youtube" => Ok(Platform::Youtube),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(ValidationError::invalid_setting(
                "platform",
                format!("unknown platform '{}'", other),
            )),
        }
    }
}

/// Inclusive clip length window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DurationBounds {
    pub min: f64,
    pub max: f64,
}

impl DurationBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, duration: f64) -> bool {
        duration >= self.min && duration <= self.max
    }
}

/// Caller settings for one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    #[serde(default)]
    pub content_types: BTreeSet<ContentType>,

    #[serde(default)]
    pub platform: Platform,

    /// Overrides the platform minimum when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<f64>,

    /// Overrides the platform maximum when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,

    /// When false, audio analysis is skipped and providers get no profile
    #[serde(default = "default_include_audio")]
    pub include_audio: bool,

    /// Frames sampled for providers; the worker default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
}

fn default_include_audio() -> bool {
    true
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            content_types: BTreeSet::new(),
            platform: Platform::default(),
            min_duration: None,
            max_duration: None,
            include_audio: true,
            frame_count: None,
        }
    }
}

impl AnalysisSettings {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, min: f64, max: f64) -> Self {
        self.min_duration = Some(min);
        self.max_duration = Some(max);
        self
    }

    pub fn with_audio(mut self, include_audio: bool) -> Self {
        self.include_audio = include_audio;
        self
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = Some(frame_count);
        self
    }

    pub fn target_aspect(&self) -> AspectRatio {
        self.platform.target_aspect()
    }

    /// Resolve the effective duration window, falling back to platform defaults.
    pub fn duration_bounds(&self) -> DurationBounds {
        let defaults = self.platform.default_bounds();
        DurationBounds::new(
            self.min_duration.unwrap_or(defaults.min),
            self.max_duration.unwrap_or(defaults.max),
        )
    }

    /// Validate the settings and return the effective duration window.
    pub fn validate(&self) -> ValidationResult<DurationBounds> {
        if self.frame_count == Some(0) {
            return Err(ValidationError::ZeroFrameCount);
        }

        for bound in [self.min_duration, self.max_duration].into_iter().flatten() {
            if !bound.is_finite() || bound <= 0.0 {
                return Err(ValidationError::InvalidDurationBound(bound));
            }
        }

        let bounds = self.duration_bounds();
        if bounds.min > bounds.max {
            return Err(ValidationError::DurationBoundsInverted {
                min: bounds.min,
                max: bounds.max,
            });
        }
        Ok(bounds)
    }
}
