//! Shared data models for the ClipScout analysis core.
//!
//! This crate provides Serde-serializable types for:
//! - Video sources and sampled frames
//! - Audio samples and the per-video audio profile
//! - Crop regions and target aspect ratios
//! - Provider clip candidates and aggregated consensus clips
//! - Analysis settings and their validation

pub mod audio;
pub mod clip;
pub mod error;
pub mod job;
pub mod rect;
pub mod settings;
pub mod style;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use audio::{AudioProfile, AudioSample, VolumeStats};
pub use clip::{AggregatedClip, ClipCandidate, ConsensusOutput, ViralScore};
pub use error::{ValidationError, ValidationResult};
pub use job::JobId;
pub use rect::{CropRegion, CropRegions};
pub use settings::{AnalysisSettings, ContentType, DurationBounds, Platform};
pub use style::{AspectRatio, AspectRatioParseError};
pub use timestamp::{parse_timestamp, TimestampError};
pub use video::{SampledFrame, VideoSource};
