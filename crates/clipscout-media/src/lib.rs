#![deny(unreachable_patterns)]
//! Signal analysis over a local video file.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with timeout and cancellation
//! - FFprobe probing into a [`VideoSource`](clipscout_models::VideoSource)
//! - Evenly spaced frame sampling rendered to JPEG
//! - Audio feature extraction (volume, band energies, peaks, tempo)
//! - Centered crop planning per target aspect ratio

pub mod audio;
pub mod cancel;
pub mod command;
pub mod crop;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod probe;

pub use audio::{AudioConfig, AudioFeatureExtractor, FfmpegPcmSource, PcmAudio, PcmSource};
pub use cancel::{cancel_channel, is_cancelled, never_cancelled, CancelReceiver};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use crop::CropPlanner;
pub use error::{MediaError, MediaResult};
pub use frames::{FfmpegFrameSource, FrameSampler, FrameSource, FrameSpec};
pub use fs_utils::spool_bytes;
pub use probe::{probe_source, probe_video, VideoInfo};
