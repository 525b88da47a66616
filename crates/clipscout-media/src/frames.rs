//! Evenly spaced still frames for provider analysis.
//!
//! Frames are taken at `i * duration / (count + 1)` for `i = 1..=count`, so
//! the first and last intervals (often black or mid-transition) are skipped.
//! Each still is resized to a fixed resolution with Lanczos resampling and
//! re-encoded as JPEG at a fixed quality.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};

use clipscout_models::{SampledFrame, ValidationError};

use crate::cancel::{is_cancelled, CancelReceiver};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Distance of the single retry seek from a failed timestamp.
pub const SEEK_RETRY_NUDGE_SECS: f64 = 0.05;

/// Output format shared by every sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            jpeg_quality: 85,
        }
    }
}

/// Something that can decode the picture shown at a timestamp.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Seek to `timestamp`, wait for the decoder, and return the frame as an
    /// encoded still in any format the `image` crate can read.
    async fn grab_frame(&self, timestamp: f64, cancel: &CancelReceiver) -> MediaResult<Vec<u8>>;
}

/// Frame source backed by one FFmpeg invocation per seek.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    timeout_secs: Option<u64>,
}

impl FfmpegFrameSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn grab_frame(&self, timestamp: f64, cancel: &CancelReceiver) -> MediaResult<Vec<u8>> {
        // PNG keeps the decoded frame lossless until our own resize/encode.
        let cmd = FfmpegCommand::to_stdout(&self.path)
            .seek(timestamp)
            .single_frame()
            .video_codec("png")
            .format("image2pipe");

        let mut runner = FfmpegRunner::new().with_cancel(cancel.clone());
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let bytes = runner.run_capture(&cmd).await?;
        if bytes.is_empty() {
            return Err(MediaError::InvalidVideo(format!(
                "no frame decoded at {:.3}s",
                timestamp
            )));
        }
        Ok(bytes)
    }
}

/// Samples a fixed number of frames from a source.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    spec: FrameSpec,
}

impl FrameSampler {
    pub fn new(spec: FrameSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    /// Timestamps strictly inside `(0, duration)`, evenly spaced.
    pub fn sample_timestamps(duration: f64, frame_count: usize) -> Vec<f64> {
        let interval = duration / (frame_count as f64 + 1.0);
        (1..=frame_count).map(|i| i as f64 * interval).collect()
    }

    /// Extract `frame_count` frames.
    ///
    /// Either every frame is returned or the job fails; a failed seek is
    /// retried once slightly offset before giving up.
    pub async fn sample(
        &self,
        source: &dyn FrameSource,
        duration: f64,
        frame_count: usize,
        cancel: &CancelReceiver,
    ) -> MediaResult<Vec<SampledFrame>> {
        if frame_count == 0 {
            return Err(ValidationError::ZeroFrameCount.into());
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ValidationError::InvalidVideoDuration(duration).into());
        }

        let interval = duration / (frame_count as f64 + 1.0);
        // Never nudge past a neighbouring slot, so ordering survives retries.
        let nudge = SEEK_RETRY_NUDGE_SECS.min(interval / 2.0);
        let mut frames = Vec::with_capacity(frame_count);

        for timestamp in Self::sample_timestamps(duration, frame_count) {
            if is_cancelled(cancel) {
                return Err(MediaError::Cancelled);
            }

            let (actual, raw) = self
                .grab_with_retry(source, timestamp, nudge, duration, cancel)
                .await?;

            let spec = self.spec;
            let image = tokio::task::spawn_blocking(move || render_still(&raw, &spec))
                .await
                .map_err(|e| MediaError::internal(format!("frame render task failed: {}", e)))?
                .map_err(|e| MediaError::frame_extraction(actual, e.to_string()))?;

            debug!(timestamp = actual, bytes = image.len(), "Sampled frame");
            frames.push(SampledFrame::new(actual, image));
        }

        Ok(frames)
    }

    async fn grab_with_retry(
        &self,
        source: &dyn FrameSource,
        timestamp: f64,
        nudge: f64,
        duration: f64,
        cancel: &CancelReceiver,
    ) -> MediaResult<(f64, Vec<u8>)> {
        match source.grab_frame(timestamp, cancel).await {
            Ok(bytes) => return Ok((timestamp, bytes)),
            Err(MediaError::Cancelled) => return Err(MediaError::Cancelled),
            Err(e) => {
                warn!(timestamp, error = %e, "Frame seek failed, retrying once");
            }
        }

        let retry_at = if timestamp + nudge < duration {
            timestamp + nudge
        } else {
            timestamp - nudge
        };

        match source.grab_frame(retry_at, cancel).await {
            Ok(bytes) => Ok((retry_at, bytes)),
            Err(MediaError::Cancelled) => Err(MediaError::Cancelled),
            Err(e) => Err(MediaError::frame_extraction(timestamp, e.to_string())),
        }
    }
}

/// Resize a decoded still to the target resolution and encode it as JPEG.
pub fn render_still(raw: &[u8], spec: &FrameSpec) -> MediaResult<Vec<u8>> {
    let decoded = image::load_from_memory(raw)?;
    let resized = decoded
        .resize_exact(spec.width, spec.height, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, spec.jpeg_quality);
    encoder.encode(
        resized.as_raw(),
        resized.width(),
        resized.height(),
        image::ColorType::Rgb8,
    )?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{cancel_channel, never_cancelled};
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn png_still() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 36, Rgb([200, 40, 40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    /// Fails on the listed timestamps (matched to the millisecond).
    struct FlakySource {
        failing: HashSet<i64>,
        calls: Mutex<Vec<f64>>,
    }

    impl FlakySource {
        fn new(failing: &[f64]) -> Self {
            Self {
                failing: failing.iter().map(|t| (t * 1000.0).round() as i64).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FrameSource for FlakySource {
        async fn grab_frame(&self, timestamp: f64, _cancel: &CancelReceiver) -> MediaResult<Vec<u8>> {
            self.calls.lock().unwrap().push(timestamp);
            if self.failing.contains(&((timestamp * 1000.0).round() as i64)) {
                return Err(MediaError::InvalidVideo("decoder error".into()));
            }
            Ok(png_still())
        }
    }

    fn small_sampler() -> FrameSampler {
        FrameSampler::new(FrameSpec {
            width: 32,
            height: 18,
            jpeg_quality: 80,
        })
    }

    #[test]
    fn test_sample_timestamps_strictly_inside() {
        for (duration, count) in [(10.0, 4), (1.0, 1), (3600.0, 24), (0.5, 9)] {
            let ts = FrameSampler::sample_timestamps(duration, count);
            assert_eq!(ts.len(), count);
            assert!(ts.windows(2).all(|w| w[0] < w[1]));
            assert!(ts.iter().all(|&t| t > 0.0 && t < duration));
        }
        assert_eq!(FrameSampler::sample_timestamps(10.0, 4), vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[tokio::test]
    async fn test_sample_renders_jpeg_at_target_size() {
        let source = FlakySource::new(&[]);
        let frames = small_sampler()
            .sample(&source, 10.0, 3, &never_cancelled())
            .await
            .unwrap();

        assert_eq!(frames.len(), 3);
        let decoded = image::load_from_memory(&frames[0].image).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 18));
        assert_eq!(&frames[0].image[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_failed_seek_retries_once_with_nudge() {
        let source = FlakySource::new(&[5.0]);
        let frames = small_sampler()
            .sample(&source, 10.0, 1, &never_cancelled())
            .await
            .unwrap();

        assert_eq!(frames.len(), 1);
        assert!((frames[0].timestamp - 5.05).abs() < 1e-9);
        assert_eq!(source.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_aborts_with_timestamp() {
        let source = FlakySource::new(&[5.0, 5.05]);
        let err = small_sampler()
            .sample(&source, 10.0, 1, &never_cancelled())
            .await
            .unwrap_err();

        match err {
            MediaError::FrameExtraction { timestamp, .. } => assert!((timestamp - 5.0).abs() < 1e-9),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_seek() {
        let (tx, rx) = cancel_channel();
        tx.send(true).unwrap();
        let source = FlakySource::new(&[]);

        let err = small_sampler().sample(&source, 10.0, 3, &rx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_frames_rejected() {
        let source = FlakySource::new(&[]);
        let err = small_sampler()
            .sample(&source, 10.0, 0, &never_cancelled())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Validation(ValidationError::ZeroFrameCount)));
    }
}
