//! Structured job logging.
//!
//! Every event carries the job id and the pipeline stage that emitted it, so
//! a single analysis can be followed through the log stream.

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn, Span};

use clipscout_models::timestamp::format_seconds;
use clipscout_models::{AudioProfile, ConsensusOutput, JobId, VideoSource};

use crate::error::WorkerError;
use crate::provider::RejectionReason;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sampling,
    Audio,
    Providers,
    Aggregation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sampling => "sampling",
            Stage::Audio => "audio",
            Stage::Providers => "providers",
            Stage::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a provider was left out of the consensus.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderFailure {
    /// The adapter returned an error (or its task panicked).
    Error(String),
    /// No answer within the per-provider deadline.
    Timeout(Duration),
}

impl ProviderFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderFailure::Error(_) => "error",
            ProviderFailure::Timeout(_) => "timeout",
        }
    }

    /// Caller-visible warning for the job output.
    pub fn warning(&self, provider_id: &str) -> String {
        match self {
            ProviderFailure::Error(message) => format!("Provider {} failed: {}", provider_id, message),
            ProviderFailure::Timeout(_) => format!("Provider {} {}", provider_id, self),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::Error(message) => f.write_str(message),
            ProviderFailure::Timeout(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
        }
    }
}

/// Job-scoped logger for one analysis.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping the whole analysis.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("analysis", job_id = %self.job_id)
    }

    pub fn log_start(&self, source: &VideoSource, frame_count: usize, providers: usize) {
        info!(
            job_id = %self.job_id,
            duration = %format_seconds(source.duration),
            width = source.width,
            height = source.height,
            has_audio = source.has_audio,
            frame_count,
            providers,
            "Analysis started"
        );
    }

    pub fn log_frames_sampled(&self, frames: usize) {
        info!(
            job_id = %self.job_id,
            stage = %Stage::Sampling,
            frames,
            "Frames sampled"
        );
    }

    /// `None` when audio analysis was switched off for the request.
    pub fn log_audio_profile(&self, profile: Option<&AudioProfile>) {
        match profile {
            Some(profile) => info!(
                job_id = %self.job_id,
                stage = %Stage::Audio,
                has_music = profile.has_music,
                speech_coverage = profile.speech_coverage,
                peaks = profile.emotional_peaks.len(),
                tempo = ?profile.tempo,
                "Audio profiled"
            ),
            None => debug!(
                job_id = %self.job_id,
                stage = %Stage::Audio,
                "Audio analysis skipped"
            ),
        }
    }

    pub fn log_candidates(&self, provider_id: &str, proposed: usize, accepted: usize) {
        debug!(
            job_id = %self.job_id,
            stage = %Stage::Providers,
            provider_id = %provider_id,
            proposed,
            accepted,
            "Provider candidates validated"
        );
    }

    pub fn log_rejected(&self, provider_id: &str, reason: &RejectionReason) {
        debug!(
            job_id = %self.job_id,
            stage = %Stage::Providers,
            provider_id = %provider_id,
            reason = %reason.as_str(),
            "Rejected candidate: {}", reason
        );
    }

    /// The provider is excluded; the job carries on without it.
    pub fn log_provider_failure(&self, provider_id: &str, failure: &ProviderFailure) {
        warn!(
            job_id = %self.job_id,
            stage = %Stage::Providers,
            provider_id = %provider_id,
            kind = %failure.kind(),
            "Provider excluded: {}", failure
        );
    }

    pub fn log_warning(&self, stage: Stage, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %stage,
            "Job warning: {}", message
        );
    }

    pub fn log_completion(&self, output: &ConsensusOutput, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            stage = %Stage::Aggregation,
            clips = output.clips.len(),
            consensus_score = output.consensus_score,
            providers_invoked = output.providers_invoked,
            failed_providers = output.failed_providers.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis completed"
        );
    }

    pub fn log_failure(&self, err: &WorkerError) {
        error!(
            job_id = %self.job_id,
            kind = %err.kind(),
            "Analysis failed: {}", err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn test_timeout_and_error_are_told_apart() {
        let timeout = ProviderFailure::Timeout(Duration::from_millis(1500));
        let failed = ProviderFailure::Error("rate limited".to_string());

        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(failed.kind(), "error");
        assert_eq!(timeout.warning("slow"), "Provider slow timed out after 1.5s");
        assert_eq!(failed.warning("flaky"), "Provider flaky failed: rate limited");
    }

    #[test]
    fn test_provider_failure_event_carries_stage_and_kind() {
        let logger = JobLogger::new(&JobId::from_string("job-123"));
        let logs = capture(|| {
            logger.log_provider_failure("slow", &ProviderFailure::Timeout(Duration::from_secs(90)));
        });

        assert!(logs.contains("WARN"));
        assert!(logs.contains("job_id=job-123"));
        assert!(logs.contains("stage=providers"));
        assert!(logs.contains("provider_id=slow"));
        assert!(logs.contains("timed out after 90s"));
        assert!(logs.contains("kind=timeout"));
    }

    #[test]
    fn test_completion_reports_consensus_fields() {
        let logger = JobLogger::new(&JobId::from_string("job-456"));
        let mut output = ConsensusOutput::new(Vec::new(), 3);
        output.failed_providers = vec!["gemini".to_string()];

        let logs = capture(|| logger.log_completion(&output, Duration::from_millis(250)));

        assert!(logs.contains("stage=aggregation"));
        assert!(logs.contains("clips=0"));
        assert!(logs.contains("providers_invoked=3"));
        assert!(logs.contains("failed_providers=1"));
        assert!(logs.contains("elapsed_ms=250"));
    }

    #[test]
    fn test_skipped_audio_logged_at_debug() {
        let logger = JobLogger::new(&JobId::from_string("job-789"));
        let logs = capture(|| logger.log_audio_profile(None));

        assert!(logs.contains("DEBUG"));
        assert!(logs.contains("stage=audio"));
        assert!(logs.contains("Audio analysis skipped"));
    }
}
