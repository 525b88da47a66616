//! End-to-end analysis of one video.
//!
//! Validation runs before any decoding. Frame sampling and audio extraction
//! then run concurrently, every provider is invoked concurrently under a
//! semaphore with its own deadline, and the consensus is computed once all
//! provider tasks have finished. A cancelled job never returns a partial
//! result.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, Instrument};

use clipscout_media::cancel::cancelled;
use clipscout_media::{
    is_cancelled, probe_source, spool_bytes, AudioFeatureExtractor, CancelReceiver, CropPlanner,
    FfmpegFrameSource, FfmpegPcmSource, FrameSampler, FrameSource, PcmSource,
};
use clipscout_models::{
    AnalysisSettings, AudioProfile, ClipCandidate, ConsensusOutput, DurationBounds, JobId,
    SampledFrame, ValidationError, VideoSource,
};

use crate::config::WorkerConfig;
use crate::consensus::ConsensusAggregator;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, ProviderFailure, Stage};
use crate::metrics;
use crate::provider::{validate_candidate, ProviderError, ProviderRegistry, RawCandidate};

/// What became of one provider call.
#[derive(Debug)]
enum ProviderOutcome {
    Completed(Vec<RawCandidate>),
    Failed(ProviderError),
    TimedOut,
}

/// Result of analysing a file, with the probed source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub video: VideoSource,
    pub output: ConsensusOutput,
}

/// Settings resolved during validation.
#[derive(Debug, Clone, Copy)]
struct Preflight {
    bounds: DurationBounds,
    frame_count: usize,
}

/// Runs the analysis for one video at a time; cheap to share across jobs.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: WorkerConfig,
    providers: ProviderRegistry,
    sampler: FrameSampler,
    extractor: AudioFeatureExtractor,
    aggregator: ConsensusAggregator,
}

impl AnalysisPipeline {
    pub fn new(config: WorkerConfig, providers: ProviderRegistry) -> WorkerResult<Self> {
        config.validate()?;
        Ok(Self {
            sampler: FrameSampler::new(config.frame_spec()),
            extractor: AudioFeatureExtractor::new(config.audio_config()),
            aggregator: ConsensusAggregator::new(config.consensus_config()),
            config,
            providers,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Probe and analyse a local file with FFmpeg-backed decoders.
    pub async fn analyze_file(
        &self,
        job_id: &JobId,
        path: impl AsRef<Path>,
        settings: &AnalysisSettings,
        cancel: &CancelReceiver,
    ) -> WorkerResult<JobReport> {
        let path = path.as_ref();
        let started_at = Utc::now();
        self.preflight(settings)?;

        let source = probe_source(path).await?;
        let ffmpeg_timeout = self.config.ffmpeg_timeout.as_secs();
        let frames = FfmpegFrameSource::new(path).with_timeout(ffmpeg_timeout);
        let pcm = FfmpegPcmSource::new(path, self.config.audio_sample_rate)
            .with_audio(source.has_audio)
            .with_timeout(ffmpeg_timeout);

        let output = self
            .analyze(job_id, &source, &frames, &pcm, settings, cancel)
            .await?;

        Ok(JobReport {
            job_id: job_id.clone(),
            started_at,
            completed_at: Utc::now(),
            video: source,
            output,
        })
    }

    /// Spool an in-memory video to the work directory and analyse it.
    pub async fn analyze_bytes(
        &self,
        job_id: &JobId,
        bytes: Vec<u8>,
        settings: &AnalysisSettings,
        cancel: &CancelReceiver,
    ) -> WorkerResult<JobReport> {
        self.preflight(settings)?;
        // Removed when `spooled` drops at the end of this call.
        let spooled = spool_bytes(bytes, &self.config.work_dir).await?;
        self.analyze_file(job_id, spooled.path(), settings, cancel)
            .await
    }

    /// Analyse `source` through the given decoders.
    pub async fn analyze(
        &self,
        job_id: &JobId,
        source: &VideoSource,
        frames: &dyn FrameSource,
        pcm: &dyn PcmSource,
        settings: &AnalysisSettings,
        cancel: &CancelReceiver,
    ) -> WorkerResult<ConsensusOutput> {
        let logger = JobLogger::new(job_id);
        let started = Instant::now();

        let result = self
            .run(&logger, source, frames, pcm, settings, cancel)
            .instrument(logger.create_span())
            .await;

        match &result {
            Ok(output) => {
                metrics::record_job_completed(started.elapsed().as_secs_f64(), output.clips.len());
                logger.log_completion(output, started.elapsed());
            }
            Err(e) => {
                metrics::record_job_failed(e.kind());
                logger.log_failure(e);
            }
        }
        result
    }

    fn preflight(&self, settings: &AnalysisSettings) -> WorkerResult<Preflight> {
        let bounds = settings.validate()?;
        if self.providers.is_empty() {
            return Err(ValidationError::NoProviders.into());
        }
        Ok(Preflight {
            bounds,
            frame_count: settings.frame_count.unwrap_or(self.config.frame_count),
        })
    }

    async fn run(
        &self,
        logger: &JobLogger,
        source: &VideoSource,
        frames: &dyn FrameSource,
        pcm: &dyn PcmSource,
        settings: &AnalysisSettings,
        cancel: &CancelReceiver,
    ) -> WorkerResult<ConsensusOutput> {
        let preflight = self.preflight(settings)?;
        source.validate()?;
        let crop_regions = CropPlanner::new(source.width, source.height)?.plan_default();

        if is_cancelled(cancel) {
            return Err(WorkerError::Cancelled);
        }

        logger.log_start(source, preflight.frame_count, self.providers.len());

        let audio_task = async {
            if settings.include_audio {
                self.extractor
                    .extract(pcm, source.duration, cancel)
                    .await
                    .map(Some)
            } else {
                Ok(None)
            }
        };
        let (sampled, audio) = tokio::try_join!(
            self.sampler
                .sample(frames, source.duration, preflight.frame_count, cancel),
            audio_task
        )?;

        logger.log_frames_sampled(sampled.len());
        logger.log_audio_profile(audio.as_ref());

        let frames = Arc::new(sampled);
        let audio = Arc::new(audio);
        let settings = Arc::new(settings.clone());
        let outcomes = self.invoke_providers(frames, audio, settings, cancel).await?;

        // Never hand back a partial result once cancellation was requested.
        if is_cancelled(cancel) {
            return Err(WorkerError::Cancelled);
        }

        let mut accepted: Vec<ClipCandidate> = Vec::new();
        let mut failed_providers = Vec::new();
        let mut warnings = Vec::new();

        for (provider_id, outcome) in outcomes {
            match outcome {
                ProviderOutcome::Completed(raw) => {
                    accepted.extend(self.accept_candidates(
                        logger,
                        &provider_id,
                        raw,
                        source.duration,
                        &preflight.bounds,
                    ));
                }
                ProviderOutcome::Failed(e) => {
                    metrics::record_provider_failure(&provider_id);
                    let failure = ProviderFailure::Error(e.message);
                    logger.log_provider_failure(&provider_id, &failure);
                    warnings.push(failure.warning(&provider_id));
                    failed_providers.push(provider_id);
                }
                ProviderOutcome::TimedOut => {
                    metrics::record_provider_timeout(&provider_id);
                    let failure = ProviderFailure::Timeout(self.config.provider_timeout);
                    logger.log_provider_failure(&provider_id, &failure);
                    warnings.push(failure.warning(&provider_id));
                    failed_providers.push(provider_id);
                }
            }
        }

        let invoked = self.providers.len();
        let clips = self.aggregator.aggregate(accepted, invoked, &crop_regions);

        let mut output = ConsensusOutput::new(clips, invoked);
        if failed_providers.len() == invoked {
            let warning = format!("All {} providers failed; no clips produced", invoked);
            logger.log_warning(Stage::Aggregation, &warning);
            warnings.push(warning);
        }
        failed_providers.sort();
        output.failed_providers = failed_providers;
        output.warnings = warnings;
        Ok(output)
    }

    /// Call every provider, returning outcomes in provider id order.
    async fn invoke_providers(
        &self,
        frames: Arc<Vec<SampledFrame>>,
        audio: Arc<Option<AudioProfile>>,
        settings: Arc<AnalysisSettings>,
        cancel: &CancelReceiver,
    ) -> WorkerResult<Vec<(String, ProviderOutcome)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_provider_parallel));
        let deadline = self.config.provider_timeout;

        let mut tasks = JoinSet::new();
        let mut task_providers = HashMap::new();

        for provider in self.providers.iter() {
            let provider = Arc::clone(provider);
            let semaphore = Arc::clone(&semaphore);
            let frames = Arc::clone(&frames);
            let audio = Arc::clone(&audio);
            let settings = Arc::clone(&settings);
            let provider_id = provider.id().to_string();

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProviderOutcome::Failed(ProviderError::new(
                            provider.id(),
                            "provider semaphore closed",
                        ))
                    }
                };

                // The deadline only starts once a permit is held.
                let started = Instant::now();
                let call = provider.analyze(&frames, (*audio).as_ref(), &settings);
                let outcome = match tokio::time::timeout(deadline, call).await {
                    Ok(Ok(raw)) => ProviderOutcome::Completed(raw),
                    Ok(Err(e)) => ProviderOutcome::Failed(e),
                    Err(_) => ProviderOutcome::TimedOut,
                };
                metrics::record_provider_call(provider.id(), started.elapsed().as_secs_f64());
                outcome
            });
            task_providers.insert(handle.id(), provider_id);
        }

        let mut outcomes = Vec::with_capacity(task_providers.len());
        let mut cancel_rx = cancel.clone();

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    info!(outstanding = tasks.len(), "Cancelling provider calls");
                    tasks.abort_all();
                    return Err(WorkerError::Cancelled);
                }
                next = tasks.join_next_with_id() => {
                    let Some(joined) = next else { break };
                    match joined {
                        Ok((id, outcome)) => {
                            let provider_id = task_providers.remove(&id).unwrap_or_default();
                            outcomes.push((provider_id, outcome));
                        }
                        Err(e) => {
                            let provider_id = task_providers.remove(&e.id()).unwrap_or_default();
                            let message = format!("provider task panicked: {}", e);
                            outcomes.push((
                                provider_id.clone(),
                                ProviderOutcome::Failed(ProviderError::new(provider_id, message)),
                            ));
                        }
                    }
                }
            }
        }

        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(outcomes)
    }

    fn accept_candidates(
        &self,
        logger: &JobLogger,
        provider_id: &str,
        raw: Vec<RawCandidate>,
        video_duration: f64,
        bounds: &DurationBounds,
    ) -> Vec<ClipCandidate> {
        let proposed = raw.len();
        let accepted: Vec<ClipCandidate> = raw
            .iter()
            .filter_map(|candidate| {
                match validate_candidate(provider_id, candidate, video_duration, bounds) {
                    Ok(valid) => Some(valid),
                    Err(reason) => {
                        metrics::record_candidate_rejected(provider_id, reason.as_str());
                        logger.log_rejected(provider_id, &reason);
                        None
                    }
                }
            })
            .collect();

        logger.log_candidates(provider_id, proposed, accepted.len());
        accepted
    }
}
