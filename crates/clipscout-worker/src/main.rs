//! Clip analysis worker binary.
//!
//! Usage: `clipscout-worker [--platform NAME] [--settings FILE] <video> <provider.json>...`
//!
//! Each provider file is a recorded AI response; its stem is the provider id.
//! The job report is printed to stdout as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipscout_media::cancel_channel;
use clipscout_models::{AnalysisSettings, JobId, Platform};
use clipscout_worker::{metrics, AnalysisPipeline, ProviderRegistry, ReplayProvider, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "clipscout-worker")]
#[command(about = "Find viral clip candidates in a video by consensus across AI providers", long_about = None)]
struct Cli {
    /// Target platform; overrides the one in --settings
    #[arg(long)]
    platform: Option<Platform>,

    /// JSON file with analysis settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Video file to analyse
    video: PathBuf,

    /// Recorded provider responses; each file stem is the provider id
    #[arg(required = true)]
    providers: Vec<PathBuf>,
}

impl Cli {
    async fn analysis_settings(&self) -> Result<AnalysisSettings, String> {
        let mut settings = match &self.settings {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
                serde_json::from_str(&text)
                    .map_err(|e| format!("invalid settings in {}: {}", path.display(), e))?
            }
            None => AnalysisSettings::default(),
        };
        if let Some(platform) = self.platform {
            settings.platform = platform;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing();

    let settings = match cli.analysis_settings().await {
        Ok(settings) => settings,
        Err(message) => {
            error!("{}", message);
            std::process::exit(2);
        }
    };

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        match metrics::init_metrics(addr) {
            Ok(()) => info!(%addr, "Prometheus exporter listening"),
            Err(e) => warn!("Metrics disabled: {}", e),
        }
    }

    let mut providers = ProviderRegistry::new();
    for path in &cli.providers {
        match ReplayProvider::from_file(path).await {
            Ok(provider) => {
                providers.register(Arc::new(provider));
            }
            Err(e) => {
                error!("Failed to read provider file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let pipeline = match AnalysisPipeline::new(config, providers) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // Setup signal handler
    let (cancel_tx, cancel_rx) = cancel_channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, cancelling job");
        cancel_tx.send(true).ok();
    });

    let job_id = JobId::new();
    let report = match pipeline
        .analyze_file(&job_id, &cli.video, &settings, &cancel_rx)
        .await
    {
        Ok(report) => report,
        Err(e) if e.is_cancelled() => {
            warn!(job_id = %job_id, "Job cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            error!(job_id = %job_id, "Analysis failed: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            std::process::exit(1);
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`. Logs go to stderr so
/// stdout carries only the report.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipscout=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_platform_and_providers() {
        let cli = Cli::try_parse_from([
            "clipscout-worker",
            "--platform",
            "youtube-shorts",
            "talk.mp4",
            "gemini.json",
            "claude.json",
        ])
        .unwrap();

        assert_eq!(cli.platform, Some(Platform::YoutubeShorts));
        assert_eq!(cli.video, PathBuf::from("talk.mp4"));
        assert_eq!(cli.providers.len(), 2);
        assert!(cli.settings.is_none());
    }

    #[test]
    fn test_cli_requires_a_provider() {
        let err = Cli::try_parse_from(["clipscout-worker", "talk.mp4"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_rejects_unknown_platform() {
        let err = Cli::try_parse_from([
            "clipscout-worker",
            "--platform",
            "myspace",
            "talk.mp4",
            "gemini.json",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[tokio::test]
    async fn test_platform_flag_overrides_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"platform": "tiktok", "includeAudio": false}"#).unwrap();

        let cli = Cli::try_parse_from([
            "clipscout-worker",
            "--platform",
            "youtube",
            "--settings",
            path.to_str().unwrap(),
            "talk.mp4",
            "gemini.json",
        ])
        .unwrap();
        let settings = cli.analysis_settings().await.unwrap();

        assert_eq!(settings.platform, Platform::Youtube);
        assert!(!settings.include_audio);
    }
}
