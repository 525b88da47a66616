//! Provider that serves a recorded AI response.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use clipscout_models::{AnalysisSettings, AudioProfile, SampledFrame};

use super::{ProviderAdapter, ProviderError, RawCandidate};

/// Accepted shapes of a recorded response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedResponse {
    Wrapped {
        #[serde(alias = "highlights")]
        clips: Vec<RawCandidate>,
    },
    Bare(Vec<RawCandidate>),
}

/// Replays the JSON body an AI backend returned for a video.
///
/// The body is parsed on every call, so a malformed recording fails like a
/// misbehaving provider would.
#[derive(Debug, Clone)]
pub struct ReplayProvider {
    id: String,
    body: String,
}

impl ReplayProvider {
    pub fn from_json(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }

    /// Load a recording; the provider id is the file stem.
    pub async fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let body = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_json(id, body))
    }

    fn parse(&self) -> Result<Vec<RawCandidate>, ProviderError> {
        let text = strip_code_fence(&self.body);
        let response: RecordedResponse = serde_json::from_str(text).map_err(|e| {
            ProviderError::new(&self.id, format!("Failed to parse clips JSON: {}", e))
        })?;

        Ok(match response {
            RecordedResponse::Wrapped { clips } => clips,
            RecordedResponse::Bare(clips) => clips,
        })
    }
}

#[async_trait]
impl ProviderAdapter for ReplayProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn analyze(
        &self,
        frames: &[SampledFrame],
        _audio: Option<&AudioProfile>,
        _settings: &AnalysisSettings,
    ) -> Result<Vec<RawCandidate>, ProviderError> {
        let clips = self.parse()?;
        debug!(
            provider_id = %self.id,
            frames = frames.len(),
            clips = clips.len(),
            "Replayed provider response"
        );
        Ok(clips)
    }
}

/// Models often wrap JSON in a markdown code block.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TimeValue;
    use std::io::Write;

    async fn run(provider: &ReplayProvider) -> Result<Vec<RawCandidate>, ProviderError> {
        provider
            .analyze(&[], None, &AnalysisSettings::default())
            .await
    }

    #[tokio::test]
    async fn test_wrapped_and_fenced_response() {
        let body = "```json\n{\"clips\": [{\"title\": \"Hook\", \"startTime\": \"00:10\", \"endTime\": 25}]}\n```";
        let clips = run(&ReplayProvider::from_json("gemini", body)).await.unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].start_time, TimeValue::Timestamp("00:10".into()));
        assert_eq!(clips[0].end_time, TimeValue::Seconds(25.0));
    }

    #[tokio::test]
    async fn test_bare_array_and_highlights_alias() {
        let bare = ReplayProvider::from_json("a", r#"[{"start": 1, "end": 9}]"#);
        assert_eq!(run(&bare).await.unwrap().len(), 1);

        let aliased = ReplayProvider::from_json("b", r#"{"highlights": []}"#);
        assert!(run(&aliased).await.unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_is_provider_error() {
        let provider = ReplayProvider::from_json("claude", "I could not find any clips.");
        let err = tokio_test::assert_err!(tokio_test::block_on(run(&provider)));
        assert_eq!(err.provider_id, "claude");
    }

    #[tokio::test]
    async fn test_from_file_uses_stem_as_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openai.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"[]").unwrap();

        let provider = ReplayProvider::from_file(&path).await.unwrap();
        assert_eq!(provider.id(), "openai");
    }
}
