//! Boundary to external AI providers.
//!
//! A provider turns the shared frames, audio profile and settings into raw
//! clip proposals. Everything it returns is untrusted and is validated once
//! here before the aggregator sees it.

mod candidate;
mod replay;

pub use candidate::{validate_candidate, RawCandidate, RawViralScore, RejectionReason, TimeValue};
pub use replay::ReplayProvider;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use clipscout_models::{AnalysisSettings, AudioProfile, SampledFrame};

/// A provider call that failed. Recovered by excluding the provider.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Provider {provider_id} failed: {message}")]
pub struct ProviderError {
    pub provider_id: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            message: message.into(),
        }
    }
}

/// One AI scoring backend.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier, used for `recommendedBy` and tie-breaking.
    fn id(&self) -> &str;

    async fn analyze(
        &self,
        frames: &[SampledFrame],
        audio: Option<&AudioProfile>,
        settings: &AnalysisSettings,
    ) -> Result<Vec<RawCandidate>, ProviderError>;
}

/// Providers invoked for every job, keyed by id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one with the same id.
    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.insert(provider.id().to_string(), provider)
    }

    pub fn with(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ProviderAdapter>> {
        self.providers.get(id)
    }

    /// Providers in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.providers.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_orders_and_replaces_by_id() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(ReplayProvider::from_json("zeta", "[]")))
            .with(Arc::new(ReplayProvider::from_json("alpha", "[]")))
            .with(Arc::new(ReplayProvider::from_json("zeta", "{\"clips\": []}")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("gemini", "quota exhausted");
        assert_eq!(err.to_string(), "Provider gemini failed: quota exhausted");
    }
}
