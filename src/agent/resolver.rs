//! Instruction resolver
//!
//! Turns a natural-language instruction into a command, trying sources in a
//! fixed order:
//!
//! 1. **Cache**: a previous backend answer for the same canonical key (exact,
//!    then fuzzy within the key's shard).
//! 2. **Dataset**: the static command catalog, fuzzy-matched over the whole
//!    catalog. Dataset answers are never written to the cache.
//! 3. **Backend**: the selected LLM provider, under a deadline. Only a
//!    successful answer is cached.
//!
//! The resolver owns no global state: the cache and dataset are passed in and
//! shared by reference between concurrent callers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::prompts::{build_command_prompt, build_revision_prompt, host_os};
use super::provider::{create_provider, ModelProvider, ProviderError};
use crate::cache::ShardedCache;
use crate::config::{AppConfig, ModelProvider as ProviderType};
use crate::dataset::DatasetIndex;
use crate::text::{normalize, DEFAULT_SIMILARITY_THRESHOLD};

/// Where a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Dataset,
    Backend(ProviderType),
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Dataset => write!(f, "dataset"),
            Self::Backend(provider) => write!(f, "{}", provider),
        }
    }
}

/// Result of resolving one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Text shown to the user
    pub text: String,
    /// Command to run if the user accepts it. Equals `text` except for
    /// dataset answers, whose text also carries the description.
    pub command: String,
    pub source: ResolutionSource,
}

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub similarity_threshold: f64,
    pub backend_timeout: Duration,
    pub os_type: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            backend_timeout: Duration::from_secs(60),
            os_type: host_os().to_string(),
        }
    }
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            similarity_threshold: config.cache.similarity_threshold,
            backend_timeout: config.backend_timeout(),
            os_type: host_os().to_string(),
        }
    }
}

pub struct Resolver {
    cache: Arc<ShardedCache>,
    dataset: Arc<DatasetIndex>,
    backends: HashMap<ProviderType, Arc<dyn ModelProvider>>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(cache: Arc<ShardedCache>, dataset: Arc<DatasetIndex>, config: ResolverConfig) -> Self {
        Self {
            cache,
            dataset,
            backends: HashMap::new(),
            config,
        }
    }

    /// Build a resolver with every provider that can be constructed from
    /// `app_config`. Providers that fail to build (missing key, not
    /// implemented) are left out and reported when selected.
    pub fn from_config(
        app_config: &AppConfig,
        cache: Arc<ShardedCache>,
        dataset: Arc<DatasetIndex>,
    ) -> Self {
        let mut resolver = Self::new(cache, dataset, ResolverConfig::from(app_config));

        for provider in [ProviderType::Ollama, ProviderType::OpenAI] {
            match create_provider(provider, app_config.model_for(provider)) {
                Ok(backend) => resolver.register(backend),
                Err(e) => debug!("Backend {} unavailable: {}", provider, e),
            }
        }

        resolver
    }

    /// Register (or replace) the backend for its provider type
    pub fn register(&mut self, backend: Arc<dyn ModelProvider>) {
        self.backends.insert(backend.provider_type(), backend);
    }

    pub fn with_backend(mut self, backend: Arc<dyn ModelProvider>) -> Self {
        self.register(backend);
        self
    }

    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }

    pub fn dataset(&self) -> &Arc<DatasetIndex> {
        &self.dataset
    }

    /// Resolve `input` using the cache, then the dataset, then `provider`.
    ///
    /// Backend failures are returned as-is and leave the cache untouched;
    /// retrying is up to the caller.
    pub async fn resolve(
        &self,
        input: &str,
        provider: ProviderType,
    ) -> Result<Resolution, ProviderError> {
        let key = normalize(input);

        if let Some(value) = self.cache.get(&key) {
            debug!("Cache hit for {:?}", key);
            return Ok(Resolution {
                command: value.clone(),
                text: value,
                source: ResolutionSource::Cache,
            });
        }

        if let Some(entry) = self
            .dataset
            .fuzzy_find(&key, self.config.similarity_threshold)
        {
            debug!("Dataset hit for {:?}: {}", key, entry.command);
            return Ok(Resolution {
                text: entry.to_string(),
                command: entry.command.clone(),
                source: ResolutionSource::Dataset,
            });
        }

        info!("No local answer for {:?}, asking {}", key, provider);
        let prompt = build_command_prompt(&self.config.os_type, input);
        let response = self.call_backend(&prompt, provider).await?;
        self.cache.set(&key, response.clone());

        Ok(Resolution {
            command: response.clone(),
            text: response,
            source: ResolutionSource::Backend(provider),
        })
    }

    /// Ask `provider` for a revised version of `command`.
    ///
    /// Always goes to the backend and never touches the cache: the revision
    /// is a new answer for the same instruction, not a reusable one.
    pub async fn revise(
        &self,
        command: &str,
        provider: ProviderType,
    ) -> Result<Resolution, ProviderError> {
        let prompt = build_revision_prompt(command);
        let response = self.call_backend(&prompt, provider).await?;

        Ok(Resolution {
            command: response.clone(),
            text: response,
            source: ResolutionSource::Backend(provider),
        })
    }

    async fn call_backend(&self, prompt: &str, provider: ProviderType) -> Result<String, ProviderError> {
        let backend = self.backends.get(&provider).ok_or(match provider {
            ProviderType::Anthropic => ProviderError::Unsupported(provider),
            _ => ProviderError::NotConfigured(provider),
        })?;

        let deadline = self.config.backend_timeout;

        match tokio::time::timeout(deadline, backend.complete(prompt)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                warn!("Backend {} failed: {}", provider, e);
                Err(e)
            }
            Err(_) => {
                warn!("Backend {} timed out after {:?}", provider, deadline);
                Err(ProviderError::Transport(format!(
                    "{} did not respond within {:?}",
                    provider, deadline
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelProvider for EchoBackend {
        async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo {}", prompt.len()))
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::Ollama
        }
    }

    fn resolver(dataset: DatasetIndex) -> (Resolver, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        });
        let resolver = Resolver::new(
            Arc::new(ShardedCache::new(&CacheConfig::default())),
            Arc::new(dataset),
            ResolverConfig::default(),
        )
        .with_backend(backend.clone());
        (resolver, backend)
    }

    #[tokio::test]
    async fn test_backend_answer_is_cached_under_canonical_key() {
        let (resolver, backend) = resolver(DatasetIndex::new());

        let first = resolver.resolve("Compress the logs folder", ProviderType::Ollama).await.unwrap();
        assert_eq!(first.source, ResolutionSource::Backend(ProviderType::Ollama));
        assert_eq!(
            resolver.cache().get("compress folder logs").as_deref(),
            Some(first.text.as_str())
        );

        let second = resolver.resolve("logs folder, compress!", ProviderType::Ollama).await.unwrap();
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.text, first.text);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dataset_answer_is_not_cached() {
        let mut dataset = DatasetIndex::new();
        dataset.insert("git status", "show working tree status");
        let (resolver, backend) = resolver(dataset);

        let resolution = resolver.resolve("git status", ProviderType::Ollama).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Dataset);
        assert_eq!(resolution.text, "Command: git status\nDescription: show working tree status");
        assert_eq!(resolution.command, "git status");
        assert!(resolver.cache().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_backend_fails_fast() {
        let (resolver, _) = resolver(DatasetIndex::new());
        let err = resolver.resolve("list files", ProviderType::Anthropic).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(ProviderType::Anthropic)));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_backend_is_not_configured() {
        let (resolver, _) = resolver(DatasetIndex::new());
        let err = resolver.resolve("list files", ProviderType::OpenAI).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(ProviderType::OpenAI)));
    }

    #[tokio::test]
    async fn test_revise_bypasses_cache() {
        let (resolver, backend) = resolver(DatasetIndex::new());

        let revised = resolver.revise("ls -la", ProviderType::Ollama).await.unwrap();
        assert_eq!(revised.source, ResolutionSource::Backend(ProviderType::Ollama));
        assert!(resolver.cache().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ResolutionSource::Cache.to_string(), "cache");
        assert_eq!(ResolutionSource::Backend(ProviderType::OpenAI).to_string(), "openai");
    }
}
