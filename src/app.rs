//! Process-wide resolver context
//!
//! Built once at startup and passed by reference to every call site: loads
//! the dataset, creates the cache, starts the reaper and wires the resolver.
//! [`App::shutdown`] stops the reaper before the process exits.

use std::sync::Arc;
use tracing::info;

use crate::agent::{Resolution, Resolver};
use crate::agent::provider::ProviderError;
use crate::cache::{ReaperHandle, ShardedCache};
use crate::config::{AppConfig, ModelProvider};
use crate::dataset::DatasetIndex;

pub struct App {
    config: AppConfig,
    resolver: Arc<Resolver>,
    reaper: Option<ReaperHandle>,
}

impl App {
    /// Build the context from configuration. Must run inside a tokio runtime.
    pub fn start(config: AppConfig) -> Self {
        let dataset = Arc::new(DatasetIndex::load(&config.dataset_files));
        info!("Command dataset ready ({} entries)", dataset.len());

        Self::with_resolver(config.clone(), |cache| {
            Resolver::from_config(&config, cache, dataset)
        })
    }

    /// Build the context around a custom resolver, e.g. one with test backends
    pub fn with_resolver<F>(config: AppConfig, build: F) -> Self
    where
        F: FnOnce(Arc<ShardedCache>) -> Resolver,
    {
        let cache = Arc::new(ShardedCache::new(&config.cache));
        let reaper = cache.start_background_expiry(config.cache.reap_interval());
        let resolver = Arc::new(build(cache));

        Self {
            config,
            resolver,
            reaper: Some(reaper),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<ShardedCache> {
        self.resolver.cache()
    }

    /// Resolve with the configured provider
    pub async fn resolve(&self, input: &str) -> Result<Resolution, ProviderError> {
        self.resolve_with(input, self.config.provider).await
    }

    pub async fn resolve_with(
        &self,
        input: &str,
        provider: ModelProvider,
    ) -> Result<Resolution, ProviderError> {
        self.resolver.resolve(input, provider).await
    }

    pub fn is_reaper_running(&self) -> bool {
        self.reaper.as_ref().is_some_and(ReaperHandle::is_running)
    }

    /// Stop background work. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.shutdown().await;
        }
    }
}
