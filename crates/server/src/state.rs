use std::sync::Arc;

use inquisition_core::config::CachingConfig;
use inquisition_core::{Config, ConfigStore};
use inquisition_tuning::{DataStore, TuningEngine};

use crate::cache::Cache;
use crate::stats::StatsBackend;

/// Shared state handed to every handler.
///
/// Collaborators that could not be reached at startup are `None`; the
/// endpoints depending on them answer 503 instead of failing the process.
pub struct AppState {
    pub settings: Config,
    pub config: Arc<ConfigStore>,
    pub data_store: Option<Arc<dyn DataStore>>,
    pub tuning: Option<Arc<TuningEngine>>,
    pub cache: Option<Cache>,
    pub stats: Option<Arc<dyn StatsBackend>>,
    pub caching: CachingConfig,
}

impl AppState {
    /// Wire state around an already opened config store; the tuning engine is
    /// built whenever a data store is present.
    pub fn new(
        settings: Config,
        config: Arc<ConfigStore>,
        data_store: Option<Arc<dyn DataStore>>,
        caching: CachingConfig,
    ) -> Self {
        let tuning = data_store
            .as_ref()
            .map(|store| Arc::new(TuningEngine::new(config.clone(), store.clone())));
        Self {
            settings,
            config,
            data_store,
            tuning,
            cache: None,
            stats: None,
            caching,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_stats(mut self, stats: Arc<dyn StatsBackend>) -> Self {
        self.stats = Some(stats);
        self
    }
}
