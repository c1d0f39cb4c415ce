//! Server startup: shared state initialization.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use tracing::{info, warn};

use inquisition_core::config::{CachingConfig, MysqlConfig, RedisConfig};
use inquisition_core::{Config, ConfigStore};
use inquisition_tuning::DataStore;

use crate::cache::Cache;
use crate::db::{self, MySqlDataStore};
use crate::state::AppState;
use crate::stats::RedisStats;

async fn connect_redis(config: &RedisConfig) -> Option<ConnectionManager> {
    let client = match redis::Client::open(config.url()) {
        Ok(client) => client,
        Err(e) => {
            warn!("Invalid Redis address {}: {}; cache and stats disabled", config.url(), e);
            return None;
        }
    };
    match ConnectionManager::new(client).await {
        Ok(manager) => {
            info!("Redis connected: {}", config.url());
            Some(manager)
        }
        Err(e) => {
            warn!(
                "Failed to connect to Redis at {}: {}; cache and stats disabled",
                config.url(),
                e
            );
            None
        }
    }
}

/// Open the platform config and connect to MySQL and Redis.
///
/// A missing or unparsable config file is fatal. Unreachable stores only
/// disable the endpoints that need them.
pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(ConfigStore::open(&config.config_file)?);
    let tree = store.read()?;
    info!("Platform config loaded: {} ({} sections)", store.path().display(), tree.len());

    let mysql = MysqlConfig::from_tree(&tree);
    let data_store: Option<Arc<dyn DataStore>> =
        db::init_mysql_pool(&mysql, config.db_max_connections)
            .await
            .map(|pool| Arc::new(MySqlDataStore::new(pool)) as Arc<dyn DataStore>);

    let caching = CachingConfig::from_tree(&tree);
    let mut state = AppState::new(config.clone(), store, data_store, caching.clone());

    if let Some(manager) = connect_redis(&RedisConfig::from_tree(&tree)).await {
        match Cache::new(manager.clone(), caching.alert_expiration) {
            Ok(cache) => state = state.with_cache(cache),
            Err(e) => warn!("Alert cache disabled: {}", e),
        }
        state = state.with_stats(Arc::new(RedisStats::new(manager)));
    }

    Ok(Arc::new(state))
}
