//! Platform statistics stored as Redis hashes under `stats:<type>:<...>`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::debug;

pub const STATS_PREFIX: &str = "stats";

const SCAN_BATCH: usize = 100;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("stats store error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// One stat hash, fields sorted by name.
pub type StatRecord = BTreeMap<String, String>;

/// Hash key → record, in scan order.
pub type StatsData = IndexMap<String, StatRecord>;

#[async_trait]
pub trait StatsBackend: Send + Sync {
    /// Every key matching a glob `pattern`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StatsError>;

    /// All fields of the hash at `key`; empty when the key does not exist.
    async fn hash(&self, key: &str) -> Result<StatRecord, StatsError>;

    async fn ping(&self) -> Result<(), StatsError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub stat_type: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
}

impl StatsQuery {
    /// Build from caller options (`type|t`, `key|k`, `name|n`).
    pub fn from_options<I, K, V>(opts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut q = Self::default();
        for (name, raw) in opts {
            let raw = raw.as_ref().trim();
            let value = (!raw.is_empty()).then(|| raw.to_string());
            match name.as_ref().to_ascii_lowercase().as_str() {
                "type" | "t" => q.stat_type = value,
                "key" | "k" => q.key = value,
                "name" | "n" => q.name = value,
                other => debug!(option = other, "ignoring unrecognised stats option"),
            }
        }
        q
    }
}

async fn load_matching(backend: &dyn StatsBackend, pattern: &str) -> Result<StatsData, StatsError> {
    let mut data = StatsData::new();
    for key in backend.scan(pattern).await? {
        let record = backend.hash(&key).await?;
        data.insert(key, record);
    }
    Ok(data)
}

/// Resolve `query` against the stats store.
///
/// A type loads every hash under `stats:<type>:*`. A key narrows that set to
/// one hash, or loads the hash directly when nothing was loaded. A name
/// projects each record to that single field; with neither type nor key the
/// whole `stats:*` space is searched for records carrying the field.
pub async fn collect_stats(
    backend: &dyn StatsBackend,
    query: &StatsQuery,
) -> Result<StatsData, StatsError> {
    let mut data = StatsData::new();

    if let Some(stat_type) = &query.stat_type {
        data = load_matching(backend, &format!("{STATS_PREFIX}:{stat_type}:*")).await?;
    }

    if let Some(key) = &query.key {
        if !data.is_empty() {
            data = data
                .shift_remove(key)
                .map(|record| StatsData::from([(key.clone(), record)]))
                .unwrap_or_default();
        } else {
            let record = backend.hash(key).await?;
            if !record.is_empty() {
                data.insert(key.clone(), record);
            }
        }
    }

    if let Some(name) = &query.name {
        if data.is_empty() && query.stat_type.is_none() && query.key.is_none() {
            data = load_matching(backend, &format!("{STATS_PREFIX}:*")).await?;
        }
        data = data
            .into_iter()
            .filter_map(|(hash_key, record)| {
                let value = record.get(name)?.clone();
                Some((hash_key, StatRecord::from([(name.clone(), value)])))
            })
            .collect();
    }

    Ok(data)
}

// ── Redis backend ─────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisStats {
    manager: ConnectionManager,
}

impl RedisStats {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl StatsBackend for RedisStats {
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StatsError> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        // SCAN may return a key more than once.
        let mut seen = std::collections::HashSet::new();
        keys.retain(|k| seen.insert(k.clone()));
        Ok(keys)
    }

    async fn hash(&self, key: &str) -> Result<StatRecord, StatsError> {
        let mut conn = self.manager.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn ping(&self) -> Result<(), StatsError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
