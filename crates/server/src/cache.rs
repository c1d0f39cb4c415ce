//! Redis-backed query result cache.
//!
//! Keys are `cache:<module>:<sha256 of the canonical JSON query>`; values are
//! stored as JSON and expire after the configured TTL.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid cache timeout: {0}")]
    InvalidTtl(i64),

    #[error("cache error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Derive the cache key for `query_data`. Blank input yields an empty key,
/// which is never written.
pub fn generate_key(query_data: &Value, module: &str) -> String {
    if is_blank(query_data) {
        return String::new();
    }
    let message = query_data.to_string();
    let digest = Sha256::digest(message.as_bytes());
    format!("cache:{}:{}", module, hex::encode(digest))
}

/// Reject negative TTLs; zero disables expiry.
pub fn ttl_from_secs(secs: i64) -> Result<u64, CacheError> {
    u64::try_from(secs).map_err(|_| CacheError::InvalidTtl(secs))
}

#[derive(Clone)]
pub struct Cache {
    manager: ConnectionManager,
    ttl_secs: u64,
}

impl Cache {
    pub fn new(manager: ConnectionManager, ttl_secs: i64) -> Result<Self, CacheError> {
        Ok(Self {
            manager,
            ttl_secs: ttl_from_secs(ttl_secs)?,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if key.is_empty() {
            return Ok(None);
        }
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Returns false without touching Redis when `key` is empty.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        if key.is_empty() {
            warn!("missing key provided for cache writing");
            return Ok(false);
        }
        let serialized = serde_json::to_string(value)?;
        let mut conn = self.manager.clone();
        let _: () = conn.set(key, serialized).await?;
        if self.ttl_secs > 0 {
            let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
            let _: bool = conn.expire(key, ttl).await?;
        }
        Ok(true)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
