use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ini::{ConfigTree, DEFAULT_CONFIG_PATH};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    /// Location of the INI platform configuration.
    pub config_file: PathBuf,
    pub db_max_connections: u32,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `INQUISITION_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("INQUISITION_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            config_file: PathBuf::from(profiled_env_or(
                p,
                "INQUISITION_CONFIG_FILE",
                DEFAULT_CONFIG_PATH,
            )),
            db_max_connections: profiled_env_u32(p, "DB_MAX_CONNECTIONS", 5),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  config file: {}", self.config_file.display());
        tracing::info!("  db pool:     max_connections={}", self.db_max_connections);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8080),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Settings read from the platform config file ───────────────

fn tree_str<'a>(tree: &'a ConfigTree, section: &str, key: &str) -> Option<&'a str> {
    tree.get(section)
        .and_then(|s| s.get(key))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn tree_or(tree: &ConfigTree, section: &str, key: &str, default: &str) -> String {
    tree_str(tree, section, key).unwrap_or(default).to_string()
}

fn tree_num<T: std::str::FromStr>(tree: &ConfigTree, section: &str, key: &str, default: T) -> T {
    tree_str(tree, section, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `[mysql_database]` connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl MysqlConfig {
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            host: tree_or(tree, "mysql_database", "db_host", "127.0.0.1"),
            port: tree_num(tree, "mysql_database", "db_port", 3306),
            database: tree_or(tree, "mysql_database", "db_name", "inquisition"),
            username: tree_or(tree, "mysql_database", "db_user", "inquisition"),
            password: tree_or(tree, "mysql_database", "db_pass", ""),
        }
    }

    /// Connection target for logs; never includes the password.
    pub fn display_url(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

/// `[log_database]` Redis parameters, shared by the cache and stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl RedisConfig {
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            host: tree_or(tree, "log_database", "host", "127.0.0.1"),
            port: tree_num(tree, "log_database", "port", 6379),
        }
    }

    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

/// `[caching]` expirations, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachingConfig {
    pub alert_expiration: i64,
}

impl CachingConfig {
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            alert_expiration: tree_num(tree, "caching", "alert_expiration", 15),
        }
    }
}
