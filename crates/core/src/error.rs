use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("could not write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config key not found: [{section}] {key}")]
    KeyNotFound { section: String, key: String },

    #[error("config key already exists: [{section}] {key}")]
    KeyExists { section: String, key: String },

    #[error("invalid config {what}: {value:?}")]
    Invalid { what: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
