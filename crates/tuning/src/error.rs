use std::path::PathBuf;

use inquisition_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuningError {
    #[error("could not read configuration: {0}")]
    ConfigRead(#[source] ConfigError),

    #[error("config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    #[error("could not write configuration: {0}")]
    ConfigWrite(#[source] ConfigError),

    #[error("config key not found: [{section}] {key}")]
    ConfigKeyNotFound { section: String, key: String },

    #[error("config key already exists: [{section}] {key}")]
    ConfigKeyExists { section: String, key: String },

    #[error("rejected config entry: {0}")]
    InvalidConfigEntry(#[source] ConfigError),

    #[error("config section and key are required")]
    MissingConfigTarget,

    #[error("no metadata type provided")]
    MissingType,

    #[error("invalid metadata type: {0:?}")]
    InvalidType(String),

    #[error("invalid column for table {table}: {column:?}")]
    InvalidColumn { table: &'static str, column: String },

    #[error("no metadata identifier provided")]
    NoIdentifier,

    #[error("invalid metadata identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("field/value count mismatch: {fields} fields, {values} values")]
    FieldValueMismatch { fields: usize, values: usize },

    #[error("no fields provided")]
    NoFieldsProvided,

    #[error("no values provided")]
    NoValuesProvided,

    #[error("metadata type {0:?} cannot be deleted")]
    InvalidTypeForDeletion(String),

    #[error("data store unavailable: {0}")]
    DataStoreConnection(String),

    #[error("data store query failed: {0}")]
    DataStoreQuery(String),
}

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Unavailable,
    Internal,
}

impl TuningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TuningError::ConfigKeyNotFound { .. } => ErrorKind::NotFound,
            TuningError::DataStoreConnection(_) => ErrorKind::Unavailable,
            TuningError::ConfigRead(_)
            | TuningError::ConfigFileNotFound(_)
            | TuningError::ConfigWrite(_)
            | TuningError::DataStoreQuery(_) => ErrorKind::Internal,
            TuningError::ConfigKeyExists { .. }
            | TuningError::InvalidConfigEntry(_)
            | TuningError::MissingConfigTarget
            | TuningError::MissingType
            | TuningError::InvalidType(_)
            | TuningError::InvalidColumn { .. }
            | TuningError::NoIdentifier
            | TuningError::InvalidIdentifier(_)
            | TuningError::FieldValueMismatch { .. }
            | TuningError::NoFieldsProvided
            | TuningError::NoValuesProvided
            | TuningError::InvalidTypeForDeletion(_) => ErrorKind::BadInput,
        }
    }
}

impl From<ConfigError> for TuningError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::FileNotFound(path) => TuningError::ConfigFileNotFound(path),
            ConfigError::KeyNotFound { section, key } => {
                TuningError::ConfigKeyNotFound { section, key }
            }
            ConfigError::KeyExists { section, key } => {
                TuningError::ConfigKeyExists { section, key }
            }
            e @ ConfigError::Write { .. } => TuningError::ConfigWrite(e),
            e @ ConfigError::Invalid { .. } => TuningError::InvalidConfigEntry(e),
            e => TuningError::ConfigRead(e),
        }
    }
}

pub type TuningResult<T> = Result<T, TuningError>;
