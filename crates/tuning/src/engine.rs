//! Request dispatch for the tuning API.
//!
//! Every call takes an immutable [`TuningRequest`] and returns a fresh
//! [`ResultEnvelope`]; nothing is carried over between calls.

use std::sync::Arc;

use inquisition_core::{ConfigAction, ConfigSection, ConfigStore, ConfigTree};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::catalog::{MetadataType, RequestedType, CFG_TOKEN};
use crate::envelope::{FanOutBuilder, ResultEnvelope};
use crate::error::{TuningError, TuningResult};
use crate::query::{self, ColumnName};
use crate::redact::redact_tree;
use crate::request::TuningRequest;
use crate::store::{DataStore, QueryMode};

fn section_value(section: &ConfigSection) -> Value {
    Value::Object(
        section
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn tree_value(tree: &ConfigTree) -> Value {
    Value::Object(
        tree.iter()
            .map(|(name, section)| (name.clone(), section_value(section)))
            .collect(),
    )
}

pub struct TuningEngine {
    config: Arc<ConfigStore>,
    store: Arc<dyn DataStore>,
}

impl TuningEngine {
    pub fn new(config: Arc<ConfigStore>, store: Arc<dyn DataStore>) -> Self {
        Self { config, store }
    }

    /// Like [`TuningEngine::new`], but fails unless the data store answers.
    pub async fn connect(
        config: Arc<ConfigStore>,
        store: Arc<dyn DataStore>,
    ) -> TuningResult<Self> {
        store.ping().await?;
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    // ── Dispatch ─────────────────────────────────────────────

    /// Read path. A request with no type falls back to the config file, or to
    /// the overview when it carries no section or key either.
    pub async fn fetch(&self, req: &TuningRequest) -> TuningResult<ResultEnvelope> {
        debug!(metadata_type = ?req.metadata_type, id = req.identifier, "tuning fetch");
        match req.metadata_type {
            None if req.section.is_none() && req.key.is_none() => self.overview(),
            None | Some(RequestedType::Cfg) => {
                Ok(ResultEnvelope::single(self.get_config_value(req)?))
            }
            Some(RequestedType::All) => self.fan_out(req).await,
            Some(RequestedType::Metadata(t)) => {
                Ok(ResultEnvelope::single(self.get_metadata(t, req, true).await?))
            }
        }
    }

    /// Metadata update, or `set` of an existing config key.
    pub async fn update(&self, req: &TuningRequest) -> TuningResult<ResultEnvelope> {
        match req.metadata_type {
            None | Some(RequestedType::Cfg) => self.modify_config_file(ConfigAction::Set, req),
            Some(RequestedType::All) => {
                Err(TuningError::InvalidType(RequestedType::All.to_string()))
            }
            Some(RequestedType::Metadata(t)) => {
                Ok(ResultEnvelope::single(self.update_metadata(t, req).await?))
            }
        }
    }

    /// Metadata insert, or `add` of a new config key.
    pub async fn insert(&self, req: &TuningRequest) -> TuningResult<ResultEnvelope> {
        match req.metadata_type {
            None | Some(RequestedType::Cfg) => self.modify_config_file(ConfigAction::Add, req),
            Some(RequestedType::All) => {
                Err(TuningError::InvalidType(RequestedType::All.to_string()))
            }
            Some(RequestedType::Metadata(t)) => {
                Ok(ResultEnvelope::single(self.insert_metadata(t, req).await?))
            }
        }
    }

    /// Metadata delete. An untyped request naming a section and key removes
    /// that config key; `cfg` and `all` are refused.
    pub async fn delete(&self, req: &TuningRequest) -> TuningResult<ResultEnvelope> {
        if req.metadata_type.is_none() && req.section.is_some() && req.key.is_some() {
            return self.modify_config_file(ConfigAction::Delete, req);
        }
        Ok(ResultEnvelope::single(self.delete_metadata(req).await?))
    }

    // ── Config path ──────────────────────────────────────────

    /// Available types, their id columns and the redacted config tree.
    pub fn overview(&self) -> TuningResult<ResultEnvelope> {
        let types: Vec<&str> = RequestedType::tokens().collect();
        let id_fields: Map<String, Value> = MetadataType::ALL
            .iter()
            .map(|t| {
                let d = t.descriptor();
                (d.type_name.to_string(), Value::String(d.id_field.to_string()))
            })
            .collect();
        let tree = redact_tree(&self.config.read()?);
        Ok(ResultEnvelope::single(json!({
            "metadata_types": types,
            "id_field_names": id_fields,
            "cfg": tree_value(&tree),
        })))
    }

    /// Redacted config lookup. Misses yield `null`, never an error.
    pub fn get_config_value(&self, req: &TuningRequest) -> TuningResult<Value> {
        let tree = redact_tree(&self.config.read()?);
        let key = req.key_text();
        let value = match (req.section.as_deref(), key.as_deref()) {
            (None, None) => tree_value(&tree),
            (Some(section), None) => tree.get(section).map_or(Value::Null, section_value),
            (Some(section), Some(key)) => tree
                .get(section)
                .and_then(|s| s.get(key))
                .map_or(Value::Null, |v| Value::String(v.clone())),
            (None, Some(key)) => {
                let hits: Map<String, Value> = tree
                    .iter()
                    .filter_map(|(name, s)| {
                        s.get(key).map(|v| (name.clone(), Value::String(v.clone())))
                    })
                    .collect();
                if hits.is_empty() {
                    Value::Null
                } else {
                    Value::Object(hits)
                }
            }
        };
        Ok(value)
    }

    /// Apply `action` to `[section] key` of the config file.
    pub fn modify_config_file(
        &self,
        action: ConfigAction,
        req: &TuningRequest,
    ) -> TuningResult<ResultEnvelope> {
        let (Some(section), Some(key)) = (req.section.as_deref(), req.key_text()) else {
            return Err(TuningError::MissingConfigTarget);
        };
        let value = req.value_text();
        match action {
            ConfigAction::Set => {
                if !self.config.update(section, &key, &value)? {
                    return Err(TuningError::ConfigKeyNotFound {
                        section: section.to_string(),
                        key,
                    });
                }
                info!(section, key = %key, "config key updated");
            }
            ConfigAction::Add | ConfigAction::Delete => {
                self.config.modify(action, section, &key, &value)?;
            }
        }
        Ok(ResultEnvelope::single(Value::Bool(true)))
    }

    // ── Metadata path ────────────────────────────────────────

    async fn verified_column(&self, t: MetadataType, name: &str) -> TuningResult<ColumnName> {
        let desc = t.descriptor();
        let columns = self.store.column_names(desc.table).await?;
        ColumnName::verified(desc.table, name, &columns)
    }

    /// Rows of `t`, optionally narrowed to one id and, when `with_column` is
    /// set and the key names a single column, to that column.
    pub async fn get_metadata(
        &self,
        t: MetadataType,
        req: &TuningRequest,
        with_column: bool,
    ) -> TuningResult<Value> {
        let column = match req.key_text().filter(|_| with_column) {
            Some(name) => Some(self.verified_column(t, &name).await?),
            None => None,
        };
        let stmt = query::build_select(&t.descriptor(), req.identifier, column.as_ref());
        let outcome = self.store.execute(&stmt, QueryMode::Select).await?;
        Ok(outcome.into_value())
    }

    /// One select per catalog type followed by the config under `cfg`. The
    /// first failing sub-fetch aborts the whole request.
    pub async fn fan_out(&self, req: &TuningRequest) -> TuningResult<ResultEnvelope> {
        let mut builder = FanOutBuilder::new();
        for t in MetadataType::ALL {
            let rows = self.get_metadata(t, req, false).await?;
            builder.append(t.token(), rows);
        }
        builder.append(CFG_TOKEN, self.get_config_value(req)?);
        debug!(entries = builder.len(), "fan-out complete");
        Ok(builder.finish())
    }

    pub async fn insert_metadata(
        &self,
        t: MetadataType,
        req: &TuningRequest,
    ) -> TuningResult<Value> {
        let fields = req.field_list();
        let values = req.value_list();
        query::check_insert_shape(fields.len(), values.len())?;

        let desc = t.descriptor();
        let known = self.store.column_names(desc.table).await?;
        let columns = fields
            .iter()
            .map(|f| ColumnName::verified(desc.table, f, &known))
            .collect::<TuningResult<Vec<_>>>()?;

        let stmt = query::build_insert(&desc, &columns, &values)?;
        let outcome = self.store.execute(&stmt, QueryMode::Insert).await?;
        info!(metadata_type = %t, table = desc.table, "metadata inserted");
        Ok(outcome.into_value())
    }

    pub async fn update_metadata(
        &self,
        t: MetadataType,
        req: &TuningRequest,
    ) -> TuningResult<Value> {
        if req.identifier == 0 {
            return Err(TuningError::NoIdentifier);
        }
        let desc = t.descriptor();
        let name = req.key_text().ok_or_else(|| TuningError::InvalidColumn {
            table: desc.table,
            column: req.key.as_ref().map(Value::to_string).unwrap_or_default(),
        })?;
        let column = self.verified_column(t, &name).await?;
        let value = req.value.clone().unwrap_or(Value::Null);

        let stmt = query::build_update(&desc, req.identifier, &column, value)?;
        let outcome = self.store.execute(&stmt, QueryMode::Modify).await?;
        info!(metadata_type = %t, id = req.identifier, column = %column, "metadata updated");
        Ok(outcome.into_value())
    }

    pub async fn delete_metadata(&self, req: &TuningRequest) -> TuningResult<Value> {
        let t = match req.metadata_type {
            None => return Err(TuningError::MissingType),
            Some(RequestedType::Metadata(t)) => t,
            Some(other) => return Err(TuningError::InvalidTypeForDeletion(other.to_string())),
        };
        let stmt = query::build_delete(&t.descriptor(), req.identifier)?;
        let outcome = self.store.execute(&stmt, QueryMode::Modify).await?;
        info!(metadata_type = %t, id = req.identifier, "metadata deleted");
        Ok(outcome.into_value())
    }
}
