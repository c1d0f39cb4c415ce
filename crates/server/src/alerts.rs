//! Alert listing and deletion against the `Alerts` table.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use inquisition_tuning::{DataStore, QueryMode, ResultEnvelope, Statement, TuningError};

use crate::cache::{generate_key, Cache};

pub const ALERTS_TABLE: &str = "Alerts";

pub const ALERT_COLUMNS: [&str; 8] = [
    "alert_id",
    "alert_type",
    "created",
    "host",
    "src_node",
    "dst_node",
    "alert_detail",
    "log_data",
];

/// Columns a listing may be ordered by.
pub const ORDERABLE_COLUMNS: [&str; 6] = [
    "alert_id",
    "alert_type",
    "created",
    "host",
    "src_node",
    "dst_node",
];

const DEFAULT_LIMIT: u64 = 5;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("invalid alert id: {0:?}")]
    InvalidIdentifier(String),

    #[error("no alert id provided")]
    NoIdentifier,

    #[error("invalid alert type: {0:?}")]
    InvalidType(String),

    #[error("cannot order alerts by {0:?}")]
    InvalidOrder(String),

    #[error("invalid placement {0:?}; expected ASC or DESC")]
    InvalidPlacement(String),

    #[error("invalid result limit: {0:?}")]
    InvalidLimit(String),

    #[error(transparent)]
    Store(#[from] TuningError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Placement {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Placement::Asc),
            "DESC" => Ok(Placement::Desc),
            _ => Err(AlertError::InvalidPlacement(s.to_string())),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Placement::Asc => "ASC",
            Placement::Desc => "DESC",
        })
    }
}

// ── Filter ────────────────────────────────────────────────────

/// Incrementally built `WHERE` clause with positional values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AlertFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s == "0",
        _ => false,
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column <operator> ?`. Unset values are skipped, and so are
    /// zero values unless `allow_zero` is set.
    pub fn add_constraint(
        &mut self,
        column: &'static str,
        value: impl Into<Value>,
        operator: &'static str,
        allow_zero: bool,
    ) -> &mut Self {
        let value = value.into();
        if is_unset(&value) || (is_zero(&value) && !allow_zero) {
            return self;
        }
        self.clauses.push(format!("`{}` {} ?", column, operator));
        self.params.push(value);
        self
    }

    pub fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

// ── Query ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AlertQuery {
    /// 0 means "not set"; a set id disables every other filter.
    pub id: u64,
    pub alert_type: u64,
    pub after: Option<String>,
    pub before: Option<String>,
    pub host: Option<String>,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub order_by: &'static str,
    pub placement: Placement,
    /// 0 means unlimited.
    pub limit: u64,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            id: 0,
            alert_type: 0,
            after: None,
            before: None,
            host: None,
            src: None,
            dst: None,
            order_by: "created",
            placement: Placement::Asc,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_u64(raw: &str, err: fn(String) -> AlertError) -> Result<u64, AlertError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| err(raw.to_string()))
}

fn text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

impl AlertQuery {
    /// Build from caller options (`id|i`, `type|t`, `after|a`, `before|b`,
    /// `host|h`, `src|s`, `dst|d`, `order|o`, `placement|p`, `limit|l`).
    pub fn from_options<I, K, V>(opts: I) -> Result<Self, AlertError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut q = Self::default();
        for (name, raw) in opts {
            let raw = raw.as_ref();
            match name.as_ref().to_ascii_lowercase().as_str() {
                "id" | "i" => q.id = parse_u64(raw, AlertError::InvalidIdentifier)?,
                "type" | "t" => q.alert_type = parse_u64(raw, AlertError::InvalidType)?,
                "after" | "a" => q.after = text(raw),
                "before" | "b" => q.before = text(raw),
                "host" | "h" => q.host = text(raw),
                "src" | "s" => q.src = text(raw),
                "dst" | "d" => q.dst = text(raw),
                "order" | "o" => {
                    q.order_by = ORDERABLE_COLUMNS
                        .into_iter()
                        .find(|c| *c == raw.trim())
                        .ok_or_else(|| AlertError::InvalidOrder(raw.to_string()))?;
                }
                "placement" | "p" => q.placement = raw.trim().parse()?,
                "limit" | "l" => {
                    q.limit = raw
                        .trim()
                        .parse()
                        .map_err(|_| AlertError::InvalidLimit(raw.to_string()))?;
                }
                other => debug!(option = other, "ignoring unrecognised alert option"),
            }
        }
        Ok(q)
    }

    pub fn filter(&self) -> AlertFilter {
        let mut filter = AlertFilter::new();
        if self.id > 0 {
            filter.add_constraint("alert_id", self.id, "=", false);
            return filter;
        }
        filter
            .add_constraint("alert_type", self.alert_type, "=", false)
            .add_constraint("created", self.after.clone(), ">=", false)
            .add_constraint("created", self.before.clone(), "<=", false)
            .add_constraint("host", self.host.clone(), "=", false)
            .add_constraint("src_node", self.src.clone(), "=", false)
            .add_constraint("dst_node", self.dst.clone(), "=", false);
        filter
    }

    pub fn statement(&self) -> Statement {
        let filter = self.filter();
        let columns: Vec<String> = ALERT_COLUMNS.iter().map(|c| format!("`{c}`")).collect();
        let mut sql = format!("SELECT {} FROM `{}`", columns.join(", "), ALERTS_TABLE);
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.where_clause());
        }
        sql.push_str(&format!(" ORDER BY `{}` {}", self.order_by, self.placement));
        if self.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }
        Statement::new(sql, filter.params().to_vec())
    }
}

pub fn delete_statement(id: u64) -> Result<Statement, AlertError> {
    if id == 0 {
        return Err(AlertError::NoIdentifier);
    }
    Ok(Statement::new(
        format!("DELETE FROM `{}` WHERE `alert_id` = ? LIMIT 1", ALERTS_TABLE),
        vec![Value::from(id)],
    ))
}

// ── Operations ────────────────────────────────────────────────

/// Run `query`, serving from and refilling the cache when one is configured.
/// Cache failures are logged and fall through to the database.
pub async fn fetch_alerts(
    store: &dyn DataStore,
    cache: Option<&Cache>,
    query: &AlertQuery,
) -> Result<ResultEnvelope, AlertError> {
    let stmt = query.statement();
    let key = generate_key(&json!({ "sql": stmt.sql, "params": stmt.params }), "alerts");

    if let Some(cache) = cache {
        match cache.read::<Value>(&key).await {
            Ok(Some(data)) => return Ok(ResultEnvelope::single(data).with_source("cache")),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "alert cache read failed"),
        }
    }

    let data = store.execute(&stmt, QueryMode::Select).await?.into_value();
    if let Some(cache) = cache {
        if let Err(e) = cache.write(&key, &data).await {
            warn!(error = %e, "alert cache write failed");
        }
    }
    Ok(ResultEnvelope::single(data).with_source("db"))
}

pub async fn delete_alert(store: &dyn DataStore, id: u64) -> Result<ResultEnvelope, AlertError> {
    let stmt = delete_statement(id)?;
    let outcome = store.execute(&stmt, QueryMode::Modify).await?;
    Ok(ResultEnvelope::single(outcome.into_value()))
}
