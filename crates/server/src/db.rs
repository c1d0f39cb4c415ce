//! MySQL-backed [`DataStore`].

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlPool, Row};
use tracing::{debug, info, warn};

use inquisition_core::config::MysqlConfig;
use inquisition_tuning::{DataStore, QueryMode, QueryOutcome, Statement, TuningError, TuningResult};

/// Create the MySQL pool. Returns None (and logs why) if the server cannot
/// be reached.
pub async fn init_mysql_pool(config: &MysqlConfig, max_connections: u32) -> Option<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.username)
        .password(&config.password);

    match MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
    {
        Ok(pool) => {
            info!("MySQL connected: {}", config.display_url());
            Some(pool)
        }
        Err(e) => {
            warn!(
                "Failed to connect to MySQL at {}: {}; tuning and alerts disabled",
                config.display_url(),
                e
            );
            None
        }
    }
}

fn map_err(e: sqlx::Error) -> TuningError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => TuningError::DataStoreConnection(e.to_string()),
        other => TuningError::DataStoreQuery(other.to_string()),
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// Decode one cell by trying the column types the schema uses.
fn cell_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map_or(Value::Null, float_value);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map_or(Value::Null, Value::String);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map_or(Value::Null, |t| {
            Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string())
        });
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map_or(Value::Null, |d| Value::String(d.to_string()));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map_or(Value::Null, Value::Bool);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map_or(Value::Null, |b| Value::String(String::from_utf8_lossy(&b).into_owned()));
    }
    Value::Null
}

fn row_to_json(row: &MySqlRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_value(row, col.ordinal())))
        .collect()
}

pub struct MySqlDataStore {
    pool: MySqlPool,
}

impl MySqlDataStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for MySqlDataStore {
    async fn execute(&self, stmt: &Statement, mode: QueryMode) -> TuningResult<QueryOutcome> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), ?mode, "executing statement");
        let query = stmt
            .params
            .iter()
            .fold(sqlx::query(&stmt.sql), bind_value);

        match mode {
            QueryMode::Select => {
                let rows = query.fetch_all(&self.pool).await.map_err(map_err)?;
                Ok(QueryOutcome::Rows(rows.iter().map(row_to_json).collect()))
            }
            QueryMode::Insert => {
                let result = query.execute(&self.pool).await.map_err(map_err)?;
                Ok(QueryOutcome::Inserted {
                    id: result.last_insert_id(),
                })
            }
            QueryMode::Modify => {
                let result = query.execute(&self.pool).await.map_err(map_err)?;
                Ok(QueryOutcome::Affected(result.rows_affected() > 0))
            }
        }
    }

    async fn column_names(&self, table: &str) -> TuningResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn ping(&self) -> TuningResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_err)
    }
}
