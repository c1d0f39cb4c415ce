use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TuningResult;
use crate::query::Statement;

/// One result row, column name to value, in select-list order.
pub type Row = Map<String, Value>;

/// Selects the shape of the result a statement produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Select,
    Insert,
    Modify,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Inserted { id: u64 },
    /// Whether at least one row was changed.
    Affected(bool),
}

impl QueryOutcome {
    pub fn into_value(self) -> Value {
        match self {
            QueryOutcome::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
            QueryOutcome::Inserted { id } => serde_json::json!({ "id": id }),
            QueryOutcome::Affected(changed) => Value::Bool(changed),
        }
    }
}

/// Relational backend the tuning engine runs its statements against.
///
/// Implementations must bind `Statement::params` positionally and never
/// interpolate them into the SQL text.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn execute(&self, stmt: &Statement, mode: QueryMode) -> TuningResult<QueryOutcome>;

    /// Column names of `table`, used to verify caller-supplied identifiers.
    async fn column_names(&self, table: &str) -> TuningResult<Vec<String>>;

    async fn ping(&self) -> TuningResult<()> {
        Ok(())
    }
}
