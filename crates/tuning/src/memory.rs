//! In-memory [`DataStore`] that records every statement it is asked to run.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::MetadataDescriptor;
use crate::error::{TuningError, TuningResult};
use crate::query::Statement;
use crate::store::{DataStore, QueryMode, QueryOutcome, Row};

#[derive(Debug, Default)]
struct Table {
    id_field: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Rows matched by a `WHERE <id> = ?` clause, or all rows without one.
    fn matching<'a>(&'a self, stmt: &'a Statement) -> impl Iterator<Item = &'a Row> + 'a {
        let by_id = stmt.sql.contains(&format!("WHERE `{}` = ?", self.id_field));
        let id = if stmt.sql.starts_with("UPDATE") {
            stmt.params.last()
        } else {
            stmt.params.first()
        };
        self.rows
            .iter()
            .filter(move |row| !by_id || row.get(&self.id_field) == id)
    }
}

#[derive(Debug, Default)]
pub struct RecordingStore {
    tables: HashMap<String, Table>,
    failing: HashSet<String>,
    offline: bool,
    next_id: Mutex<u64>,
    executed: Mutex<Vec<(Statement, QueryMode)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            ..Default::default()
        }
    }

    /// Register a table; `rows` must be JSON objects.
    pub fn with_table(
        mut self,
        table: &str,
        id_field: &str,
        columns: &[&str],
        rows: Vec<Value>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|r| match r {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(
            table.to_string(),
            Table {
                id_field: id_field.to_string(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        );
        self
    }

    /// Register every catalog table with its id column plus `extra` columns
    /// and no rows.
    pub fn with_catalog(mut self, extra: &[&str]) -> Self {
        for t in crate::catalog::MetadataType::ALL {
            let MetadataDescriptor { table, id_field, .. } = t.descriptor();
            let columns: Vec<&str> =
                std::iter::once(id_field).chain(extra.iter().copied()).collect();
            self = self.with_table(table, id_field, &columns, Vec::new());
        }
        self
    }

    /// Every statement touching `table` fails with a query error.
    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    /// Every call fails with a connection error.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_next_id(self, id: u64) -> Self {
        *self.next_id.lock().unwrap_or_else(PoisonError::into_inner) = id;
        self
    }

    pub fn executed(&self) -> Vec<(Statement, QueryMode)> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_online(&self) -> TuningResult<()> {
        if self.offline {
            return Err(TuningError::DataStoreConnection("store is offline".into()));
        }
        Ok(())
    }

    fn table_for(&self, sql: &str) -> Option<(&str, &Table)> {
        self.tables
            .iter()
            .find(|(name, _)| sql.contains(&format!("`{name}`")))
            .map(|(name, table)| (name.as_str(), table))
    }

    fn select(table: &Table, stmt: &Statement) -> Vec<Row> {
        // "SELECT `a`, `b` FROM ..." projects the listed columns.
        let projection: Option<Vec<String>> = stmt
            .sql
            .strip_prefix("SELECT ")
            .and_then(|rest| rest.split_once(" FROM "))
            .map(|(list, _)| list.trim())
            .filter(|list| *list != "*")
            .map(|list| {
                list.split(',')
                    .map(|c| c.trim().trim_matches('`').to_string())
                    .collect()
            });

        table
            .matching(stmt)
            .map(|row| match &projection {
                Some(cols) => cols
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect(),
                None => row.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl DataStore for RecordingStore {
    async fn execute(&self, stmt: &Statement, mode: QueryMode) -> TuningResult<QueryOutcome> {
        self.check_online()?;
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((stmt.clone(), mode));

        let Some((name, table)) = self.table_for(&stmt.sql) else {
            return Err(TuningError::DataStoreQuery(format!("unknown table in: {}", stmt.sql)));
        };
        if self.failing.contains(name) {
            return Err(TuningError::DataStoreQuery(format!("{name} is unavailable")));
        }

        Ok(match mode {
            QueryMode::Select => QueryOutcome::Rows(Self::select(table, stmt)),
            QueryMode::Insert => {
                let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
                let id = *next;
                *next += 1;
                QueryOutcome::Inserted { id }
            }
            QueryMode::Modify => QueryOutcome::Affected(table.matching(stmt).next().is_some()),
        })
    }

    async fn column_names(&self, table: &str) -> TuningResult<Vec<String>> {
        self.check_online()?;
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn ping(&self) -> TuningResult<()> {
        self.check_online()
    }
}
