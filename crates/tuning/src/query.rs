//! Parameterised statements against catalog tables.
//!
//! Table and id column names only ever come from a [`MetadataDescriptor`];
//! any other identifier must be a [`ColumnName`], which can only be obtained
//! by checking a candidate against the table's live column list.

use std::fmt;

use serde_json::Value;

use crate::catalog::MetadataDescriptor;
use crate::error::{TuningError, TuningResult};

/// SQL text plus positional values for its `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A column name verified to exist on a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName(String);

impl ColumnName {
    /// Accept `candidate` only if it is one of `columns` (exact match).
    pub fn verified(
        table: &'static str,
        candidate: &str,
        columns: &[String],
    ) -> TuningResult<Self> {
        columns
            .iter()
            .find(|c| c.as_str() == candidate)
            .map(|c| ColumnName(c.clone()))
            .ok_or_else(|| TuningError::InvalidColumn {
                table,
                column: candidate.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub fn build_select(
    desc: &MetadataDescriptor,
    id: u64,
    column: Option<&ColumnName>,
) -> Statement {
    let columns = column.map_or_else(|| "*".to_string(), |c| quote_ident(c.as_str()));
    let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(desc.table));
    let mut params = Vec::new();
    if id > 0 {
        sql.push_str(&format!(" WHERE {} = ?", quote_ident(desc.id_field)));
        params.push(Value::from(id));
    }
    Statement::new(sql, params)
}

/// Field/value cardinality rules shared by the builder and the engine, which
/// checks them before it introspects anything.
pub fn check_insert_shape(fields: usize, values: usize) -> TuningResult<()> {
    if fields == 0 {
        return Err(TuningError::NoFieldsProvided);
    }
    if values == 0 {
        return Err(TuningError::NoValuesProvided);
    }
    if fields != values {
        return Err(TuningError::FieldValueMismatch { fields, values });
    }
    Ok(())
}

pub fn build_insert(
    desc: &MetadataDescriptor,
    fields: &[ColumnName],
    values: &[Value],
) -> TuningResult<Statement> {
    check_insert_shape(fields.len(), values.len())?;

    let columns: Vec<String> = fields.iter().map(|f| quote_ident(f.as_str())).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(desc.table),
        columns.join(", "),
        placeholders
    );
    Ok(Statement::new(sql, values.to_vec()))
}

pub fn build_update(
    desc: &MetadataDescriptor,
    id: u64,
    column: &ColumnName,
    value: Value,
) -> TuningResult<Statement> {
    if id == 0 {
        return Err(TuningError::NoIdentifier);
    }
    let sql = format!(
        "UPDATE {} SET {} = ? WHERE {} = ? LIMIT 1",
        quote_ident(desc.table),
        quote_ident(column.as_str()),
        quote_ident(desc.id_field)
    );
    Ok(Statement::new(sql, vec![value, Value::from(id)]))
}

pub fn build_delete(desc: &MetadataDescriptor, id: u64) -> TuningResult<Statement> {
    if id == 0 {
        return Err(TuningError::NoIdentifier);
    }
    let sql = format!(
        "DELETE FROM {} WHERE {} = ? LIMIT 1",
        quote_ident(desc.table),
        quote_ident(desc.id_field)
    );
    Ok(Statement::new(sql, vec![Value::from(id)]))
}
