//! Read-only query execution against the listing database.
//!
//! Queries arrive already accepted by the query guard. The executor still
//! refuses any statement SQLite does not report as read-only, runs the query
//! on the blocking pool, and returns each row as a JSON object whose keys
//! follow the select-list order.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Number, Value};

use dwell_core::{CollaboratorError, ExecutionResult, QueryExecutor, Record};

use crate::db::Database;

/// Runs validated search queries against a [`Database`].
pub struct SqliteExecutor {
    db: Arc<Database>,
}

impl SqliteExecutor {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, query: &str) -> Result<ExecutionResult, CollaboratorError> {
        let db = Arc::clone(&self.db);
        let query = query.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            db.with_conn(|conn| Ok(select_records(conn, &query)))
        })
        .await
        .map_err(|e| CollaboratorError::Unavailable(format!("query task failed: {}", e)))?
        .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        match outcome {
            Ok(rows) => {
                tracing::debug!(rows = rows.len(), "Listing query returned");
                Ok(ExecutionResult::ok(rows))
            }
            Err(message) => {
                tracing::warn!(error = %message, "Listing query failed");
                Ok(ExecutionResult::failed(message))
            }
        }
    }
}

fn select_records(conn: &Connection, query: &str) -> Result<Vec<Record>, String> {
    let mut stmt = conn.prepare(query).map_err(|e| e.to_string())?;
    if !stmt.readonly() {
        return Err("statement is not read-only".to_string());
    }

    let columns = unique_column_names(&stmt.column_names());
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut record = Record::new();
        for (i, name) in columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(|e| e.to_string())?;
            record.insert(name.clone(), to_json(value));
        }
        records.push(record);
    }
    Ok(records)
}

/// Column labels with repeats suffixed (`id`, `id_2`, ...), so a join that
/// selects two `id` columns keeps both.
fn unique_column_names(names: &[&str]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut label = name.to_string();
        let mut n = 2;
        while seen.contains(&label) {
            label = format!("{}_{}", name, n);
            n += 1;
        }
        seen.push(label);
    }
    seen
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
