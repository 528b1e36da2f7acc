//! Relational row stores.

use super::TargetTable;
use crate::parser::Value;
use anyhow::{Context, Result};
use duckdb::{params_from_iter, Connection};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Why a single row write was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The row's business key is already present
    #[error("duplicate key '{key}': {message}")]
    Duplicate { key: String, message: String },

    /// Any other store-level failure
    #[error("{message}")]
    Failed { message: String },
}

impl StoreError {
    pub fn failed(message: impl Into<String>) -> Self {
        StoreError::Failed {
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// Destination for parsed rows, one write per row.
///
/// Values arrive already fitted to the target width.
pub trait RowStore {
    /// Make the target table ready for writes, creating it when `create` is set
    fn prepare(&mut self, target: &TargetTable, create: bool) -> Result<(), StoreError>;

    /// Write one row
    fn insert(&mut self, target: &TargetTable, values: &[Value]) -> Result<(), StoreError>;

    /// Number of rows currently in the target, when the store can tell
    fn row_count(&mut self, _target: &TargetTable) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }
}

/// Row store backed by an embedded DuckDB database
pub struct DuckDbStore {
    conn: Connection,
    insert_sql: HashMap<String, String>,
}

impl DuckDbStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database: {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to create in-memory DuckDB database")?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            insert_sql: HashMap::new(),
        }
    }

    /// Cap DuckDB's memory use, e.g. "4GB"
    pub fn set_memory_limit(&self, limit: &str) -> Result<()> {
        self.conn
            .execute(&format!("SET memory_limit = '{}'", limit.replace('\'', "''")), [])
            .context("Failed to set memory limit")?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE lower(table_name) = lower(?)",
                [name],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::failed(e.to_string()))?;
        Ok(count > 0)
    }
}

impl RowStore for DuckDbStore {
    fn prepare(&mut self, target: &TargetTable, create: bool) -> Result<(), StoreError> {
        if create {
            self.conn
                .execute(&create_table_sql(target), [])
                .map_err(|e| StoreError::failed(format!("create table {}: {}", target.name, e)))?;
        } else if !self.table_exists(&target.name)? {
            return Err(StoreError::failed(format!(
                "table {} does not exist (use --create-table to create it)",
                target.name
            )));
        }

        self.insert_sql
            .insert(target.name.clone(), insert_sql(target));
        Ok(())
    }

    fn insert(&mut self, target: &TargetTable, values: &[Value]) -> Result<(), StoreError> {
        if !self.insert_sql.contains_key(&target.name) {
            self.insert_sql
                .insert(target.name.clone(), insert_sql(target));
        }
        let sql = &self.insert_sql[&target.name];

        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| StoreError::failed(e.to_string()))?;

        match stmt.execute(params_from_iter(values.iter().map(Value::as_text))) {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                if is_duplicate_error(&message) {
                    let key = target
                        .key_index()
                        .and_then(|i| values.get(i))
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    Err(StoreError::Duplicate { key, message })
                } else {
                    Err(StoreError::Failed { message })
                }
            }
        }
    }

    fn row_count(&mut self, target: &TargetTable) -> Result<Option<u64>, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&target.name));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| StoreError::failed(e.to_string()))?;
        Ok(Some(count.max(0) as u64))
    }
}

/// Unique and primary key violations, across DuckDB message variants
pub fn is_duplicate_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("duplicate key")
        || lower.contains("unique constraint")
        || lower.contains("primary key constraint")
}

/// Double-quote an identifier for DuckDB
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` with every column TEXT and the key UNIQUE
pub fn create_table_sql(target: &TargetTable) -> String {
    let columns: Vec<String> = target
        .columns
        .iter()
        .map(|c| {
            if target.key_column.as_deref() == Some(c.as_str()) {
                format!("{} TEXT UNIQUE", quote_ident(c))
            } else {
                format!("{} TEXT", quote_ident(c))
            }
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&target.name),
        columns.join(", ")
    )
}

/// Parameterized `INSERT` covering every target column
pub fn insert_sql(target: &TargetTable) -> String {
    let columns: Vec<String> = target.columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; target.columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&target.name),
        columns.join(", "),
        placeholders
    )
}
