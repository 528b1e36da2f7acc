//! Row loader: feeds parsed rows into a relational store.
//!
//! The parser never assumes a target width. This module is the one place
//! where a row's value count is reconciled with the target column list:
//! short rows are padded with NULL, long rows are cut, and both are counted.
//! Each row is written on its own, so a rejected row never takes the rest
//! of the blob down with it.

mod store;
mod summary;

pub use store::{
    create_table_sql, insert_sql, is_duplicate_error, quote_ident, DuckDbStore, RowStore,
    StoreError,
};
pub use summary::{LoadSummary, MAX_REPORTED_MALFORMED};

use crate::input;
use crate::parser::{parse_row, segment, Value};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Destination table and its fixed column list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTable {
    pub name: String,
    pub columns: Vec<String>,
    /// Business key column, UNIQUE in created tables
    #[serde(default)]
    pub key_column: Option<String>,
}

impl TargetTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            key_column: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key_column = Some(key.into());
        self
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of the key column in the column list
    pub fn key_index(&self) -> Option<usize> {
        let key = self.key_column.as_deref()?;
        self.columns.iter().position(|c| c == key)
    }

    /// Reject targets no store could write to
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Target table name is empty");
        }
        if self.columns.is_empty() {
            bail!("Target table {} has no columns", self.name);
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.trim().is_empty() {
                bail!("Target table {} has an empty column name", self.name);
            }
            if !seen.insert(column.to_lowercase()) {
                bail!("Column {} appears twice in table {}", column, self.name);
            }
        }

        if let Some(key) = &self.key_column {
            if self.key_index().is_none() {
                bail!(
                    "Key column {} is not one of the columns of table {}",
                    key,
                    self.name
                );
            }
        }
        Ok(())
    }
}

/// How a row's value count compared with the target width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Exact,
    /// This many NULLs were appended
    Padded(usize),
    /// This many trailing values were dropped
    Truncated(usize),
}

/// Pad with NULL or truncate on the right so the row has exactly `width` values
pub fn fit_to_width(mut values: Vec<Value>, width: usize) -> (Vec<Value>, Arity) {
    let len = values.len();
    if len < width {
        values.resize(width, Value::Null);
        (values, Arity::Padded(width - len))
    } else if len > width {
        values.truncate(width);
        (values, Arity::Truncated(len - width))
    } else {
        (values, Arity::Exact)
    }
}

/// Drives parsed rows into a [`RowStore`]
pub struct Loader<S: RowStore> {
    store: S,
    progress: bool,
}

impl<S: RowStore> Loader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            progress: false,
        }
    }

    /// Show a progress bar while loading each blob
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Validate the target and get the store ready for it
    pub fn prepare(&mut self, target: &TargetTable, create: bool) -> Result<()> {
        target.validate()?;
        self.store
            .prepare(target, create)
            .with_context(|| format!("Failed to prepare table {}", target.name))?;
        Ok(())
    }

    /// Parse one blob and write every recovered row.
    ///
    /// Never fails: malformed fragments, duplicates and rejected rows are
    /// logged and counted in the returned summary.
    pub fn load_blob(&mut self, source: &str, blob: &str, target: &TargetTable) -> LoadSummary {
        let start = Instant::now();
        let mut summary = LoadSummary::new(&target.name);
        summary.files.push(source.to_string());

        let width = target.width();
        let progress_bar = self.progress_bar(blob.len() as u64);

        let mut segmenter = segment(blob);
        for item in segmenter.by_ref() {
            let raw = match item {
                Ok(raw) => raw,
                Err(malformed) => {
                    warn!(file = source, table = %target.name, "Dropped {}", malformed);
                    summary.record_malformed(malformed.to_string());
                    continue;
                }
            };

            summary.rows_parsed += 1;
            let (values, arity) = fit_to_width(parse_row(raw.text), width);
            match arity {
                Arity::Exact => {}
                Arity::Padded(n) => {
                    summary.padded += 1;
                    debug!(file = source, offset = raw.offset, "Row padded with {} NULLs", n);
                }
                Arity::Truncated(n) => {
                    summary.truncated += 1;
                    debug!(file = source, offset = raw.offset, "Row truncated by {} values", n);
                }
            }

            match self.store.insert(target, &values) {
                Ok(()) => summary.inserted += 1,
                Err(StoreError::Duplicate { key, .. }) => {
                    summary.duplicates += 1;
                    debug!(file = source, table = %target.name, key = %key, "Skipping duplicate row");
                }
                Err(StoreError::Failed { message }) => {
                    summary.failed += 1;
                    error!(
                        file = source,
                        table = %target.name,
                        offset = raw.offset,
                        error = %message,
                        "Failed to insert row"
                    );
                }
            }

            if let Some(pb) = &progress_bar {
                pb.set_position((raw.offset + raw.text.len()) as u64);
            }
        }
        summary.statements = segmenter.statements().len() as u64;

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        summary.duration_secs = start.elapsed().as_secs_f64();
        info!(file = source, "{}", summary);
        summary
    }

    /// Read a (possibly compressed) file and load it
    pub fn load_file(&mut self, path: &Path, target: &TargetTable) -> Result<LoadSummary> {
        let blob = input::read_blob(path)?;
        Ok(self.load_blob(&path.display().to_string(), &blob, target))
    }

    /// Record the target's row count in `summary`, when the store can tell
    pub fn verify(&mut self, target: &TargetTable, summary: &mut LoadSummary) -> Result<()> {
        summary.table_rows = self
            .store
            .row_count(target)
            .with_context(|| format!("Failed to count rows of {}", target.name))?;
        Ok(())
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    }
}
