//! Load accounting.

use serde::Serialize;
use std::fmt;

/// Diagnostic texts kept per summary; the count keeps growing past this
pub const MAX_REPORTED_MALFORMED: usize = 100;

/// What happened to every row of one or more source files
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    /// Target table name
    pub table: String,
    /// Source files that contributed rows
    pub files: Vec<String>,
    /// `INSERT ... VALUES` statements seen
    pub statements: u64,
    /// Row groups recovered by the parser
    pub rows_parsed: u64,
    pub inserted: u64,
    /// Rows skipped because their key already existed
    pub duplicates: u64,
    /// Rows rejected by the store for any other reason
    pub failed: u64,
    /// Rows shorter than the target, padded with NULL
    pub padded: u64,
    /// Rows longer than the target, cut to width
    pub truncated: u64,
    /// Malformed fragments dropped by the parser
    pub malformed_count: u64,
    /// Descriptions of the first dropped fragments
    pub malformed: Vec<String>,
    /// Row count of the target table after loading, when known
    pub table_rows: Option<u64>,
    pub duration_secs: f64,
}

impl LoadSummary {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn record_malformed(&mut self, description: String) {
        self.malformed_count += 1;
        if self.malformed.len() < MAX_REPORTED_MALFORMED {
            self.malformed.push(description);
        }
    }

    /// Fold another summary for the same target into this one
    pub fn merge(&mut self, other: &LoadSummary) {
        if self.table.is_empty() {
            self.table = other.table.clone();
        }
        self.files.extend(other.files.iter().cloned());
        self.statements += other.statements;
        self.rows_parsed += other.rows_parsed;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
        self.padded += other.padded;
        self.truncated += other.truncated;
        self.malformed_count += other.malformed_count;
        for m in &other.malformed {
            if self.malformed.len() >= MAX_REPORTED_MALFORMED {
                break;
            }
            self.malformed.push(m.clone());
        }
        if other.table_rows.is_some() {
            self.table_rows = other.table_rows;
        }
        self.duration_secs += other.duration_secs;
    }

    /// Rows not written for any reason
    pub fn skipped(&self) -> u64 {
        self.duplicates + self.failed
    }

    /// No dropped fragments and no failed rows. Duplicates and arity fixes
    /// are expected during reloads and do not count.
    pub fn is_clean(&self) -> bool {
        self.malformed_count == 0 && self.failed == 0
    }

    /// Multi-line report for terminals
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Table: {}\n", self.table));
        out.push_str(&format!("  Files:        {}\n", self.files.len()));
        out.push_str(&format!("  Statements:   {}\n", self.statements));
        out.push_str(&format!("  Rows parsed:  {}\n", self.rows_parsed));
        out.push_str(&format!("  Inserted:     {}\n", self.inserted));
        out.push_str(&format!("  Duplicates:   {}\n", self.duplicates));
        out.push_str(&format!("  Failed:       {}\n", self.failed));
        if self.padded > 0 || self.truncated > 0 {
            out.push_str(&format!(
                "  Arity fixed:  {} padded, {} truncated\n",
                self.padded, self.truncated
            ));
        }
        if self.malformed_count > 0 {
            out.push_str(&format!("  Malformed:    {}\n", self.malformed_count));
            for m in &self.malformed {
                out.push_str(&format!("    - {}\n", m));
            }
            let hidden = self.malformed_count as usize - self.malformed.len();
            if hidden > 0 {
                out.push_str(&format!("    ... and {} more\n", hidden));
            }
        }
        if let Some(rows) = self.table_rows {
            out.push_str(&format!("  Table rows:   {}\n", rows));
        }
        out.push_str(&format!("  Time:         {:.2}s\n", self.duration_secs));
        out
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} parsed, {} inserted, {} duplicates, {} failed, {} malformed in {:.2}s",
            self.table,
            self.rows_parsed,
            self.inserted,
            self.duplicates,
            self.failed,
            self.malformed_count,
            self.duration_secs
        )
    }
}
