//! Literal row extraction from SQL `INSERT ... VALUES` text.
//!
//! Three passes compose into one pure function from a blob to rows:
//!
//! - [`segment`] finds each row group and yields its inner text
//! - [`tokenize`] splits one row into positional field tokens
//! - [`normalize`] maps each token to a [`Value`]
//!
//! No SQL grammar is involved. Quoted literals may contain commas,
//! parentheses, semicolons and backslash escapes; escapes are kept verbatim.
//! Parsing holds no state across calls; independent blobs may be parsed
//! from several threads at once.

mod normalize;
mod scan;
mod segment;
mod tokenize;


pub use normalize::{normalize, Value};
pub use scan::ScanState;
pub use segment::{MalformedInput, MalformedKind, RawRow, Segmenter, StatementHeader};
pub use tokenize::{FieldToken, Tokenizer};

use serde::Serialize;
use std::fmt;

/// Structural shape of a blob, detected from its headers and row groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobShape {
    /// No row groups at all
    #[default]
    Empty,
    /// Repeated `INSERT ... VALUES (...)` statements, one row each
    PerRow,
    /// One statement followed by many row groups
    Batched,
    /// Several statements, at least one carrying multiple row groups
    Mixed,
}

impl fmt::Display for BlobShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobShape::Empty => write!(f, "empty"),
            BlobShape::PerRow => write!(f, "per-row"),
            BlobShape::Batched => write!(f, "batched"),
            BlobShape::Mixed => write!(f, "mixed"),
        }
    }
}

/// One parsed row with its position in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRow {
    /// Index of the statement the row came from
    pub statement: usize,
    /// Byte offset of the row's inner text in the blob
    pub offset: usize,
    pub values: Vec<Value>,
}

/// Everything recovered from one blob
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedBlob {
    pub shape: BlobShape,
    pub statements: Vec<StatementHeader>,
    pub rows: Vec<ParsedRow>,
    /// Fragments that were dropped; rows above are unaffected
    pub diagnostics: Vec<MalformedInput>,
}

impl ParsedBlob {
    /// True when every fragment of the blob was parsed
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Values of every row, in source order
    pub fn values(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.values.as_slice())
    }
}

/// Yield the raw row groups of a blob in source order
pub fn segment(blob: &str) -> Segmenter<'_> {
    Segmenter::new(blob)
}

/// Split one row's inner text into field tokens
pub fn tokenize(row: &str) -> Tokenizer<'_> {
    Tokenizer::new(row)
}

/// Tokenize and normalize one row's inner text
pub fn parse_row(row: &str) -> Vec<Value> {
    tokenize(row).map(normalize).collect()
}

/// Run the whole pipeline over one blob
pub fn parse_blob(blob: &str) -> ParsedBlob {
    let mut segmenter = segment(blob);
    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();

    for item in segmenter.by_ref() {
        match item {
            Ok(raw) => rows.push(ParsedRow {
                statement: raw.statement,
                offset: raw.offset,
                values: parse_row(raw.text),
            }),
            Err(malformed) => diagnostics.push(malformed),
        }
    }

    let statements = segmenter.into_statements();
    let shape = detect_shape(statements.len(), &rows);

    ParsedBlob {
        shape,
        statements,
        rows,
        diagnostics,
    }
}

fn detect_shape(statement_count: usize, rows: &[ParsedRow]) -> BlobShape {
    if rows.is_empty() {
        return BlobShape::Empty;
    }

    let mut per_statement = vec![0usize; statement_count];
    for row in rows {
        per_statement[row.statement] += 1;
    }

    let with_rows = per_statement.iter().filter(|&&n| n > 0).count();
    let max_rows = per_statement.iter().copied().max().unwrap_or(0);

    match (with_rows, max_rows) {
        (_, 1) => BlobShape::PerRow,
        (1, _) => BlobShape::Batched,
        _ => BlobShape::Mixed,
    }
}
