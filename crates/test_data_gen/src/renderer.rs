//! SQL rendering for generated cases.

use crate::generator::SqlValue;
use std::io::{self, Write};

/// Statement layout of the rendered dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One `INSERT ... VALUES (...);` per row
    PerRow,
    /// One header followed by up to `batch_size` row groups per statement
    Batched { batch_size: usize },
}

impl std::str::FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-row" | "per_row" | "perrow" => Ok(Shape::PerRow),
            "batched" | "batch" => Ok(Shape::Batched { batch_size: 100 }),
            _ => Err(format!(
                "Unknown shape: {}. Valid options: per-row, batched",
                s
            )),
        }
    }
}

/// Rendering options
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub table: String,
    /// Column names for the header; omitted from the header when empty
    pub columns: Vec<String>,
    pub shape: Shape,
    /// Emit a `CREATE TABLE` with TEXT columns first
    pub include_schema: bool,
    /// Emit `--` and `/* */` comments between statements
    pub include_comments: bool,
}

impl RenderConfig {
    pub fn per_row(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            shape: Shape::PerRow,
            include_schema: false,
            include_comments: false,
        }
    }

    pub fn batched(table: &str, batch_size: usize) -> Self {
        Self {
            shape: Shape::Batched {
                batch_size: batch_size.max(1),
            },
            ..Self::per_row(table)
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }
}

/// Renders rows to MySQL-style INSERT statements
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn render_to_string(&self, rows: &[Vec<SqlValue>]) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.render(rows, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn render<W: Write>(&self, rows: &[Vec<SqlValue>], w: &mut W) -> io::Result<()> {
        if self.config.include_comments {
            writeln!(w, "-- Support case dump ({} rows)", rows.len())?;
            writeln!(w, "/*!40101 SET NAMES utf8mb4 */;")?;
        }
        if self.config.include_schema {
            self.write_schema(rows, w)?;
        }

        match self.config.shape {
            Shape::PerRow => {
                for row in rows {
                    writeln!(w, "{} ({});", self.header(), render_row(row))?;
                }
            }
            Shape::Batched { batch_size } => {
                for (i, batch) in rows.chunks(batch_size.max(1)).enumerate() {
                    if self.config.include_comments && i > 0 {
                        writeln!(w, "-- batch {}", i + 1)?;
                    }
                    writeln!(w, "{}", self.header())?;
                    for (j, row) in batch.iter().enumerate() {
                        let sep = if j + 1 == batch.len() { ";" } else { "," };
                        writeln!(w, "  ({}){}", render_row(row), sep)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn header(&self) -> String {
        if self.config.columns.is_empty() {
            format!("INSERT INTO `{}` VALUES", self.config.table)
        } else {
            let cols: Vec<String> = self
                .config
                .columns
                .iter()
                .map(|c| format!("`{}`", c))
                .collect();
            format!(
                "INSERT INTO `{}` ({}) VALUES",
                self.config.table,
                cols.join(", ")
            )
        }
    }

    fn write_schema<W: Write>(&self, rows: &[Vec<SqlValue>], w: &mut W) -> io::Result<()> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let names: Vec<String> = if self.config.columns.is_empty() {
            (0..width).map(|i| format!("c{}", i)).collect()
        } else {
            self.config.columns.clone()
        };
        let defs: Vec<String> = names.iter().map(|n| format!("  `{}` TEXT", n)).collect();
        writeln!(w, "CREATE TABLE `{}` (", self.config.table)?;
        writeln!(w, "{}", defs.join(",\n"))?;
        writeln!(w, ");")
    }
}

fn render_row(row: &[SqlValue]) -> String {
    row.iter().map(SqlValue::to_sql).collect::<Vec<_>>().join(", ")
}
