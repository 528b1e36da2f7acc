//! Support-case row generator.
//!
//! Produces deterministic rows for a case table of any width. Column 0 is
//! always the case number; a configurable share of rows reuse an earlier
//! case number so duplicate handling can be exercised.

use crate::fake::FakeData;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generation scale presets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// 500 rows, the size of the sample case dump
    Small,
    /// 10,000 rows
    Medium,
    /// 100,000 rows
    Large,
}

impl Scale {
    pub fn rows(&self) -> usize {
        match self {
            Scale::Small => 500,
            Scale::Medium => 10_000,
            Scale::Large => 100_000,
        }
    }
}

impl std::str::FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(Scale::Small),
            "medium" => Ok(Scale::Medium),
            "large" => Ok(Scale::Large),
            _ => Err(format!(
                "Unknown scale: {}. Valid options: small, medium, large",
                s
            )),
        }
    }
}

/// One generated cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    /// Already escaped for a single-quoted MySQL literal
    Text(String),
}

impl SqlValue {
    /// SQL literal text
    pub fn to_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Text(s) => format!("'{}'", s),
        }
    }

    /// The text a verbatim literal parser recovers, `None` for NULL
    pub fn parsed_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(n) => Some(n.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct CaseConfig {
    pub seed: u64,
    pub rows: usize,
    /// Values per row
    pub width: usize,
    /// Share of rows (0.0..=1.0) repeating an earlier case number
    pub duplicate_ratio: f64,
    /// Share of non-key cells that are NULL
    pub null_ratio: f64,
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            rows: Scale::Small.rows(),
            width: 57,
            duplicate_ratio: 0.0,
            null_ratio: 0.1,
        }
    }
}

/// Deterministic support-case generator
pub struct CaseGenerator {
    config: CaseConfig,
    fake: FakeData<ChaCha8Rng>,
    next_case: i64,
    issued: Vec<i64>,
}

impl CaseGenerator {
    pub fn new(config: CaseConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            fake: FakeData::new(rng),
            next_case: 5_000_000,
            issued: Vec::new(),
        }
    }

    pub fn with_scale(seed: u64, scale: Scale) -> Self {
        Self::new(CaseConfig {
            seed,
            rows: scale.rows(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    /// Generate every configured row
    pub fn generate(&mut self) -> Vec<Vec<SqlValue>> {
        (0..self.config.rows).map(|_| self.next_row()).collect()
    }

    /// Generate one row of `width` values
    pub fn next_row(&mut self) -> Vec<SqlValue> {
        let width = self.config.width;
        let mut row = Vec::with_capacity(width);
        if width == 0 {
            return row;
        }

        row.push(SqlValue::Text(self.case_number()));
        for column in 1..width {
            if self.fake.bool_with_probability(self.config.null_ratio) {
                row.push(SqlValue::Null);
            } else {
                row.push(self.cell(column));
            }
        }
        row
    }

    fn case_number(&mut self) -> String {
        let reuse = !self.issued.is_empty()
            && self.fake.bool_with_probability(self.config.duplicate_ratio);
        let number = if reuse {
            *self.fake.pick(&self.issued)
        } else {
            let n = self.next_case;
            self.next_case += 1;
            self.issued.push(n);
            n
        };
        number.to_string()
    }

    /// Column-dependent content so rows look like real case records
    fn cell(&mut self, column: usize) -> SqlValue {
        match column % 12 {
            0 => SqlValue::Text(self.fake.subject()),
            1 => SqlValue::Text(self.fake.status().to_string()),
            2 => SqlValue::Text(self.fake.support_type().to_string()),
            3 => SqlValue::Text(self.fake.datetime(2019, 2025)),
            4 => SqlValue::Text(self.fake.product().to_string()),
            5 => SqlValue::Int(self.fake.int_range(0, 23)),
            6 => SqlValue::Text(self.fake.serial_number()),
            7 => SqlValue::Text(self.fake.origin().to_string()),
            8 => SqlValue::Text(self.fake.operating_system().to_string()),
            9 => SqlValue::Text(self.fake.product_number()),
            10 => SqlValue::Text(self.fake.internal_id()),
            _ => {
                if self.fake.bool_with_probability(0.05) {
                    SqlValue::Text(String::new())
                } else {
                    SqlValue::Text(self.fake.note())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rows_have_configured_width() {
        let mut gen = CaseGenerator::new(CaseConfig {
            rows: 20,
            width: 9,
            ..Default::default()
        });
        let rows = gen.generate();
        assert_eq!(rows.len(), 20);
        assert!(rows.iter().all(|r| r.len() == 9));
    }

    #[test]
    fn test_same_seed_same_rows() {
        let a = CaseGenerator::with_scale(99, Scale::Small).generate();
        let b = CaseGenerator::with_scale(99, Scale::Small).generate();
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
    }

    #[test]
    fn test_unique_case_numbers_without_duplicates() {
        let rows = CaseGenerator::new(CaseConfig {
            rows: 200,
            ..Default::default()
        })
        .generate();
        let keys: HashSet<_> = rows.iter().map(|r| r[0].clone().to_sql()).collect();
        assert_eq!(keys.len(), 200);
    }

    #[test]
    fn test_duplicate_ratio_repeats_keys() {
        let rows = CaseGenerator::new(CaseConfig {
            rows: 200,
            duplicate_ratio: 0.5,
            ..Default::default()
        })
        .generate();
        let keys: HashSet<_> = rows.iter().map(|r| r[0].to_sql()).collect();
        assert!(keys.len() < 200);
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(SqlValue::Null.to_sql(), "NULL");
        assert_eq!(SqlValue::Int(5).to_sql(), "5");
        assert_eq!(SqlValue::Text(r"it\'s".into()).to_sql(), r"'it\'s'");
        assert_eq!(SqlValue::Null.parsed_text(), None);
        assert_eq!(
            SqlValue::Text(r"it\'s".into()).parsed_text().as_deref(),
            Some(r"it\'s")
        );
    }
}
