//! Test data generator for kms-loader integration tests.
//!
//! Generates deterministic support-case INSERT dumps in both blob shapes,
//! salted with literals that break naive parsers.
//!
//! # Example
//!
//! ```rust
//! use test_data_gen::{CaseConfig, CaseGenerator, RenderConfig, Renderer};
//!
//! let mut gen = CaseGenerator::new(CaseConfig { rows: 10, ..Default::default() });
//! let rows = gen.generate();
//!
//! let sql = Renderer::new(RenderConfig::batched("Cases", 5)).render_to_string(&rows);
//! assert_eq!(sql.matches("INSERT INTO").count(), 2);
//! ```

pub mod fake;
pub mod generator;
pub mod renderer;

pub use generator::{CaseConfig, CaseGenerator, Scale, SqlValue};
pub use renderer::{RenderConfig, Renderer, Shape};
