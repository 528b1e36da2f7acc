//! CLI for generating support-case fixtures.
//!
//! Usage:
//!   gen-fixtures --scale small --seed 42 > sample_cases_500.sql
//!   gen-fixtures --rows 2000 --shape batched --batch-size 250 --duplicates 0.05 -o cases.sql

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use test_data_gen::{CaseConfig, CaseGenerator, RenderConfig, Renderer, Scale, Shape};

#[derive(Parser, Debug)]
#[command(name = "gen-fixtures")]
#[command(about = "Generate support-case INSERT dumps for kms-loader", long_about = None)]
struct Args {
    /// Scale preset: small (500 rows), medium, large
    /// Ignored if --rows is specified
    #[arg(short, long, default_value = "small")]
    scale: String,

    /// Exact number of rows
    #[arg(long)]
    rows: Option<usize>,

    /// Values per row
    #[arg(long, default_value = "57")]
    width: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Blob shape: per-row or batched
    #[arg(long, default_value = "per-row")]
    shape: String,

    /// Rows per INSERT statement in batched shape
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Share of rows repeating an earlier case number (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    duplicates: f64,

    /// Target table name
    #[arg(short, long, default_value = "Cases")]
    table: String,

    /// Emit a CREATE TABLE before the data
    #[arg(long)]
    schema: bool,

    /// Emit SQL comments between statements
    #[arg(long)]
    comments: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let scale: Scale = args.scale.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let shape = match args.shape.parse().map_err(|e: String| anyhow::anyhow!(e))? {
        Shape::Batched { .. } => Shape::Batched {
            batch_size: args.batch_size.max(1),
        },
        other => other,
    };

    let config = CaseConfig {
        seed: args.seed,
        rows: args.rows.unwrap_or_else(|| scale.rows()),
        width: args.width,
        duplicate_ratio: args.duplicates.clamp(0.0, 1.0),
        ..Default::default()
    };
    let rows = CaseGenerator::new(config).generate();

    let mut render = RenderConfig::per_row(&args.table);
    render.shape = shape;
    render.include_schema = args.schema;
    render.include_comments = args.comments;
    let renderer = Renderer::new(render);

    if let Some(ref path) = args.output {
        let mut file = BufWriter::new(File::create(path)?);
        renderer.render(&rows, &mut file)?;
        file.flush()?;
        eprintln!("Generated {} rows to {}", rows.len(), path);
    } else {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        renderer.render(&rows, &mut lock)?;
    }

    Ok(())
}
