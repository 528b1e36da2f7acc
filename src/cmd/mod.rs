mod load;
mod parse;

use kms_loader::config::Preset;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kms-loader")]
#[command(version)]
#[command(
    about = "Recover rows from SQL INSERT dumps and load them into DuckDB",
    long_about = None
)]
pub struct Cli {
    /// Log debug detail (per-row duplicates, arity fixes)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for `parse`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ParseFormat {
    /// One JSON document per file
    Json,
    /// One JSON object per row
    Jsonl,
    /// Human-readable listing
    #[default]
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse INSERT dumps and print the recovered rows without loading them
    Parse {
        /// Input SQL file or glob pattern (e.g., *.sql, dumps/**/*.sql)
        /// Supports .gz, .bz2, .xz, .zst compression
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ParseFormat::Table)]
        format: ParseFormat,

        /// Exit with an error if any fragment was malformed
        #[arg(long)]
        strict: bool,
    },

    /// Load rows from INSERT dumps into a DuckDB table
    Load {
        /// Input SQL files or glob patterns; defaults to the plan's sources
        /// Supports .gz, .bz2, .xz, .zst compression
        files: Vec<PathBuf>,

        /// YAML load plan
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// DuckDB database file (in-memory when neither this nor the plan names one)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Target table name
        #[arg(short, long)]
        table: Option<String>,

        /// Target columns (comma-separated, in dump order)
        #[arg(long)]
        columns: Option<String>,

        /// Business key column; duplicate keys are skipped
        #[arg(short, long)]
        key: Option<String>,

        /// Built-in target definition
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Create the target table if it does not exist
        #[arg(long)]
        create_table: bool,

        /// DuckDB memory limit (e.g., 4GB)
        #[arg(long)]
        memory_limit: Option<String>,

        /// Show progress while loading each file
        #[arg(short, long)]
        progress: bool,

        /// Print the load summary as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error if any row failed or any fragment was malformed
        #[arg(long)]
        strict: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Parse {
            file,
            format,
            strict,
        } => parse::run(file, format, strict),
        Commands::Load {
            files,
            config,
            db,
            table,
            columns,
            key,
            preset,
            create_table,
            memory_limit,
            progress,
            json,
            strict,
        } => load::run(load::LoadArgs {
            files,
            config,
            db,
            table,
            columns,
            key,
            preset,
            create_table,
            memory_limit,
            progress,
            json,
            strict,
        }),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "kms-loader",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
