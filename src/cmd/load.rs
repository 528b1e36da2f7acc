use kms_loader::config::{parse_column_list, LoadPlan, Preset, TablePlan};
use kms_loader::input::{expand_all, MultiFileResult};
use kms_loader::loader::{DuckDbStore, LoadSummary, Loader, TargetTable};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

pub struct LoadArgs {
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub table: Option<String>,
    pub columns: Option<String>,
    pub key: Option<String>,
    pub preset: Option<Preset>,
    pub create_table: bool,
    pub memory_limit: Option<String>,
    pub progress: bool,
    pub json: bool,
    pub strict: bool,
}

/// One target table and the files feeding it
#[derive(Debug)]
struct LoadJob {
    target: TargetTable,
    create: bool,
    files: Vec<PathBuf>,
}

pub fn run(args: LoadArgs) -> Result<()> {
    let plan = match &args.config {
        Some(path) => Some(LoadPlan::load(path)?),
        None => None,
    };

    let jobs = resolve_jobs(&args, plan.as_ref())?;

    let db = args
        .db
        .clone()
        .or_else(|| plan.as_ref().and_then(|p| p.database.clone()));
    let store = match &db {
        Some(path) => DuckDbStore::open(path)?,
        None => {
            warn!("No database file given; rows are loaded into a temporary in-memory database");
            DuckDbStore::open_in_memory()?
        }
    };

    let memory_limit = args
        .memory_limit
        .clone()
        .or_else(|| plan.as_ref().and_then(|p| p.memory_limit.clone()));
    if let Some(limit) = &memory_limit {
        store.set_memory_limit(limit)?;
    }

    let mut loader = Loader::new(store).with_progress(args.progress);
    let mut summaries = Vec::new();
    let mut result = MultiFileResult::new();

    for job in &jobs {
        loader.prepare(&job.target, job.create)?;
        info!(
            table = %job.target.name,
            columns = job.target.width(),
            files = job.files.len(),
            "Loading"
        );

        let mut total = LoadSummary::new(&job.target.name);
        result.total_files += job.files.len();

        for path in &job.files {
            match loader.load_file(path, &job.target) {
                Ok(summary) => {
                    total.merge(&summary);
                    result.record_success();
                }
                Err(e) => {
                    error!(file = %path.display(), "{:#}", e);
                    result.record_failure(path.clone(), format!("{:#}", e));
                }
            }
        }

        loader.verify(&job.target, &mut total)?;
        summaries.push(total);
    }

    if args.json {
        let json = if summaries.len() == 1 {
            summaries[0].to_json()?
        } else {
            serde_json::to_string_pretty(&summaries)?
        };
        println!("{}", json);
    } else {
        for summary in &summaries {
            print!("{}", summary.render_text());
        }
    }

    if result.has_failures() {
        bail!(
            "{} of {} files could not be loaded",
            result.failed,
            result.total_files
        );
    }
    if args.strict {
        let unclean: Vec<&str> = summaries
            .iter()
            .filter(|s| !s.is_clean())
            .map(|s| s.table.as_str())
            .collect();
        if !unclean.is_empty() {
            bail!(
                "malformed fragments or failed rows in table(s): {}",
                unclean.join(", ")
            );
        }
    }
    Ok(())
}

/// Work out targets and files from the command line, the plan, or both
fn resolve_jobs(args: &LoadArgs, plan: Option<&LoadPlan>) -> Result<Vec<LoadJob>> {
    if args.files.is_empty() {
        let Some(plan) = plan else {
            bail!("no input files given (pass files or a --config plan with sources)");
        };
        return plan_jobs(args, plan);
    }

    let base = base_table(args, plan)?;
    let (mut target, plan_create) = match base {
        Some((target, create)) => (target, create),
        None => bail!(
            "no target table: pass --preset, --table with --columns, or a --config plan"
        ),
    };
    apply_overrides(args, &mut target)?;
    target.validate()?;

    let files = expand_all(&args.files)?;
    Ok(vec![LoadJob {
        target,
        create: args.create_table || plan_create,
        files,
    }])
}

/// Starting definition for a command-line load, before flag overrides
fn base_table(args: &LoadArgs, plan: Option<&LoadPlan>) -> Result<Option<(TargetTable, bool)>> {
    if let (Some(name), Some(plan)) = (&args.table, plan) {
        if let Some(entry) = plan.table(name) {
            return Ok(Some((entry.target()?, entry.create)));
        }
    }
    if let Some(preset) = args.preset {
        return Ok(Some((preset.target(), false)));
    }
    if let (Some(name), Some(columns)) = (&args.table, &args.columns) {
        return Ok(Some((
            TargetTable::new(name.clone(), parse_column_list(columns)?),
            false,
        )));
    }
    if let Some(plan) = plan {
        if let [entry] = plan.tables.as_slice() {
            return Ok(Some((entry.target()?, entry.create)));
        }
        if !plan.tables.is_empty() {
            bail!("the plan has several tables; choose one with --table");
        }
    }
    Ok(None)
}

fn apply_overrides(args: &LoadArgs, target: &mut TargetTable) -> Result<()> {
    if let Some(name) = &args.table {
        target.name = name.clone();
    }
    if let Some(columns) = &args.columns {
        target.columns = parse_column_list(columns)?;
        if target.key_index().is_none() && args.key.is_none() {
            target.key_column = None;
        }
    }
    if let Some(key) = &args.key {
        target.key_column = Some(key.clone());
    }
    Ok(())
}

fn plan_jobs(args: &LoadArgs, plan: &LoadPlan) -> Result<Vec<LoadJob>> {
    let mut jobs = Vec::new();
    for entry in selected_tables(args, plan)? {
        let target = entry.target()?;
        if entry.sources.is_empty() {
            warn!(table = %target.name, "Plan lists no sources for this table; skipping");
            continue;
        }
        let files = expand_all(&entry.sources)
            .with_context(|| format!("Failed to resolve sources of table {}", target.name))?;
        jobs.push(LoadJob {
            target,
            create: args.create_table || entry.create,
            files,
        });
    }

    if jobs.is_empty() {
        bail!("the plan has no table with sources to load");
    }
    Ok(jobs)
}

fn selected_tables<'a>(args: &LoadArgs, plan: &'a LoadPlan) -> Result<Vec<&'a TablePlan>> {
    match &args.table {
        Some(name) => match plan.table(name) {
            Some(entry) => Ok(vec![entry]),
            None => bail!("table {} is not in the plan", name),
        },
        None => Ok(plan.tables.iter().collect()),
    }
}
