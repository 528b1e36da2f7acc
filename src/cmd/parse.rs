use super::ParseFormat;
use kms_loader::input::{expand_file_pattern, read_blob, Compression, MultiFileResult};
use kms_loader::parser::{parse_blob, ParsedBlob, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

const MAX_CELL_CHARS: usize = 40;

#[derive(Serialize)]
struct FileOutput<'a> {
    file: String,
    #[serde(flatten)]
    parsed: &'a ParsedBlob,
}

#[derive(Serialize)]
struct RowLine<'a> {
    file: &'a str,
    statement: usize,
    offset: usize,
    values: &'a [Value],
}

pub fn run(file: PathBuf, format: ParseFormat, strict: bool) -> anyhow::Result<()> {
    let expanded = expand_file_pattern(&file)?;

    let mut result = MultiFileResult::new();
    result.total_files = expanded.files.len();
    let mut outputs = Vec::new();
    let mut malformed = 0usize;

    for path in &expanded.files {
        match parse_file(path) {
            Ok(parsed) => {
                for diagnostic in &parsed.diagnostics {
                    warn!(file = %path.display(), "Dropped {}", diagnostic);
                }
                malformed += parsed.diagnostics.len();
                outputs.push((path.display().to_string(), parsed));
                result.record_success();
            }
            Err(e) => {
                error!(file = %path.display(), "{:#}", e);
                result.record_failure(path.clone(), format!("{:#}", e));
            }
        }
    }

    match format {
        ParseFormat::Json => print_json(&outputs, expanded.pattern_was_glob)?,
        ParseFormat::Jsonl => print_jsonl(&outputs)?,
        ParseFormat::Table => print_table(&outputs),
    }

    if result.has_failures() {
        anyhow::bail!(
            "{} of {} files could not be read",
            result.failed,
            result.total_files
        );
    }
    if strict && malformed > 0 {
        anyhow::bail!("{} malformed fragment(s) dropped", malformed);
    }
    Ok(())
}

fn parse_file(path: &Path) -> anyhow::Result<ParsedBlob> {
    let compression = Compression::from_path(path);
    if compression != Compression::None {
        tracing::debug!(file = %path.display(), "Detected compression: {}", compression);
    }
    let blob = read_blob(path)?;
    Ok(parse_blob(&blob))
}

fn print_json(outputs: &[(String, ParsedBlob)], as_array: bool) -> anyhow::Result<()> {
    let docs: Vec<FileOutput<'_>> = outputs
        .iter()
        .map(|(file, parsed)| FileOutput {
            file: file.clone(),
            parsed,
        })
        .collect();

    let json = match (as_array, docs.first()) {
        (false, Some(doc)) if docs.len() == 1 => serde_json::to_string_pretty(doc)?,
        _ => serde_json::to_string_pretty(&docs)?,
    };
    println!("{}", json);
    Ok(())
}

fn print_jsonl(outputs: &[(String, ParsedBlob)]) -> anyhow::Result<()> {
    for (file, parsed) in outputs {
        for row in &parsed.rows {
            let line = RowLine {
                file,
                statement: row.statement,
                offset: row.offset,
                values: &row.values,
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}

fn print_table(outputs: &[(String, ParsedBlob)]) {
    for (file, parsed) in outputs {
        println!(
            "{}: {} statements, {} rows ({}), {} malformed",
            file,
            parsed.statements.len(),
            parsed.rows.len(),
            parsed.shape,
            parsed.diagnostics.len()
        );
        println!("{}", "─".repeat(80));

        for (i, row) in parsed.rows.iter().enumerate() {
            let cells: Vec<String> = row.values.iter().map(format_cell).collect();
            println!("{:>6}  {}", i + 1, cells.join(" | "));
        }
        println!();
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => {
            let flat = s.replace(['\n', '\r'], " ");
            truncate_string(&flat, MAX_CELL_CHARS)
        }
    }
}

fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Value::Null), "NULL");
        assert_eq!(format_cell(&Value::Text("a\nb".into())), "a b");
        let long = "x".repeat(100);
        let cell = format_cell(&Value::Text(long));
        assert_eq!(cell.chars().count(), MAX_CELL_CHARS);
        assert!(cell.ends_with("..."));
    }

    #[test]
    fn test_truncate_string_multibyte() {
        assert_eq!(truncate_string("Zürich", 10), "Zürich");
        assert_eq!(truncate_string("ääääääää", 5), "ää...");
    }
}
