//! Integration tests for loading dumps into DuckDB.

use kms_loader::config::{LoadPlan, Preset};
use kms_loader::loader::{fit_to_width, Arity, DuckDbStore, LoadSummary, Loader, RowStore, TargetTable};
use kms_loader::parser::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use test_data_gen::{CaseConfig, CaseGenerator, RenderConfig, Renderer};

fn create_test_dump(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn case_dump(rows: usize, seed: u64, duplicate_ratio: f64, batched: bool) -> String {
    let rows = CaseGenerator::new(CaseConfig {
        seed,
        rows,
        duplicate_ratio,
        ..Default::default()
    })
    .generate();
    let config = if batched {
        RenderConfig::batched("Cases", 100)
    } else {
        RenderConfig::per_row("Cases")
    };
    Renderer::new(config).render_to_string(&rows)
}

fn cases_loader() -> (Loader<DuckDbStore>, TargetTable) {
    let mut loader = Loader::new(DuckDbStore::open_in_memory().unwrap());
    let target = Preset::Cases.target();
    loader.prepare(&target, true).unwrap();
    (loader, target)
}

// =============================================================================
// Cases preset
// =============================================================================

#[test]
fn test_load_generated_cases() {
    let dir = TempDir::new().unwrap();
    let path = create_test_dump(&dir, "sample_cases_500.sql", &case_dump(500, 1, 0.0, false));

    let (mut loader, target) = cases_loader();
    let mut summary = loader.load_file(&path, &target).unwrap();
    loader.verify(&target, &mut summary).unwrap();

    assert_eq!(summary.rows_parsed, 500);
    assert_eq!(summary.inserted, 500);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.padded + summary.truncated, 0);
    assert_eq!(summary.table_rows, Some(500));
    assert!(summary.is_clean());
}

#[test]
fn test_duplicates_are_skipped_and_counted() {
    let (mut loader, target) = cases_loader();
    let summary = loader.load_blob("dups", &case_dump(400, 2, 0.25, true), &target);

    assert_eq!(summary.rows_parsed, 400);
    assert!(summary.duplicates > 0);
    assert_eq!(summary.inserted + summary.duplicates, 400);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_clean());
}

#[test]
fn test_reload_is_all_duplicates() {
    let blob = case_dump(50, 3, 0.0, true);
    let (mut loader, target) = cases_loader();

    let first = loader.load_blob("first", &blob, &target);
    let second = loader.load_blob("second", &blob, &target);

    assert_eq!(first.inserted, 50);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 50);
}

#[test]
fn test_multiple_files_merge_into_one_summary() {
    let dir = TempDir::new().unwrap();
    let a = create_test_dump(&dir, "Case.sql", &case_dump(30, 4, 0.0, true));
    let b = create_test_dump(&dir, "sample_cases_500.sql", &case_dump(20, 4, 0.0, false));

    let (mut loader, target) = cases_loader();
    let mut total = LoadSummary::new(&target.name);
    for path in [&a, &b] {
        total.merge(&loader.load_file(path, &target).unwrap());
    }
    loader.verify(&target, &mut total).unwrap();

    // Same seed: the second file repeats the first 20 case numbers
    assert_eq!(total.files.len(), 2);
    assert_eq!(total.rows_parsed, 50);
    assert_eq!(total.inserted, 30);
    assert_eq!(total.duplicates, 20);
    assert_eq!(total.table_rows, Some(30));
}

// =============================================================================
// Arity handling
// =============================================================================

#[test]
fn test_short_and_long_rows_are_fitted() {
    let mut loader = Loader::new(DuckDbStore::open_in_memory().unwrap());
    let target = TargetTable::new("Notes", vec!["id".into(), "a".into(), "b".into()]).with_key("id");
    loader.prepare(&target, true).unwrap();

    let blob = "INSERT INTO Notes VALUES ('1'), ('2', 'x', 'y', 'extra'), ('3', 'p', 'q');";
    let mut summary = loader.load_blob("notes", blob, &target);
    loader.verify(&target, &mut summary).unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.padded, 1);
    assert_eq!(summary.truncated, 1);

    let b: Option<String> = loader
        .store()
        .connection()
        .query_row(r#"SELECT "b" FROM "Notes" WHERE "id" = '1'"#, [], |row| row.get(0))
        .unwrap();
    assert_eq!(b, None);

    let b: Option<String> = loader
        .store()
        .connection()
        .query_row(r#"SELECT "b" FROM "Notes" WHERE "id" = '2'"#, [], |row| row.get(0))
        .unwrap();
    assert_eq!(b.as_deref(), Some("y"));
}

#[test]
fn test_fit_to_width_is_public() {
    let (values, arity) = fit_to_width(vec![Value::Null], 2);
    assert_eq!(arity, Arity::Padded(1));
    assert_eq!(values.len(), 2);
}

// =============================================================================
// Stored values
// =============================================================================

#[test]
fn test_literals_stored_verbatim() {
    let mut loader = Loader::new(DuckDbStore::open_in_memory().unwrap());
    let target = TargetTable::new("T", vec!["id".into(), "v".into()]).with_key("id");
    loader.prepare(&target, true).unwrap();

    let blob = r"INSERT INTO T VALUES ('1', 'Disk (bay 3), failed; replaced'), ('2', 'it\'s'), ('3', ''), ('4', NULL);";
    let summary = loader.load_blob("t", blob, &target);
    assert_eq!(summary.inserted, 4);

    let conn = loader.store().connection();
    let mut stmt = conn
        .prepare(r#"SELECT "v" FROM "T" ORDER BY "id""#)
        .unwrap();
    let values: Vec<Option<String>> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(
        values,
        vec![
            Some("Disk (bay 3), failed; replaced".to_string()),
            Some(r"it\'s".to_string()),
            Some(String::new()),
            None,
        ]
    );
}

#[test]
fn test_malformed_tail_keeps_loaded_rows() {
    let (mut loader, target) = cases_loader();
    let mut blob = case_dump(10, 5, 0.0, true);
    blob.push_str("INSERT INTO `Cases` VALUES ('9999999', 'never closed");

    let summary = loader.load_blob("tail", &blob, &target);
    assert_eq!(summary.inserted, 10);
    assert_eq!(summary.malformed_count, 1);
    assert!(summary.malformed[0].contains("unterminated string literal"));
}

// =============================================================================
// Database files and plans
// =============================================================================

#[test]
fn test_disk_database_persists() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("kms.duckdb");
    let target = Preset::Cases.target();

    {
        let mut loader = Loader::new(DuckDbStore::open(&db).unwrap());
        loader.prepare(&target, true).unwrap();
        let summary = loader.load_blob("a", &case_dump(25, 6, 0.0, true), &target);
        assert_eq!(summary.inserted, 25);
    }

    let mut store = DuckDbStore::open(&db).unwrap();
    store.prepare(&target, false).unwrap();
    assert_eq!(store.row_count(&target).unwrap(), Some(25));
}

#[test]
fn test_missing_table_without_create() {
    let mut loader = Loader::new(DuckDbStore::open_in_memory().unwrap());
    let err = loader.prepare(&Preset::Cases.target(), false).unwrap_err();
    assert!(format!("{:#}", err).contains("does not exist"));
}

#[test]
fn test_plan_target_loads() {
    let plan = LoadPlan::from_yaml(
        "tables:\n  - name: Tickets\n    columns: [Ticket_Id, Title]\n    key_column: Ticket_Id\n    create: true\n",
    )
    .unwrap();
    let target = plan.tables[0].target().unwrap();

    let mut loader = Loader::new(DuckDbStore::open_in_memory().unwrap());
    loader.prepare(&target, plan.tables[0].create).unwrap();
    let summary = loader.load_blob(
        "tickets",
        "INSERT INTO Tickets (Ticket_Id, Title) VALUES ('T1', 'VPN (site B) down'), ('T1', 'dup');",
        &target,
    );
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 1);
}
