//! YAML load plans and built-in target presets.
//!
//! A plan names the database and, per target table, its columns, business
//! key and source files:
//!
//! ```yaml
//! database: kms.duckdb
//! memory_limit: 2GB
//! tables:
//!   - name: Cases
//!     preset: cases
//!     create: true
//!     sources: [data/Case.sql, data/sample_cases_*.sql]
//! ```

use crate::loader::TargetTable;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Columns of the support-case table, in dump order
pub const CASE_COLUMNS: [&str; 57] = [
    "Case_Number",
    "Subject_Description",
    "Description_Description",
    "Issue_Plain_Text",
    "Cause_Plain_Text",
    "Resolution_Plain_Text",
    "Parent_Id",
    "Status_Text",
    "Support_Type",
    "Record_Name",
    "Product_Hierarchy_Id",
    "Case_Internal_Id",
    "Case_Comments_Text",
    "Case_Created_Hour",
    "Case_Escalated_Flag",
    "Cause_Text",
    "Close_Case_Reason_Text",
    "Close_Comments_Text",
    "Closed_Date_Timestamp",
    "Elevated_Flag",
    "Elevation_ID",
    "Escalated_Reason_Text",
    "Impact_Summary_Text",
    "Order_Type_Code",
    "Origin_Name",
    "GSD_Product_Number",
    "Reason_Text",
    "Type_Text",
    "Any_Customer_Data_Loss",
    "Asset_Serial_Number",
    "Issue_Text",
    "Install_Issue_Text",
    "Resolution_Code",
    "Resolution_Sub_Code_Text",
    "New_Install_Text",
    "Outage_Text",
    "Customer_Impact_Text",
    "Resolution_Text",
    "Product_Series",
    "GSD_Environment_Text",
    "First_Touch_Time",
    "Service_Advisory_Text",
    "Error_Codes_Text",
    "Operating_System_Version_Text",
    "Operating_System_Text",
    "Problem_Analysis_Text",
    "Case_Description",
    "Solution_Class_Description_Text",
    "Solution_Class_Name_Text",
    "Asset_Operating_System_Text",
    "Asset_Operating_System_Version_Text",
    "Issue_Category_Text",
    "Issue_Type_Text",
    "Description_For_Others_Issue_Category_Text",
    "Description_For_Others_Issue_Type_Text",
    "Other_Resolution_Sub_Code_Description_Text",
    "Troubleshooting_Steps_Actions_Taken_Text",
];

/// Built-in target definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Support cases keyed by Case_Number
    Cases,
}

impl Preset {
    pub fn target(self) -> TargetTable {
        match self {
            Preset::Cases => TargetTable::new(
                "Cases",
                CASE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            )
            .with_key("Case_Number"),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Preset::Cases => write!(f, "cases"),
        }
    }
}

/// One target table of a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePlan {
    /// Table name; defaults to the preset's name
    pub name: Option<String>,
    /// Start from a built-in definition
    pub preset: Option<Preset>,
    /// Column list; replaces the preset's when non-empty
    pub columns: Vec<String>,
    /// Business key column; replaces the preset's when set
    pub key_column: Option<String>,
    /// Create the table if missing
    pub create: bool,
    /// Files or glob patterns to load
    pub sources: Vec<String>,
}

impl TablePlan {
    /// Resolve to a validated target
    pub fn target(&self) -> Result<TargetTable> {
        let mut target = match self.preset {
            Some(preset) => preset.target(),
            None => TargetTable::new(String::new(), Vec::new()),
        };

        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if !self.columns.is_empty() {
            target.columns = self.columns.clone();
        }
        if let Some(key) = &self.key_column {
            target.key_column = Some(key.clone());
        }

        target
            .validate()
            .with_context(|| format!("Invalid table definition '{}'", target.name))?;
        Ok(target)
    }
}

/// Complete YAML load plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadPlan {
    /// DuckDB database file; in-memory when absent
    pub database: Option<PathBuf>,
    /// DuckDB memory limit, e.g. "4GB"
    pub memory_limit: Option<String>,
    pub tables: Vec<TablePlan>,
}

impl LoadPlan {
    /// Load a plan from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read load plan: {}", path.display()))?;
        let plan = Self::from_yaml(&content)
            .with_context(|| format!("Invalid load plan: {}", path.display()))?;

        // Relative sources and database resolve against the plan's directory
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(plan.relative_to(base))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let plan: LoadPlan = serde_yaml_ng::from_str(content)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, table) in self.tables.iter().enumerate() {
            table
                .target()
                .with_context(|| format!("tables[{}]", i))?;
        }
        Ok(())
    }

    /// Rebase relative paths onto `base`
    pub fn relative_to(mut self, base: &Path) -> Self {
        if base.as_os_str().is_empty() {
            return self;
        }
        if let Some(db) = &self.database {
            if db.is_relative() {
                self.database = Some(base.join(db));
            }
        }
        for table in &mut self.tables {
            for source in &mut table.sources {
                if Path::new(source.as_str()).is_relative() {
                    *source = base.join(source.as_str()).to_string_lossy().into_owned();
                }
            }
        }
        self
    }

    /// Find a table entry by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&TablePlan> {
        let lower = name.to_lowercase();
        self.tables.iter().find(|t| {
            t.target()
                .map(|target| target.name.to_lowercase() == lower)
                .unwrap_or(false)
        })
    }
}

/// Parse a comma-separated column list from the command line
pub fn parse_column_list(s: &str) -> Result<Vec<String>> {
    let columns: Vec<String> = s
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        bail!("Column list is empty");
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cases_preset() {
        let target = Preset::Cases.target();
        assert_eq!(target.name, "Cases");
        assert_eq!(target.width(), 57);
        assert_eq!(target.key_index(), Some(0));
        assert_eq!(target.columns[56], "Troubleshooting_Steps_Actions_Taken_Text");
        target.validate().unwrap();
    }

    #[test]
    fn test_parse_plan() {
        let yaml = r#"
database: kms.duckdb
memory_limit: 2GB
tables:
  - preset: cases
    create: true
    sources: [Case.sql, "sample_cases_*.sql"]
  - name: Articles
    columns: [Article_Id, Title, Body]
    key_column: Article_Id
"#;
        let plan = LoadPlan::from_yaml(yaml).unwrap();
        assert_eq!(plan.database, Some(PathBuf::from("kms.duckdb")));
        assert_eq!(plan.memory_limit.as_deref(), Some("2GB"));
        assert_eq!(plan.tables.len(), 2);

        let cases = plan.tables[0].target().unwrap();
        assert_eq!(cases.name, "Cases");
        assert!(plan.tables[0].create);
        assert_eq!(plan.tables[0].sources.len(), 2);

        let articles = plan.tables[1].target().unwrap();
        assert_eq!(articles.columns, vec!["Article_Id", "Title", "Body"]);
        assert!(!plan.tables[1].create);

        assert!(plan.table("articles").is_some());
        assert!(plan.table("missing").is_none());
    }

    #[test]
    fn test_preset_with_renamed_table() {
        let plan = LoadPlan::from_yaml("tables:\n  - preset: cases\n    name: StagingCases\n").unwrap();
        let target = plan.tables[0].target().unwrap();
        assert_eq!(target.name, "StagingCases");
        assert_eq!(target.width(), 57);
    }

    #[test]
    fn test_plan_rejects_bad_key() {
        let yaml = "tables:\n  - name: T\n    columns: [a, b]\n    key_column: c\n";
        let err = LoadPlan::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("Key column c"));
    }

    #[test]
    fn test_plan_rejects_table_without_columns() {
        assert!(LoadPlan::from_yaml("tables:\n  - name: T\n").is_err());
    }

    #[test]
    fn test_plan_rejects_unknown_preset() {
        assert!(LoadPlan::from_yaml("tables:\n  - preset: tickets\n").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(
            &path,
            "database: out.duckdb\ntables:\n  - preset: cases\n    sources: [dumps/*.sql, /abs/Case.sql]\n",
        )
        .unwrap();

        let plan = LoadPlan::load(&path).unwrap();
        assert_eq!(plan.database, Some(dir.path().join("out.duckdb")));
        assert_eq!(
            plan.tables[0].sources[0],
            dir.path().join("dumps/*.sql").to_string_lossy()
        );
        assert_eq!(plan.tables[0].sources[1], "/abs/Case.sql");
    }

    #[test]
    fn test_load_missing_plan() {
        let err = LoadPlan::load(Path::new("/nonexistent/plan.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read load plan"));
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(
            parse_column_list(" a, b ,c,").unwrap(),
            vec!["a", "b", "c"]
        );
        assert!(parse_column_list(" , ").is_err());
    }
}
