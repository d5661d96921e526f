// Test fixtures - reusable test data
// Provides a sample catalog and throwaway databases for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use script_runner::services::database::Database;
use tempfile::TempDir;

/// Two scripts: one with a keyed form and defaults, one positional with a
/// per-script interpreter
pub const SAMPLE_CATALOG: &str = r#"
[[scripts]]
name = "Report"
path = "tools/report.py"
clue = "Summarises a log file."
extra_args = ["--quiet"]

[[scripts.args]]
key = "--user"
label = "User"
type = "text"
required = true

[[scripts.args]]
key = "--days"
label = "Days"
type = "int"
default = 7
min = 1
max = 30

[[scripts.args]]
key = "--format"
label = "Format"
type = "select"
options = ["text", "csv"]
default = "csv"

[[scripts.args]]
key = "--verbose"
label = "Verbose"
type = "checkbox"

[[scripts]]
name = "Cleaner"
path = "/opt/tools/clean.py"
log_arg_style = "positional"
interpreter = "python3.11"
"#;

/// A fresh database with the schema applied, living in its own temp dir
pub fn open_database() -> (TempDir, Database) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("runner.db");
    let db = Database::new(path.to_str().expect("temp path is UTF-8"))
        .expect("Failed to open database");
    db.initialize_schema().expect("Failed to initialize schema");
    (dir, db)
}

/// Write the sample catalog plus the report script it points at
pub fn write_sample_catalog(dir: &Path) -> PathBuf {
    let tools = dir.join("tools");
    fs::create_dir_all(&tools).expect("Failed to create tools dir");
    fs::write(tools.join("report.py"), "print('PROGRESS 100')\n").expect("Failed to write script");

    let path = dir.join("scripts.toml");
    fs::write(&path, SAMPLE_CATALOG).expect("Failed to write catalog");
    path
}
