// Script catalog service
// Loads, saves and extends the list of runnable scripts

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::field::{FieldKind, FieldSchema};
use crate::models::script::{LogArgStyle, ScriptDefinition};

const CATALOG_FILE_NAME: &str = "scripts.toml";
const DISCOVER_DEPTH: usize = 2;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Could not read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write catalog {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize catalog: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("A script named '{0}' already exists")]
    Duplicate(String),
    #[error("{0}")]
    Invalid(String),
    #[error("No configuration directory available on this system")]
    NoConfigDir,
}

/// Ordered list of script definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptCatalog {
    #[serde(default)]
    scripts: Vec<ScriptDefinition>,
    /// Directory relative script paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl ScriptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog; every definition is validated and names must be unique
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let parsed: ScriptCatalog = toml::from_str(text)?;

        let mut catalog = ScriptCatalog::new();
        for script in parsed.scripts {
            catalog.add(script)?;
        }
        Ok(catalog)
    }

    pub fn to_toml_string(&self) -> Result<String, CatalogError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut catalog = Self::from_toml_str(&text)?;
        catalog.base_dir = path.parent().map(Path::to_path_buf);
        log::info!("Loaded {} scripts from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let text = self.to_toml_string()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CatalogError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, text).map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Saved {} scripts to {}", self.len(), path.display());
        Ok(())
    }

    /// The example catalog shipped with the application
    pub fn builtin() -> Self {
        let add_numbers = ScriptDefinition::new("Add numbers", "add_numbers.py")
            .with_clue("Adds two integers and greets the user.")
            .with_field(
                FieldSchema::new("--user", "User", FieldKind::Text)
                    .required()
                    .with_placeholder("e.g. Pavel"),
            )
            .with_field(
                FieldSchema::new("--a", "first number", FieldKind::Int)
                    .required()
                    .with_range(-1_000_000.0, 1_000_000.0),
            )
            .with_field(
                FieldSchema::new("--b", "second number", FieldKind::Int)
                    .required()
                    .with_range(-1_000_000.0, 1_000_000.0),
            )
            .with_log_arg_style(LogArgStyle::default());

        Self {
            scripts: vec![add_numbers],
            base_dir: None,
        }
    }

    /// Load the catalog at `path`, falling back to the builtin one when the
    /// file is missing or unreadable
    pub fn load_or_builtin(path: &Path) -> Self {
        if !path.exists() {
            log::info!(
                "No catalog at {}, using the builtin scripts",
                path.display()
            );
            return Self::builtin();
        }

        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("Failed to load catalog, using the builtin scripts: {}", e);
                Self::builtin()
            }
        }
    }

    /// `scripts.toml` in the per-user configuration directory
    pub fn default_path() -> Result<PathBuf, CatalogError> {
        let dirs = ProjectDirs::from("com", "ScriptRunner", "Script Runner")
            .ok_or(CatalogError::NoConfigDir)?;
        Ok(dirs.config_dir().join(CATALOG_FILE_NAME))
    }

    /// Add every `*.py` below `dir` that is not in the catalog yet.
    /// Returns the number of scripts added.
    pub fn discover(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::Invalid(format!(
                "{} is not a folder",
                dir.display()
            )));
        }

        let known: HashSet<PathBuf> = self
            .scripts
            .iter()
            .map(|s| normalize(&self.resolve_path(s)))
            .collect();

        let mut found: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(DISCOVER_DEPTH)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::debug!("Skipping unreadable entry while scanning: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_python_script(path))
            .filter(|path| !known.contains(&normalize(path)))
            .collect();
        found.sort();

        let mut added = 0;
        for path in found {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "script".to_string());
            let name = self.unique_name(&stem);
            let definition = ScriptDefinition::new(name, path)
                .with_clue(format!("Found in {}", dir.display()));
            self.add(definition)?;
            added += 1;
        }

        log::info!("Discovered {} new scripts in {}", added, dir.display());
        Ok(added)
    }

    /// Add a single `*.py` file, named after its stem. Returns the name it
    /// was added under.
    pub fn add_script_file(&mut self, path: &Path) -> Result<String, CatalogError> {
        if !path.is_file() || !is_python_script(path) {
            return Err(CatalogError::Invalid(format!(
                "{} is not a Python script",
                path.display()
            )));
        }
        if let Some(existing) = self
            .scripts
            .iter()
            .find(|s| normalize(&self.resolve_path(s)) == normalize(path))
        {
            return Err(CatalogError::Duplicate(existing.name.clone()));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        let name = self.unique_name(&stem);
        self.add(ScriptDefinition::new(name.clone(), path))?;
        Ok(name)
    }

    pub fn get(&self, index: usize) -> Option<&ScriptDefinition> {
        self.scripts.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&ScriptDefinition> {
        self.scripts.iter().find(|s| s.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.scripts.iter().position(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scripts.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn scripts(&self) -> &[ScriptDefinition] {
        &self.scripts
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn add(&mut self, script: ScriptDefinition) -> Result<(), CatalogError> {
        script.validate().map_err(CatalogError::Invalid)?;

        if self.find(&script.name).is_some() {
            return Err(CatalogError::Duplicate(script.name));
        }

        self.scripts.push(script);
        Ok(())
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn set_base_dir(&mut self, dir: Option<PathBuf>) {
        self.base_dir = dir;
    }

    /// Script path with relative paths joined onto the catalog directory
    pub fn resolve_path(&self, script: &ScriptDefinition) -> PathBuf {
        match &self.base_dir {
            Some(base) if script.path.is_relative() => base.join(&script.path),
            _ => script.path.clone(),
        }
    }

    fn unique_name(&self, stem: &str) -> String {
        if self.find(stem).is_none() {
            return stem.to_string();
        }
        (2..)
            .map(|n| format!("{} ({})", stem, n))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or_else(|| stem.to_string())
    }
}

fn is_python_script(path: &Path) -> bool {
    let is_py = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false);
    let is_dunder = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with("__"))
        .unwrap_or(false);
    is_py && !is_dunder
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[[scripts]]
name = "Add numbers"
path = "add_numbers.py"
clue = "Adds two integers."
log_arg_style = "--log"

[[scripts.args]]
key = "--user"
label = "User"
type = "text"
required = true
placeholder = "e.g. Pavel"

[[scripts.args]]
key = "--mode"
label = "Mode"
type = "select"
options = ["fast", "accurate"]

[[scripts]]
name = "Cleaner"
path = "/opt/tools/clean.py"
log_arg_style = "positional"
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = ScriptCatalog::from_toml_str(SAMPLE).unwrap();
        assert_eq!(catalog.names(), vec!["Add numbers", "Cleaner"]);

        let add = catalog.find("Add numbers").unwrap();
        assert_eq!(add.args_schema.len(), 2);
        assert_eq!(add.args_schema[1].kind, FieldKind::Select);
        assert_eq!(add.log_arg_style, LogArgStyle::Flag("--log".into()));

        let cleaner = catalog.get(1).unwrap();
        assert_eq!(cleaner.log_arg_style, LogArgStyle::Positional);
        assert!(cleaner.args_schema.is_empty());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let text = r#"
[[scripts]]
name = "A"
path = "a.py"

[[scripts]]
name = "A"
path = "b.py"
"#;
        assert!(matches!(
            ScriptCatalog::from_toml_str(text),
            Err(CatalogError::Duplicate(name)) if name == "A"
        ));
    }

    #[test]
    fn test_nan_range_rejected() {
        let text = r#"
[[scripts]]
name = "Ratio"
path = "ratio.py"

[[scripts.args]]
key = "--ratio"
type = "float"
min = nan
"#;
        assert!(matches!(
            ScriptCatalog::from_toml_str(text),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ScriptCatalog::from_toml_str("[[scripts]\nname ="),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("scripts.toml");

        let catalog = ScriptCatalog::builtin();
        catalog.save(&path).unwrap();

        let loaded = ScriptCatalog::load(&path).unwrap();
        assert_eq!(loaded.scripts(), catalog.scripts());
        assert_eq!(loaded.base_dir(), path.parent());
    }

    #[test]
    fn test_load_or_builtin_missing_file() {
        let dir = TempDir::new().unwrap();
        let catalog = ScriptCatalog::load_or_builtin(&dir.path().join("absent.toml"));
        assert_eq!(catalog.names(), vec!["Add numbers"]);
    }

    #[test]
    fn test_load_or_builtin_broken_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scripts.toml");
        fs::write(&path, "not = [valid").unwrap();
        assert_eq!(ScriptCatalog::load_or_builtin(&path).len(), 1);
    }

    #[test]
    fn test_resolve_relative_path() {
        let mut catalog = ScriptCatalog::builtin();
        let script = catalog.get(0).unwrap().clone();
        assert_eq!(catalog.resolve_path(&script), PathBuf::from("add_numbers.py"));

        catalog.set_base_dir(Some(PathBuf::from("/srv/scripts")));
        assert_eq!(
            catalog.resolve_path(&script),
            PathBuf::from("/srv/scripts/add_numbers.py")
        );
    }

    #[test]
    fn test_discover_adds_new_scripts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.py"), "print('hi')").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("__init__.py"), "").unwrap();
        fs::create_dir_all(dir.path().join("sub").join("deeper")).unwrap();
        fs::write(dir.path().join("sub").join("add_numbers.py"), "").unwrap();
        fs::write(dir.path().join("sub").join("deeper").join("hidden.py"), "").unwrap();

        let mut catalog = ScriptCatalog::builtin();
        let added = catalog.discover(dir.path()).unwrap();

        assert_eq!(added, 2);
        assert!(catalog.find("report").is_some());
        // The builtin entry points at a different file
        assert!(catalog.find("add_numbers").is_some());
        assert!(catalog.find("hidden").is_none());

        // A second scan finds nothing new
        assert_eq!(catalog.discover(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_discover_suffixes_clashing_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a").join("job.py"), "").unwrap();
        fs::write(dir.path().join("b").join("job.py"), "").unwrap();

        let mut catalog = ScriptCatalog::new();
        assert_eq!(catalog.discover(dir.path()).unwrap(), 2);
        assert_eq!(catalog.names(), vec!["job", "job (2)"]);
    }

    #[test]
    fn test_discover_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.py");
        fs::write(&file, "").unwrap();
        assert!(ScriptCatalog::new().discover(&file).is_err());
    }

    #[test]
    fn test_add_script_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cleanup.py");
        fs::write(&file, "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let mut catalog = ScriptCatalog::new();
        assert_eq!(catalog.add_script_file(&file).unwrap(), "cleanup");
        assert!(matches!(
            catalog.add_script_file(&file),
            Err(CatalogError::Duplicate(name)) if name == "cleanup"
        ));
        assert!(catalog
            .add_script_file(&dir.path().join("notes.txt"))
            .is_err());
        assert_eq!(catalog.len(), 1);
    }
}
