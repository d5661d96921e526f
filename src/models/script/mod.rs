// Script definition model
// A runnable script together with the schema of its parameters

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::field::FieldSchema;

/// How the main path is handed to a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogArgStyle {
    /// `<flag> <path>`, e.g. `--log /tmp/app.log`
    Flag(String),
    /// The path as a bare argument
    Positional,
}

impl Default for LogArgStyle {
    fn default() -> Self {
        LogArgStyle::Flag("--log".to_string())
    }
}

impl From<String> for LogArgStyle {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("positional") {
            LogArgStyle::Positional
        } else if trimmed.is_empty() {
            LogArgStyle::default()
        } else {
            LogArgStyle::Flag(trimmed.to_string())
        }
    }
}

impl From<LogArgStyle> for String {
    fn from(value: LogArgStyle) -> Self {
        match value {
            LogArgStyle::Flag(flag) => flag,
            LogArgStyle::Positional => "positional".to_string(),
        }
    }
}

/// Whether the main path selector picks a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MainPathMode {
    #[default]
    File,
    Folder,
}

impl MainPathMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MainPathMode::File => "File",
            MainPathMode::Folder => "Folder",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("folder") {
            MainPathMode::Folder
        } else {
            MainPathMode::File
        }
    }
}

/// A script the runner knows how to launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDefinition {
    pub name: String,
    pub path: PathBuf,
    /// Short description shown as a tooltip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clue: Option<String>,
    #[serde(default, rename = "args", skip_serializing_if = "Vec::is_empty")]
    pub args_schema: Vec<FieldSchema>,
    #[serde(default)]
    pub log_arg_style: LogArgStyle,
    /// Overrides the interpreter from settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Always appended after the form arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl ScriptDefinition {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            clue: None,
            args_schema: Vec::new(),
            log_arg_style: LogArgStyle::default(),
            interpreter: None,
            working_dir: None,
            extra_args: Vec::new(),
        }
    }

    pub fn with_clue(mut self, clue: impl Into<String>) -> Self {
        self.clue = Some(clue.into());
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.args_schema.push(field);
        self
    }

    pub fn with_log_arg_style(mut self, style: LogArgStyle) -> Self {
        self.log_arg_style = style;
        self
    }

    pub fn clue_or_default(&self) -> &str {
        self.clue
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("No clue available.")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Script name cannot be empty".to_string());
        }

        if self.path.as_os_str().is_empty() {
            return Err(format!("Script '{}' has no path", self.name));
        }

        let mut seen = HashSet::new();
        for field in &self.args_schema {
            field
                .validate()
                .map_err(|e| format!("Script '{}': {}", self.name, e))?;

            if !field.key.is_empty() && !seen.insert(field.key.as_str()) {
                return Err(format!(
                    "Script '{}' declares '{}' more than once",
                    self.name, field.key
                ));
            }
        }

        Ok(())
    }
}
