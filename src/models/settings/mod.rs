// Settings module
// Persisted application preferences

use crate::models::script::MainPathMode;

pub const MAX_PARALLEL_RUNS: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub id: Option<i64>,
    pub theme: String,
    pub use_system_theme: bool,
    /// Interpreter used when a script does not name its own
    pub interpreter: String,
    pub notifications_enabled: bool,
    pub max_parallel_runs: u32,
    /// Number of history rows kept
    pub history_limit: u32,
    pub main_path_mode: MainPathMode,
    pub last_main_path: Option<String>,
    /// Append `--mode gui` so scripts know they run under the runner
    pub append_mode_flag: bool,
    pub auto_scroll: bool,
    pub show_timestamps: bool,
    /// Catalog file; the default location is used when unset
    pub catalog_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            id: Some(1),
            theme: "light".to_string(),
            use_system_theme: false,
            interpreter: default_interpreter().to_string(),
            notifications_enabled: true,
            max_parallel_runs: 2,
            history_limit: 200,
            main_path_mode: MainPathMode::File,
            last_main_path: None,
            append_mode_flag: true,
            auto_scroll: true,
            show_timestamps: false,
            catalog_path: None,
        }
    }
}

impl Settings {
    pub fn is_dark(&self) -> bool {
        self.theme.to_lowercase().contains("dark")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interpreter.trim().is_empty() {
            return Err("Interpreter cannot be empty".to_string());
        }

        if self.max_parallel_runs == 0 || self.max_parallel_runs > MAX_PARALLEL_RUNS {
            return Err(format!(
                "Parallel runs must be between 1 and {}",
                MAX_PARALLEL_RUNS
            ));
        }

        if self.history_limit == 0 {
            return Err("History limit must be at least 1".to_string());
        }

        Ok(())
    }
}

/// `python` on Windows, `python3` elsewhere
pub fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.is_dark());
        assert!(settings.append_mode_flag);
    }

    #[test]
    fn test_parallel_bounds() {
        let mut settings = Settings::default();
        settings.max_parallel_runs = 0;
        assert!(settings.validate().is_err());
        settings.max_parallel_runs = MAX_PARALLEL_RUNS + 1;
        assert!(settings.validate().is_err());
        settings.max_parallel_runs = MAX_PARALLEL_RUNS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_interpreter_rejected() {
        let settings = Settings {
            interpreter: " ".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
