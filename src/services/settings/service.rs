use crate::models::settings::Settings;
use crate::services::database::Database;
use anyhow::{anyhow, Context, Result};

use super::mapper::{row_to_settings, SETTINGS_COLUMNS};

pub struct SettingsService<'a> {
    db: &'a Database,
}

impl<'a> SettingsService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get the current settings
    pub fn get(&self) -> Result<Settings> {
        let conn = self.db.connection();

        let settings = conn
            .query_row(
                &format!("SELECT {} FROM settings WHERE id = 1", SETTINGS_COLUMNS),
                [],
                row_to_settings,
            )
            .context("Failed to load settings")?;

        Ok(settings)
    }

    /// Update settings
    pub fn update(&self, settings: &Settings) -> Result<()> {
        settings
            .validate()
            .map_err(|e| anyhow!("Invalid settings: {}", e))?;

        let conn = self.db.connection();

        conn.execute(
            "UPDATE settings \
             SET theme = ?1, \
                 use_system_theme = ?2, \
                 interpreter = ?3, \
                 notifications_enabled = ?4, \
                 max_parallel_runs = ?5, \
                 history_limit = ?6, \
                 main_path_mode = ?7, \
                 last_main_path = ?8, \
                 append_mode_flag = ?9, \
                 auto_scroll = ?10, \
                 show_timestamps = ?11, \
                 catalog_path = ?12, \
                 updated_at = CURRENT_TIMESTAMP \
             WHERE id = 1",
            (
                &settings.theme,
                settings.use_system_theme as i32,
                settings.interpreter.trim(),
                settings.notifications_enabled as i32,
                settings.max_parallel_runs,
                settings.history_limit,
                settings.main_path_mode.as_str(),
                &settings.last_main_path,
                settings.append_mode_flag as i32,
                settings.auto_scroll as i32,
                settings.show_timestamps as i32,
                &settings.catalog_path,
            ),
        )
        .context("Failed to update settings")?;

        Ok(())
    }

    /// Reset settings to defaults
    pub fn reset(&self) -> Result<()> {
        let default_settings = Settings::default();
        self.update(&default_settings)
    }
}
