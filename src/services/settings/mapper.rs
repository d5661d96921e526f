use crate::models::script::MainPathMode;
use crate::models::settings::Settings;
use rusqlite::Row;

pub const SETTINGS_COLUMNS: &str = "id, theme, use_system_theme, interpreter, notifications_enabled,
    max_parallel_runs, history_limit, main_path_mode, last_main_path, append_mode_flag,
    auto_scroll, show_timestamps, catalog_path";

pub fn row_to_settings(row: &Row) -> Result<Settings, rusqlite::Error> {
    Ok(Settings {
        id: Some(row.get(0)?),
        theme: row.get(1)?,
        use_system_theme: row.get::<_, i32>(2)? != 0,
        interpreter: row.get(3)?,
        notifications_enabled: row.get::<_, i32>(4)? != 0,
        max_parallel_runs: row.get(5)?,
        history_limit: row.get(6)?,
        main_path_mode: MainPathMode::parse(&row.get::<_, String>(7)?),
        last_main_path: row.get(8)?,
        append_mode_flag: row.get::<_, i32>(9)? != 0,
        auto_scroll: row.get::<_, i32>(10).unwrap_or(1) != 0,
        show_timestamps: row.get::<_, i32>(11).unwrap_or(0) != 0,
        catalog_path: row.get(12).unwrap_or(None),
    })
}
