use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_settings_table(conn)?;
    run_settings_migrations(conn)?;
    insert_default_settings(conn)?;
    create_run_history_table(conn)?;
    create_argument_templates_table(conn)?;
    Ok(())
}

fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            theme TEXT NOT NULL DEFAULT 'light',
            use_system_theme INTEGER NOT NULL DEFAULT 0,
            interpreter TEXT NOT NULL DEFAULT 'python3',
            notifications_enabled INTEGER NOT NULL DEFAULT 1,
            max_parallel_runs INTEGER NOT NULL DEFAULT 2,
            history_limit INTEGER NOT NULL DEFAULT 200,
            main_path_mode TEXT NOT NULL DEFAULT 'File',
            last_main_path TEXT,
            append_mode_flag INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create settings table")?;

    Ok(())
}

/// Columns added after the first release of the settings table
fn run_settings_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "settings",
        "auto_scroll",
        "ALTER TABLE settings ADD COLUMN auto_scroll INTEGER NOT NULL DEFAULT 1",
    )?;

    migrations::ensure_column(
        conn,
        "settings",
        "show_timestamps",
        "ALTER TABLE settings ADD COLUMN show_timestamps INTEGER NOT NULL DEFAULT 0",
    )?;

    migrations::ensure_column(
        conn,
        "settings",
        "catalog_path",
        "ALTER TABLE settings ADD COLUMN catalog_path TEXT",
    )?;

    Ok(())
}

fn insert_default_settings(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, theme, interpreter)
         VALUES (1, 'light', ?1)",
        [crate::models::settings::default_interpreter()],
    )
    .context("Failed to insert default settings")?;

    Ok(())
}

fn create_run_history_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS run_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            script_name TEXT NOT NULL,
            argv TEXT NOT NULL,
            main_path TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            exit_code INTEGER,
            status TEXT NOT NULL DEFAULT 'running',
            message TEXT,
            output_lines INTEGER NOT NULL DEFAULT 0,
            error_lines INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .context("Failed to create run_history table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_run_history_started ON run_history(started_at)",
        [],
    )
    .context("Failed to create run_history index")?;

    Ok(())
}

fn create_argument_templates_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS argument_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            script_name TEXT NOT NULL,
            field_values TEXT NOT NULL DEFAULT '{}',
            extra_args TEXT NOT NULL DEFAULT '',
            main_path TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(script_name, name)
        )",
        [],
    )
    .context("Failed to create argument_templates table")?;

    Ok(())
}
