// Run history service
// Persists every script execution so it can be reviewed and re-run

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, TimeZone};
use rusqlite::{params, Connection, Row};

use crate::models::run::{HistoryEntry, RunStatus};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HISTORY_COLUMNS: &str = "id, script_name, argv, main_path, started_at, finished_at,
    exit_code, status, message, output_lines, error_lines";

/// Final numbers recorded when a run ends
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub finished_at: DateTime<Local>,
    pub output_lines: usize,
    pub error_lines: usize,
}

pub struct HistoryService<'a> {
    conn: &'a Connection,
}

impl<'a> HistoryService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a row for a run that just started and return its id
    pub fn record_start(&self, entry: &HistoryEntry) -> Result<i64> {
        let argv = serde_json::to_string(&entry.argv).context("Failed to encode argv")?;

        self.conn
            .execute(
                "INSERT INTO run_history (script_name, argv, main_path, started_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.script_name,
                    argv,
                    entry.main_path,
                    format_datetime(&entry.started_at),
                    RunStatus::Running.kind_name(),
                ],
            )
            .context("Failed to insert run history")?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Store the final status of a run
    pub fn record_finish(&self, id: i64, outcome: &RunOutcome) -> Result<()> {
        let (exit_code, message) = match &outcome.status {
            RunStatus::Finished { exit_code } => (*exit_code, None),
            RunStatus::Failed { message } => (None, Some(message.clone())),
            _ => (None, None),
        };

        let updated = self
            .conn
            .execute(
                "UPDATE run_history SET
                 finished_at = ?1, exit_code = ?2, status = ?3, message = ?4,
                 output_lines = ?5, error_lines = ?6
                 WHERE id = ?7",
                params![
                    format_datetime(&outcome.finished_at),
                    exit_code,
                    outcome.status.kind_name(),
                    message,
                    outcome.output_lines as i64,
                    outcome.error_lines as i64,
                    id,
                ],
            )
            .context("Failed to update run history")?;

        if updated == 0 {
            return Err(anyhow!("History entry {} not found", id));
        }

        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<HistoryEntry> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM run_history WHERE id = ?1", HISTORY_COLUMNS),
                params![id],
                row_to_entry,
            )
            .context("History entry not found")
    }

    /// Newest first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM run_history ORDER BY started_at DESC, id DESC LIMIT ?1",
            HISTORY_COLUMNS
        ))?;

        let entries = stmt.query_map(params![limit as i64], row_to_entry)?;

        entries
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to fetch run history")
    }

    /// Newest first, only runs of one script
    pub fn list_for_script(&self, script_name: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM run_history WHERE script_name = ?1
             ORDER BY started_at DESC, id DESC LIMIT ?2",
            HISTORY_COLUMNS
        ))?;

        let entries = stmt.query_map(params![script_name, limit as i64], row_to_entry)?;

        entries
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to fetch run history")
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM run_history WHERE id = ?1", params![id])
            .context("Failed to delete history entry")?;
        Ok(())
    }

    /// Remove every entry; returns how many were deleted
    pub fn clear(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM run_history", [])
            .context("Failed to clear run history")
    }

    /// Keep only the newest `keep` entries; returns how many were deleted
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM run_history WHERE id NOT IN (
                    SELECT id FROM run_history ORDER BY started_at DESC, id DESC LIMIT ?1
                 )",
                params![keep as i64],
            )
            .context("Failed to prune run history")?;

        if deleted > 0 {
            log::debug!("Pruned {} old history entries", deleted);
        }

        Ok(deleted)
    }

    /// Mark rows left in "running" by a previous session as failed
    pub fn close_stale(&self) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE run_history SET status = 'failed',
                 message = 'Application closed while the script was running'
                 WHERE status = 'running'",
                [],
            )
            .context("Failed to close stale history entries")
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<HistoryEntry> {
    let argv_json: String = row.get(2)?;
    let argv: Vec<String> = serde_json::from_str(&argv_json).unwrap_or_else(|e| {
        log::warn!("Unreadable argv in history row: {}", e);
        Vec::new()
    });

    Ok(HistoryEntry {
        id: Some(row.get(0)?),
        script_name: row.get(1)?,
        argv,
        main_path: row.get(3)?,
        started_at: parse_datetime(Some(row.get(4)?)).unwrap_or_else(Local::now),
        finished_at: parse_datetime(row.get(5)?),
        exit_code: row.get(6)?,
        status: row.get(7)?,
        message: row.get(8)?,
        output_lines: row.get(9)?,
        error_lines: row.get(10)?,
    })
}

fn format_datetime(dt: &DateTime<Local>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(s: Option<String>) -> Option<DateTime<Local>> {
    s.and_then(|s| {
        chrono::NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
    })
}
