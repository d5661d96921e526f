use std::time::Duration;

use chrono::Local;

use super::RunnerApp;
use crate::models::run::{HistoryEntry, RunId, RunStatus};
use crate::services::history::RunOutcome;
use crate::services::runner::{RunSummary, RunUpdate};

/// Repaint interval while runs are producing output
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl RunnerApp {
    /// Drain run updates: record history, announce finished runs and keep
    /// repainting while anything is active
    pub(super) fn poll_runs(&mut self, ctx: &egui::Context) {
        let updates = self.runs.poll();
        let mut history_changed = false;

        for update in updates {
            match update {
                RunUpdate::Started(id) => {
                    self.record_run_started(id);
                    history_changed = true;
                }
                RunUpdate::Completed(summary) => {
                    self.record_run_finished(&summary);
                    self.announce_run_finished(&summary);
                    history_changed = true;
                }
            }
        }

        if history_changed {
            let keep = self.settings.history_limit as usize;
            if let Err(e) = self.context.history_service().prune(keep) {
                log::warn!("Failed to prune history: {}", e);
            }
            self.refresh_history();
        }

        if self.runs.active_count() > 0 {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }

    fn record_run_started(&mut self, id: RunId) {
        let Some(run) = self.runs.get(id) else {
            return;
        };
        let mut entry = HistoryEntry::new(
            run.script_name(),
            run.command().argv(),
            run.main_path().map(str::to_string),
        );
        entry.started_at = run.started_at().unwrap_or_else(Local::now);

        match self.context.history_service().record_start(&entry) {
            Ok(history_id) => self.runs.set_history_id(id, history_id),
            Err(e) => log::error!("Failed to record start of run {}: {}", id, e),
        }
    }

    /// Runs that never started (spawn errors, cancelled while queued) get
    /// their row here
    fn record_run_finished(&mut self, summary: &RunSummary) {
        let history = self.context.history_service();

        let history_id = match summary.history_id {
            Some(id) => id,
            None => {
                let mut entry = HistoryEntry::new(
                    summary.script_name.clone(),
                    summary.argv.clone(),
                    summary.main_path.clone(),
                );
                if let Some(started) = summary.started_at {
                    entry.started_at = started;
                }
                match history.record_start(&entry) {
                    Ok(id) => id,
                    Err(e) => {
                        log::error!("Failed to record run {}: {}", summary.id, e);
                        return;
                    }
                }
            }
        };

        let outcome = RunOutcome {
            status: summary.status.clone(),
            finished_at: summary.finished_at.unwrap_or_else(Local::now),
            output_lines: summary.output_lines,
            error_lines: summary.error_lines,
        };
        if let Err(e) = history.record_finish(history_id, &outcome) {
            log::error!("Failed to record end of run {}: {}", summary.id, e);
        }
    }

    fn announce_run_finished(&mut self, summary: &RunSummary) {
        if let Err(e) = self
            .context
            .notification_service()
            .show_run_finished(&summary.script_name, &summary.status)
        {
            log::warn!("{}", e);
        }

        let message = format!("{}: {}", summary.script_name, summary.status.label());
        match &summary.status {
            status if status.is_success() => self.toast_manager.success(message),
            RunStatus::Cancelled => self.toast_manager.info(message),
            RunStatus::Finished { .. } => self.toast_manager.warning(message),
            RunStatus::Failed { message: reason } => self
                .toast_manager
                .error(format!("{} failed: {}", summary.script_name, reason)),
            RunStatus::Queued | RunStatus::Running => {}
        }

        if self.viewed_run_id() == Some(summary.id) {
            self.state.status = summary.status.label();
        }
    }
}
