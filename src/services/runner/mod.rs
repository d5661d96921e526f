// Run manager
// Queues script runs, starts them up to a parallel limit and collects their output

use std::sync::mpsc::{Receiver, TryRecvError};

use chrono::{DateTime, Local};

use crate::models::run::{Progress, RunId, RunStatus};
use crate::models::settings::MAX_PARALLEL_RUNS;
use crate::services::command::CommandLine;
use crate::services::output::{LineKind, RunLog, DEFAULT_LOG_CAPACITY};
use crate::services::process::{ProcessError, RunEvent, ScriptProcess};

/// Upper bound of channel events handled per run and poll
const MAX_EVENTS_PER_POLL: usize = 5_000;

/// One execution of a script
pub struct Run {
    id: RunId,
    script_name: String,
    command: CommandLine,
    main_path: Option<String>,
    status: RunStatus,
    progress: Progress,
    log: RunLog,
    queued_at: DateTime<Local>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    history_id: Option<i64>,
    cancel_requested: bool,
    process: Option<ScriptProcess>,
    events: Option<Receiver<RunEvent>>,
}

impl Run {
    fn new(
        id: RunId,
        script_name: String,
        command: CommandLine,
        main_path: Option<String>,
    ) -> Self {
        Self {
            id,
            script_name,
            command,
            main_path,
            status: RunStatus::Queued,
            progress: Progress::Busy,
            log: RunLog::with_capacity(DEFAULT_LOG_CAPACITY),
            queued_at: Local::now(),
            started_at: None,
            finished_at: None,
            history_id: None,
            cancel_requested: false,
            process: None,
            events: None,
        }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    pub fn main_path(&self) -> Option<&str> {
        self.main_path.as_deref()
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn queued_at(&self) -> DateTime<Local> {
        self.queued_at
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn history_id(&self) -> Option<i64> {
        self.history_id
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancel_requested && self.status.is_active()
    }

    /// Text for the status label. Shows the percentage while running, like
    /// the progress bar does.
    pub fn status_text(&self) -> String {
        match (&self.status, self.progress) {
            (RunStatus::Running, _) if self.cancel_requested => "Cancelling...".to_string(),
            (RunStatus::Running, Progress::Percent(p)) => format!("{}%", p),
            (status, _) => status.label(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id,
            script_name: self.script_name.clone(),
            argv: self.command.argv(),
            main_path: self.main_path.clone(),
            status: self.status.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            output_lines: self.log.total_lines(),
            error_lines: self.log.error_lines(),
            history_id: self.history_id,
        }
    }

    fn finish(&mut self, status: RunStatus) {
        self.progress = match status {
            RunStatus::Finished { .. } => Progress::Percent(100),
            _ => self.progress.settle(),
        };
        self.status = status;
        self.finished_at = Some(Local::now());
        self.process = None;
        self.events = None;
    }

    /// Drain pending events; returns true once the run reached a final state
    fn drain_events(&mut self) -> bool {
        let Some(rx) = self.events.as_ref() else {
            return false;
        };

        let mut exit = None;
        let mut disconnected = false;
        for _ in 0..MAX_EVENTS_PER_POLL {
            match rx.try_recv() {
                Ok(RunEvent::Output { stream, line }) => {
                    if let LineKind::Progress(value) = self.log.push(stream, line) {
                        self.progress = Progress::Percent(value);
                    }
                }
                Ok(RunEvent::ReadError { stream, message }) => {
                    self.log
                        .push_note(format!("[Read error on {}] {}", stream.as_str(), message));
                }
                Ok(RunEvent::Exited { code, success }) => {
                    exit = Some((code, success));
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if let Some((code, _success)) = exit {
            let status = if self.cancel_requested {
                RunStatus::Cancelled
            } else {
                RunStatus::Finished { exit_code: code }
            };
            self.finish(status);
            return true;
        }

        if disconnected {
            let message = "Output channel closed unexpectedly".to_string();
            self.log.push_note(format!("[Process error] {}", message));
            self.finish(RunStatus::Failed { message });
            return true;
        }

        false
    }
}

/// What the UI needs to record and announce a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub id: RunId,
    pub script_name: String,
    pub argv: Vec<String>,
    pub main_path: Option<String>,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub output_lines: usize,
    pub error_lines: usize,
    pub history_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Started(RunId),
    Completed(RunSummary),
}

pub struct RunManager {
    runs: Vec<Run>,
    next_id: u64,
    max_parallel: usize,
    updates: Vec<RunUpdate>,
}

impl RunManager {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            runs: Vec::new(),
            next_id: 1,
            max_parallel: clamp_parallel(max_parallel),
            updates: Vec::new(),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub fn set_max_parallel(&mut self, max_parallel: usize) {
        self.max_parallel = clamp_parallel(max_parallel);
        self.pump();
    }

    /// Queue a run and start it if a slot is free
    pub fn submit(
        &mut self,
        script_name: impl Into<String>,
        command: CommandLine,
        main_path: Option<String>,
    ) -> RunId {
        let id = RunId(self.next_id);
        self.next_id += 1;

        let run = Run::new(id, script_name.into(), command, main_path);
        log::debug!("Queued run {} for {}", id, run.script_name);
        self.runs.push(run);
        self.pump();
        id
    }

    /// Start queued runs, oldest first, while slots are free
    pub fn pump(&mut self) {
        let mut running = self.running_count();
        for run in self.runs.iter_mut() {
            if running >= self.max_parallel {
                break;
            }
            if run.status != RunStatus::Queued {
                continue;
            }

            match ScriptProcess::spawn(&run.command, run.id) {
                Ok((process, events)) => {
                    run.status = RunStatus::Running;
                    run.started_at = Some(Local::now());
                    run.process = Some(process);
                    run.events = Some(events);
                    running += 1;
                    self.updates.push(RunUpdate::Started(run.id));
                }
                Err(e) => {
                    log::error!("Run {} could not start: {}", run.id, e);
                    run.started_at = Some(Local::now());
                    run.log.push_note(format!("[Process error] {}", e));
                    run.finish(RunStatus::Failed {
                        message: e.to_string(),
                    });
                    self.updates.push(RunUpdate::Completed(run.summary()));
                }
            }
        }
    }

    /// Collect output and state changes from every run. Call once per frame.
    pub fn poll(&mut self) -> Vec<RunUpdate> {
        self.pump();

        let mut freed = false;
        for run in self.runs.iter_mut() {
            if run.drain_events() {
                freed = true;
                self.updates.push(RunUpdate::Completed(run.summary()));
            }
        }

        if freed {
            self.pump();
        }

        std::mem::take(&mut self.updates)
    }

    /// Stop a run. Queued runs are cancelled at once; running ones once the
    /// process has exited. Returns false for unknown or finished runs.
    pub fn cancel(&mut self, id: RunId) -> Result<bool, ProcessError> {
        let Some(run) = self.runs.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };

        match run.status {
            RunStatus::Queued => {
                run.cancel_requested = true;
                run.finish(RunStatus::Cancelled);
                self.updates.push(RunUpdate::Completed(run.summary()));
                Ok(true)
            }
            RunStatus::Running => {
                run.cancel_requested = true;
                if let Some(process) = &run.process {
                    process.kill()?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Cancel `id` if needed and queue the same command again
    pub fn restart(&mut self, id: RunId) -> Option<RunId> {
        let run = self.get(id)?;
        let script_name = run.script_name.clone();
        let command = run.command.clone();
        let main_path = run.main_path.clone();

        if let Err(e) = self.cancel(id) {
            log::warn!("Could not stop run {} before restarting: {}", id, e);
        }

        Some(self.submit(script_name, command, main_path))
    }

    /// Cancel every queued and running run; returns how many were affected
    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<RunId> = self
            .runs
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.id)
            .collect();

        // Queued runs first so none of them starts while slots free up
        let (queued, running): (Vec<RunId>, Vec<RunId>) = ids
            .into_iter()
            .partition(|id| matches!(self.get(*id).map(|r| &r.status), Some(RunStatus::Queued)));

        let mut cancelled = 0;
        for id in queued.into_iter().chain(running) {
            match self.cancel(id) {
                Ok(true) => cancelled += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Could not stop run {}: {}", id, e),
            }
        }
        cancelled
    }

    /// Forget finished runs; returns how many were removed
    pub fn clear_finished(&mut self) -> usize {
        let before = self.runs.len();
        self.runs.retain(|r| r.status.is_active());
        before - self.runs.len()
    }

    pub fn clear_log(&mut self, id: RunId) {
        if let Some(run) = self.get_mut(id) {
            run.log.clear();
        }
    }

    pub fn set_history_id(&mut self, id: RunId, history_id: i64) {
        if let Some(run) = self.get_mut(id) {
            run.history_id = Some(history_id);
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn get(&self, id: RunId) -> Option<&Run> {
        self.runs.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: RunId) -> Option<&mut Run> {
        self.runs.iter_mut().find(|r| r.id == id)
    }

    /// Queued plus running
    pub fn active_count(&self) -> usize {
        self.runs.iter().filter(|r| r.status.is_active()).count()
    }

    pub fn running_count(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Running)
            .count()
    }

    pub fn latest(&self) -> Option<&Run> {
        self.runs.last()
    }
}

impl Drop for RunManager {
    fn drop(&mut self) {
        let stopped = self.cancel_all();
        if stopped > 0 {
            log::info!("Stopped {} runs on shutdown", stopped);
        }
    }
}

fn clamp_parallel(n: usize) -> usize {
    n.clamp(1, MAX_PARALLEL_RUNS as usize)
}
