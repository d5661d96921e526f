// Run model
// Status, progress and history records for script executions

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Identifier of a run within one application session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Waiting for a free parallel slot
    Queued,
    Running,
    Finished { exit_code: Option<i32> },
    /// The process could not be started or its output could not be read
    Failed { message: String },
    Cancelled,
}

impl RunStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// True for a clean exit with status 0
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Finished { exit_code: Some(0) })
    }

    /// Short text for the status label
    pub fn label(&self) -> String {
        match self {
            RunStatus::Queued => "Queued".to_string(),
            RunStatus::Running => "Running...".to_string(),
            RunStatus::Finished { exit_code: Some(code) } => format!("Finished (code {})", code),
            RunStatus::Finished { exit_code: None } => "Finished (terminated by signal)".to_string(),
            RunStatus::Failed { .. } => "Error".to_string(),
            RunStatus::Cancelled => "Cancelled".to_string(),
        }
    }

    /// Name stored in the history table
    pub fn kind_name(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Finished { .. } => "finished",
            RunStatus::Failed { .. } => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Rebuild a status from its stored parts
    pub fn from_parts(kind: &str, exit_code: Option<i32>, message: Option<String>) -> Self {
        match kind {
            "queued" => RunStatus::Queued,
            "running" => RunStatus::Running,
            "finished" => RunStatus::Finished { exit_code },
            "cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Failed {
                message: message.unwrap_or_else(|| "Unknown failure".to_string()),
            },
        }
    }
}

/// Progress bar state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    /// No PROGRESS line seen yet
    #[default]
    Busy,
    Percent(u8),
}

impl Progress {
    /// Fraction for the progress bar; `None` while busy
    pub fn fraction(&self) -> Option<f32> {
        match self {
            Progress::Busy => None,
            Progress::Percent(p) => Some(f32::from(*p) / 100.0),
        }
    }

    /// Leave the indeterminate state once a run stops
    pub fn settle(self) -> Self {
        match self {
            Progress::Busy => Progress::Percent(0),
            other => other,
        }
    }
}

/// One row of the run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Option<i64>,
    pub script_name: String,
    /// Full argv, program first
    pub argv: Vec<String>,
    pub main_path: Option<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub exit_code: Option<i32>,
    pub status: String,
    pub message: Option<String>,
    pub output_lines: i64,
    pub error_lines: i64,
}

impl HistoryEntry {
    pub fn new(script_name: impl Into<String>, argv: Vec<String>, main_path: Option<String>) -> Self {
        Self {
            id: None,
            script_name: script_name.into(),
            argv,
            main_path,
            started_at: Local::now(),
            finished_at: None,
            exit_code: None,
            status: RunStatus::Running.kind_name().to_string(),
            message: None,
            output_lines: 0,
            error_lines: 0,
        }
    }

    pub fn run_status(&self) -> RunStatus {
        RunStatus::from_parts(&self.status, self.exit_code, self.message.clone())
    }

    /// Wall-clock duration in seconds, if finished
    pub fn duration_secs(&self) -> Option<i64> {
        self.finished_at
            .map(|end| end.signed_duration_since(self.started_at).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_activity() {
        assert!(RunStatus::Queued.is_active());
        assert!(RunStatus::Running.is_active());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(RunStatus::Finished { exit_code: Some(0) }.is_success());
        assert!(!RunStatus::Finished { exit_code: Some(2) }.is_success());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(
            RunStatus::Finished { exit_code: Some(2) }.label(),
            "Finished (code 2)"
        );
        assert_eq!(RunStatus::Cancelled.label(), "Cancelled");
        assert_eq!(
            RunStatus::Failed { message: "boom".into() }.label(),
            "Error"
        );
    }

    #[test]
    fn test_status_parts_round_trip() {
        let statuses = [
            RunStatus::Finished { exit_code: Some(1) },
            RunStatus::Cancelled,
            RunStatus::Failed { message: "no python".into() },
        ];
        for status in statuses {
            let (code, message) = match &status {
                RunStatus::Finished { exit_code } => (*exit_code, None),
                RunStatus::Failed { message } => (None, Some(message.clone())),
                _ => (None, None),
            };
            assert_eq!(RunStatus::from_parts(status.kind_name(), code, message), status);
        }
    }

    #[test]
    fn test_progress_settle() {
        assert_eq!(Progress::Busy.settle(), Progress::Percent(0));
        assert_eq!(Progress::Percent(40).settle(), Progress::Percent(40));
        assert_eq!(Progress::Percent(50).fraction(), Some(0.5));
        assert_eq!(Progress::Busy.fraction(), None);
    }

    #[test]
    fn test_history_duration() {
        let mut entry = HistoryEntry::new("Add numbers", vec!["python3".into()], None);
        assert_eq!(entry.duration_secs(), None);
        entry.finished_at = Some(entry.started_at + Duration::seconds(3));
        assert_eq!(entry.duration_secs(), Some(3));
    }
}
