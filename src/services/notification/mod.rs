use anyhow::Result;
use notify_rust::{Notification, Timeout};

use crate::models::run::RunStatus;

/// Service for displaying system notifications
pub struct NotificationService {
    enabled: bool,
}

impl NotificationService {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable notifications
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Announce that a script finished, failed or was cancelled
    pub fn show_run_finished(&self, script_name: &str, status: &RunStatus) -> Result<()> {
        if !self.enabled || status.is_active() {
            return Ok(());
        }

        let (summary, body) = run_finished_message(script_name, status);
        let timeout = match urgency_for(status) {
            NotificationUrgency::Normal => Timeout::Milliseconds(5000),
            NotificationUrgency::Critical => Timeout::Milliseconds(10000),
        };

        Notification::new()
            .summary(&summary)
            .body(&body)
            .timeout(timeout)
            .show()
            .map_err(|e| anyhow::anyhow!("Failed to show notification: {}", e))?;

        Ok(())
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationUrgency {
    Normal,
    Critical,
}

pub fn urgency_for(status: &RunStatus) -> NotificationUrgency {
    match status {
        RunStatus::Failed { .. } => NotificationUrgency::Critical,
        RunStatus::Finished { .. } if !status.is_success() => NotificationUrgency::Critical,
        _ => NotificationUrgency::Normal,
    }
}

/// Title and body for a finished run
pub fn run_finished_message(script_name: &str, status: &RunStatus) -> (String, String) {
    let body = match status {
        RunStatus::Failed { message } => format!("Error: {}", message),
        other => other.label(),
    };
    (script_name.to_string(), body)
}
