//! Confirmation dialogs for actions that kill processes or delete data.

use egui::{Context, RichText};

use super::RunnerApp;
use crate::services::command::CommandLine;

#[derive(Debug, Clone)]
pub enum ConfirmAction {
    /// Clear the window while runs are still active
    ClearAll,
    ClearHistory,
    DeleteTemplate { template_id: i64, template_name: String },
    /// The script file is missing; run the command anyway
    RunMissingScript {
        script_name: String,
        message: String,
        command: CommandLine,
    },
}

impl ConfirmAction {
    pub fn title(&self) -> &'static str {
        match self {
            ConfirmAction::ClearAll => "Clear All",
            ConfirmAction::ClearHistory => "Clear History",
            ConfirmAction::DeleteTemplate { .. } => "Delete Template",
            ConfirmAction::RunMissingScript { .. } => "Script Not Found",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ConfirmAction::ClearAll => "Kill it and clear the GUI?".to_string(),
            ConfirmAction::ClearHistory => {
                "Delete every entry of the run history?\n\nThis action cannot be undone.".to_string()
            }
            ConfirmAction::DeleteTemplate { template_name, .. } => format!(
                "Are you sure you want to delete the template \"{}\"?\n\nThis action cannot be undone.",
                template_name
            ),
            ConfirmAction::RunMissingScript { message, .. } => message.clone(),
        }
    }

    pub fn confirm_text(&self) -> &'static str {
        match self {
            ConfirmAction::ClearAll => "Kill and clear",
            ConfirmAction::ClearHistory => "Clear",
            ConfirmAction::DeleteTemplate { .. } => "Delete",
            ConfirmAction::RunMissingScript { .. } => "Run anyway",
        }
    }

    /// Destructive actions get a red confirm button
    pub fn is_destructive(&self) -> bool {
        !matches!(self, ConfirmAction::RunMissingScript { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    Confirmed,
    Cancelled,
    Pending,
}

#[derive(Debug, Default)]
pub struct ConfirmDialogState {
    pending_action: Option<ConfirmAction>,
}

impl ConfirmDialogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, action: ConfirmAction) {
        self.pending_action = Some(action);
    }

    pub fn is_open(&self) -> bool {
        self.pending_action.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending_action = None;
    }

    pub fn take_action(&mut self) -> Option<ConfirmAction> {
        self.pending_action.take()
    }

    /// Render the dialog. On `Confirmed` the action stays pending for
    /// `take_action`.
    pub fn render(&mut self, ctx: &Context) -> ConfirmResult {
        let Some(action) = &self.pending_action else {
            return ConfirmResult::Pending;
        };

        let mut result = ConfirmResult::Pending;

        egui::Window::new(action.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.set_max_width(420.0);
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("⚠")
                            .size(24.0)
                            .color(egui::Color32::from_rgb(220, 150, 50)),
                    );
                    ui.vertical(|ui| {
                        ui.label(action.message());
                    });
                });

                ui.add_space(15.0);
                ui.separator();
                ui.add_space(10.0);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let confirm_button = if action.is_destructive() {
                        egui::Button::new(
                            RichText::new(action.confirm_text()).color(egui::Color32::WHITE),
                        )
                        .fill(egui::Color32::from_rgb(180, 60, 60))
                    } else {
                        egui::Button::new(action.confirm_text())
                    };

                    if ui.add(confirm_button).clicked() {
                        result = ConfirmResult::Confirmed;
                    }

                    ui.add_space(10.0);

                    if ui.button("Cancel").clicked() {
                        result = ConfirmResult::Cancelled;
                    }
                });

                ui.add_space(5.0);
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            result = ConfirmResult::Cancelled;
        }

        if result == ConfirmResult::Cancelled {
            self.pending_action = None;
        }

        result
    }
}

impl RunnerApp {
    pub(super) fn handle_confirm_dialog(&mut self, ctx: &Context) {
        if self.confirm_dialog.render(ctx) == ConfirmResult::Confirmed {
            if let Some(action) = self.confirm_dialog.take_action() {
                self.execute_confirmed_action(action);
            }
        }
    }

    fn execute_confirmed_action(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::ClearAll => {
                log::info!("Clearing the window with {} active runs", self.runs.active_count());
                self.clear_all();
            }
            ConfirmAction::ClearHistory => match self.context.history_service().clear() {
                Ok(removed) => {
                    log::info!("Cleared {} history entries", removed);
                    self.state.history.clear();
                    self.toast_manager.success(format!("Removed {} history entries", removed));
                }
                Err(e) => {
                    log::error!("Failed to clear history: {}", e);
                    self.toast_manager.error(format!("Failed to clear history: {}", e));
                }
            },
            ConfirmAction::DeleteTemplate {
                template_id,
                template_name,
            } => {
                if let Err(e) = self.context.template_service().delete(template_id) {
                    log::error!("Failed to delete template: {}", e);
                    self.toast_manager.error(format!("Failed to delete template: {}", e));
                } else {
                    log::info!("Deleted template {} (ID: {})", template_name, template_id);
                    self.state.selected_template = None;
                    self.state.template_name.clear();
                    self.refresh_templates();
                    self.toast_manager.success(format!("Deleted \"{}\"", template_name));
                }
            }
            ConfirmAction::RunMissingScript {
                script_name,
                command,
                ..
            } => {
                log::warn!("Running {} although its script file is missing", script_name);
                let main_path = Some(self.state.main_path.trim().to_string());
                self.submit_run(script_name, command, main_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_all_wording() {
        let action = ConfirmAction::ClearAll;
        assert_eq!(action.message(), "Kill it and clear the GUI?");
        assert!(action.is_destructive());
    }

    #[test]
    fn test_missing_script_is_not_destructive() {
        let action = ConfirmAction::RunMissingScript {
            script_name: "Add numbers".into(),
            message: "Script 'add_numbers.py' was not found. Continue anyway?".into(),
            command: CommandLine::new("python3"),
        };
        assert!(!action.is_destructive());
        assert_eq!(action.confirm_text(), "Run anyway");
        assert!(action.message().contains("add_numbers.py"));
    }

    #[test]
    fn test_state_request_and_take() {
        let mut state = ConfirmDialogState::new();
        assert!(!state.is_open());
        state.request(ConfirmAction::ClearHistory);
        assert!(state.is_open());
        assert!(matches!(state.take_action(), Some(ConfirmAction::ClearHistory)));
        assert!(!state.is_open());

        state.request(ConfirmAction::ClearAll);
        state.cancel();
        assert!(!state.is_open());
    }
}
