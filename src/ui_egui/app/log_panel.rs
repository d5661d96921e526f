use egui::{RichText, TextEdit};

use super::RunnerApp;
use crate::models::run::Progress;
use crate::services::output::OutputLine;

/// Upper bound of words offered in a line's context menu
const MAX_TOKENS: usize = 20;

enum LogAction {
    Select(String),
    Paste { field: Option<usize>, text: String },
    Copy(String),
}

impl RunnerApp {
    pub(super) fn render_log_panel(&mut self, ui: &mut egui::Ui) {
        self.render_progress_row(ui);
        ui.add_space(4.0);
        self.render_filter_bar(ui);
        ui.add_space(4.0);
        self.render_log_view(ui);
    }

    fn render_progress_row(&mut self, ui: &mut egui::Ui) {
        let (progress, active, status) = match self.viewed_run() {
            Some(run) => (
                run.progress(),
                run.status().is_active(),
                format!("{} {}: {}", run.id(), run.script_name(), run.status_text()),
            ),
            None => (Progress::Percent(0), false, self.state.status.clone()),
        };

        ui.horizontal(|ui| {
            let bar = match progress.fraction() {
                Some(fraction) => egui::ProgressBar::new(fraction).show_percentage(),
                None if active => egui::ProgressBar::new(0.0).animate(true).text("Running..."),
                None => egui::ProgressBar::new(0.0),
            };
            ui.add(bar.desired_width(220.0));
            ui.label(status);
        });
    }

    fn render_filter_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("🔍");
            let response = ui.add(
                TextEdit::singleline(&mut self.state.filter.query)
                    .hint_text("Filter output (Ctrl+F)")
                    .desired_width(200.0),
            );
            if self.state.focus_filter_requested {
                response.request_focus();
                self.state.focus_filter_requested = false;
            }
            ui.checkbox(&mut self.state.filter.case_sensitive, "Aa")
                .on_hover_text("Match case");
            ui.checkbox(&mut self.state.filter.errors_only, "Errors only");
            ui.checkbox(&mut self.state.filter.hide_progress, "Hide progress");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .button("📝 Paste from Log")
                    .on_hover_text("Paste the selected line into the focused field")
                    .clicked()
                {
                    self.paste_selected_line();
                }
                if ui.button("Clear Log").clicked() {
                    self.clear_log();
                }
                if let Some(run) = self.viewed_run() {
                    let log = run.log();
                    let mut counts = format!(
                        "{} lines · {} errors · {} warnings",
                        log.total_lines(),
                        log.error_lines(),
                        log.warning_lines()
                    );
                    if log.dropped_lines() > 0 {
                        counts.push_str(&format!(" · {} dropped", log.dropped_lines()));
                    }
                    ui.label(RichText::new(counts).small().color(self.active_theme.text_secondary));
                }
            });
        });
    }

    fn render_log_view(&mut self, ui: &mut egui::Ui) {
        let theme = self.active_theme.clone();
        let timestamps = self.settings.show_timestamps;
        let field_labels: Vec<String> = self
            .form
            .bindings()
            .iter()
            .map(|b| b.schema.display_label().to_string())
            .collect();

        let run = self
            .state
            .selected_run
            .and_then(|id| self.runs.get(id))
            .or_else(|| self.runs.latest());
        let Some(run) = run else {
            egui::Frame::none()
                .fill(theme.log_background)
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.set_min_size(ui.available_size());
                    ui.label(RichText::new("Output of your runs appears here.").italics());
                });
            return;
        };

        let lines: Vec<&OutputLine> = run.log().filtered(&self.state.filter).collect();
        let selected_line = self.state.selected_line.as_deref();
        let row_height = ui.spacing().interact_size.y;
        let mut action = None;

        egui::Frame::none()
            .fill(theme.log_background)
            .inner_margin(4.0)
            .show(ui, |ui| {
                egui::ScrollArea::both()
                    .id_source(("log_view", run.id().0))
                    .auto_shrink([false, false])
                    .stick_to_bottom(self.settings.auto_scroll)
                    .show_rows(ui, row_height, lines.len(), |ui, range| {
                        for line in &lines[range] {
                            let text = if timestamps {
                                line.with_timestamp()
                            } else {
                                line.text.clone()
                            };
                            let color = theme.line_color(line.kind, line.stream);
                            let selected = selected_line == Some(line.text.as_str());
                            let response = ui.add(egui::SelectableLabel::new(
                                selected,
                                RichText::new(text).monospace().color(color),
                            ));

                            if response.clicked() {
                                action = Some(LogAction::Select(line.text.clone()));
                            }
                            response.context_menu(|ui| {
                                if let Some(chosen) = line_context_menu(ui, &line.text, &field_labels) {
                                    action = Some(chosen);
                                }
                            });
                        }
                    });
            });

        match action {
            Some(LogAction::Select(text)) => self.state.selected_line = Some(text),
            Some(LogAction::Paste { field, text }) => {
                self.state.selected_line = Some(text.clone());
                self.paste_into_field(field, &text);
            }
            Some(LogAction::Copy(text)) => {
                ui.output_mut(|o| o.copied_text = text);
                self.toast_manager.info("Line copied");
            }
            None => {}
        }
    }
}

fn line_context_menu(ui: &mut egui::Ui, text: &str, field_labels: &[String]) -> Option<LogAction> {
    let mut action = None;

    ui.menu_button("Paste into field", |ui| {
        if field_labels.is_empty() {
            ui.label(RichText::new("This script takes no parameters").italics());
        }
        for (index, label) in field_labels.iter().enumerate() {
            if ui.button(label.as_str()).clicked() {
                action = Some(LogAction::Paste {
                    field: Some(index),
                    text: text.to_string(),
                });
                ui.close_menu();
            }
        }
    });

    let tokens = line_tokens(text);
    if !tokens.is_empty() {
        ui.menu_button("Paste word", |ui| {
            for token in tokens {
                if ui.button(token.as_str()).clicked() {
                    action = Some(LogAction::Paste { field: None, text: token });
                    ui.close_menu();
                }
            }
        });
    }

    ui.separator();
    if ui.button("📋 Copy line").clicked() {
        action = Some(LogAction::Copy(text.to_string()));
        ui.close_menu();
    }

    action
}

/// Distinct words of a log line with surrounding punctuation removed, in
/// order of appearance
pub(super) fn line_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for raw in text.split_whitespace() {
        let token = raw.trim_matches(|c: char| {
            matches!(c, ',' | ';' | ':' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'' | '<' | '>')
        });
        if token.is_empty() || tokens.iter().any(|t| t == token) {
            continue;
        }
        tokens.push(token.to_string());
        if tokens.len() == MAX_TOKENS {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_tokens_strip_punctuation() {
        assert_eq!(
            line_tokens("User: 'alice' (id=42), result [12]"),
            vec!["User", "alice", "id=42", "result", "12"]
        );
    }

    #[test]
    fn test_line_tokens_deduplicate() {
        assert_eq!(line_tokens("a a b a"), vec!["a", "b"]);
        assert!(line_tokens("  ,, ;; ").is_empty());
    }

    #[test]
    fn test_line_tokens_are_bounded() {
        let line = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        assert_eq!(line_tokens(&line).len(), MAX_TOKENS);
    }
}
