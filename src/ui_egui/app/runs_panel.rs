use egui::{Align, Layout, RichText};
use egui_extras::{Column, TableBuilder};

use super::confirm::ConfirmAction;
use super::state::BottomTab;
use super::RunnerApp;
use crate::models::run::RunId;

const ROW_HEIGHT: f32 = 22.0;
const TIME_FORMAT: &str = "%H:%M:%S";
const HISTORY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

enum RunsAction {
    View(RunId),
    Stop(RunId),
    Restart(RunId),
    Rerun(i64),
    DeleteHistory(i64),
    RefreshHistory,
    ClearHistory,
}

impl RunnerApp {
    /// Bottom panel listing the session's runs and the stored history
    pub(super) fn render_runs_panel(&mut self, ctx: &egui::Context) {
        let mut action = None;

        egui::TopBottomPanel::bottom("runs_panel")
            .resizable(true)
            .default_height(180.0)
            .min_height(90.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let runs_label = format!("Runs ({})", self.runs.runs().len());
                    ui.selectable_value(&mut self.state.bottom_tab, BottomTab::Runs, runs_label);
                    ui.selectable_value(&mut self.state.bottom_tab, BottomTab::History, "History");

                    if self.state.bottom_tab == BottomTab::History {
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            if ui.button("Clear History...").clicked() {
                                action = Some(RunsAction::ClearHistory);
                            }
                            if ui.button("🔄 Refresh").clicked() {
                                action = Some(RunsAction::RefreshHistory);
                            }
                        });
                    }
                });
                ui.separator();

                let chosen = match self.state.bottom_tab {
                    BottomTab::Runs => ui.push_id("runs_table", |ui| self.render_runs_table(ui)).inner,
                    BottomTab::History => {
                        ui.push_id("history_table", |ui| self.render_history_table(ui)).inner
                    }
                };
                if chosen.is_some() {
                    action = chosen;
                }
            });

        match action {
            Some(RunsAction::View(id)) => {
                self.state.selected_run = Some(id);
                self.state.selected_line = None;
            }
            Some(RunsAction::Stop(id)) => self.cancel_run(id),
            Some(RunsAction::Restart(id)) => self.restart_run(id),
            Some(RunsAction::Rerun(history_id)) => {
                self.rerun_history(history_id);
                self.state.bottom_tab = BottomTab::Runs;
            }
            Some(RunsAction::DeleteHistory(history_id)) => {
                if let Err(e) = self.context.history_service().delete(history_id) {
                    log::error!("Failed to delete history entry {}: {}", history_id, e);
                    self.toast_manager.error(format!("Failed to delete entry: {}", e));
                }
                self.refresh_history();
            }
            Some(RunsAction::RefreshHistory) => self.refresh_history(),
            Some(RunsAction::ClearHistory) => {
                self.confirm_dialog.request(ConfirmAction::ClearHistory)
            }
            None => {}
        }
    }

    fn render_runs_table(&self, ui: &mut egui::Ui) -> Option<RunsAction> {
        if self.runs.runs().is_empty() {
            ui.label(RichText::new("No runs yet. Press ▶ Run to start one.").italics());
            return None;
        }

        let viewed = self.viewed_run_id();
        let mut action = None;

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .sense(egui::Sense::click())
            .cell_layout(Layout::left_to_right(Align::Center))
            .column(Column::exact(44.0))
            .column(Column::initial(160.0).at_least(80.0))
            .column(Column::initial(190.0).at_least(90.0))
            .column(Column::initial(70.0))
            .column(Column::initial(70.0))
            .column(Column::remainder().at_least(120.0))
            .header(20.0, |mut header| {
                for title in ["Run", "Script", "Status", "Started", "Lines", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for run in self.runs.runs().iter().rev() {
                    let id = run.id();
                    body.row(ROW_HEIGHT, |mut row| {
                        row.set_selected(viewed == Some(id));
                        row.col(|ui| {
                            ui.label(id.to_string());
                        });
                        row.col(|ui| {
                            ui.label(run.script_name());
                        });
                        row.col(|ui| {
                            let status = run.status();
                            let color = if status.is_success() || status.is_active() {
                                self.active_theme.text_primary
                            } else {
                                self.active_theme.log_error
                            };
                            ui.label(RichText::new(run.status_text()).color(color));
                        });
                        row.col(|ui| {
                            let started = run
                                .started_at()
                                .map(|t| t.format(TIME_FORMAT).to_string())
                                .unwrap_or_else(|| "-".to_string());
                            ui.label(started);
                        });
                        row.col(|ui| {
                            ui.label(run.log().total_lines().to_string());
                        });
                        row.col(|ui| {
                            if ui.small_button("👁 View").clicked() {
                                action = Some(RunsAction::View(id));
                            }
                            if run.status().is_active() {
                                if ui
                                    .add_enabled(!run.is_cancelling(), egui::Button::new("⏹ Stop").small())
                                    .clicked()
                                {
                                    action = Some(RunsAction::Stop(id));
                                }
                            } else if ui.small_button("🔁 Restart").clicked() {
                                action = Some(RunsAction::Restart(id));
                            }
                        });

                        if action.is_none() && row.response().clicked() {
                            action = Some(RunsAction::View(id));
                        }
                    });
                }
            });

        action
    }

    fn render_history_table(&self, ui: &mut egui::Ui) -> Option<RunsAction> {
        if self.state.history.is_empty() {
            ui.label(RichText::new("No runs recorded yet.").italics());
            return None;
        }

        let mut action = None;

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .column(Column::initial(130.0))
            .column(Column::initial(160.0).at_least(80.0))
            .column(Column::initial(170.0).at_least(90.0))
            .column(Column::initial(70.0))
            .column(Column::initial(90.0))
            .column(Column::remainder().at_least(120.0))
            .header(20.0, |mut header| {
                for title in ["Started", "Script", "Status", "Duration", "Lines", ""] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for entry in &self.state.history {
                    let Some(history_id) = entry.id else {
                        continue;
                    };
                    body.row(ROW_HEIGHT, |mut row| {
                        row.col(|ui| {
                            ui.label(entry.started_at.format(HISTORY_TIME_FORMAT).to_string());
                        });
                        row.col(|ui| {
                            ui.label(entry.script_name.as_str())
                                .on_hover_text(entry.argv.join(" "));
                        });
                        row.col(|ui| {
                            let status = entry.run_status();
                            let label = ui.label(status.label());
                            if let Some(message) = entry.message.as_deref() {
                                label.on_hover_text(message);
                            }
                        });
                        row.col(|ui| {
                            ui.label(format_duration(entry.duration_secs()));
                        });
                        row.col(|ui| {
                            ui.label(format!("{} / {}", entry.output_lines, entry.error_lines))
                                .on_hover_text("Output lines / error lines");
                        });
                        row.col(|ui| {
                            if ui.small_button("▶ Re-run").clicked() {
                                action = Some(RunsAction::Rerun(history_id));
                            }
                            if ui.small_button("🗑").on_hover_text("Delete entry").clicked() {
                                action = Some(RunsAction::DeleteHistory(history_id));
                            }
                        });
                    });
                }
            });

        action
    }
}

/// `1m 05s` style duration, `-` while unknown
pub(super) fn format_duration(secs: Option<i64>) -> String {
    match secs {
        None => "-".to_string(),
        Some(s) if s < 60 => format!("{}s", s.max(0)),
        Some(s) if s < 3600 => format!("{}m {:02}s", s / 60, s % 60),
        Some(s) => format!("{}h {:02}m", s / 3600, (s % 3600) / 60),
    }
}
