use egui::Context;

use super::confirm::ConfirmAction;
use super::RunnerApp;
use crate::models::settings::{default_interpreter, MAX_PARALLEL_RUNS};

impl RunnerApp {
    pub(super) fn render_menu_bar(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                self.render_file_menu(ui, ctx);
                self.render_run_menu(ui);
                self.render_view_menu(ui, ctx);
                self.render_help_menu(ui);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button(self.active_theme.toggle_icon())
                        .on_hover_text("Switch theme")
                        .clicked()
                    {
                        self.toggle_theme(ctx);
                    }
                });
            });
        });
    }

    fn render_file_menu(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        ui.menu_button("File", |ui| {
            if ui.button("📂 Open Catalog...").clicked() {
                self.open_catalog_dialog();
                ui.close_menu();
            }
            if ui.button("🔄 Reload Catalog").clicked() {
                self.reload_catalog();
                ui.close_menu();
            }
            if ui.button("🔍 Scan Folder for Scripts...").clicked() {
                self.scan_folder_dialog();
                ui.close_menu();
            }

            ui.separator();

            let has_run = self.viewed_run().is_some();
            if ui
                .add_enabled(has_run, egui::Button::new("💾 Save Transcript..."))
                .clicked()
            {
                self.save_transcript_dialog();
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Exit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                ui.close_menu();
            }
        });
    }

    fn render_run_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Run", |ui| {
            let viewed_active = self
                .viewed_run()
                .map(|r| r.status().is_active())
                .unwrap_or(false);
            let has_run = self.viewed_run().is_some();

            if ui.button("▶ Run    Ctrl+Enter").clicked() {
                self.start_run();
                ui.close_menu();
            }
            if ui
                .add_enabled(viewed_active, egui::Button::new("⏹ Stop    Ctrl+."))
                .clicked()
            {
                self.cancel_viewed_run();
                ui.close_menu();
            }
            if ui
                .add_enabled(has_run, egui::Button::new("🔁 Restart    Ctrl+R"))
                .clicked()
            {
                self.restart_viewed_run();
                ui.close_menu();
            }
            if ui
                .add_enabled(self.runs.active_count() > 0, egui::Button::new("Stop All"))
                .clicked()
            {
                self.stop_all();
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Clear Finished Runs").clicked() {
                self.clear_finished_runs();
                ui.close_menu();
            }
            if ui.button("Clear Log    Ctrl+L").clicked() {
                self.clear_log();
                ui.close_menu();
            }
            if ui.button("🧹 Clear All").clicked() {
                self.request_clear_all();
                ui.close_menu();
            }
            if ui.button("Clear History...").clicked() {
                self.confirm_dialog.request(ConfirmAction::ClearHistory);
                ui.close_menu();
            }
        });
    }

    fn render_view_menu(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        ui.menu_button("View", |ui| {
            let mut changed = false;

            if ui
                .checkbox(&mut self.settings.use_system_theme, "Follow System Theme")
                .changed()
            {
                self.apply_theme(ctx);
                changed = true;
            }
            changed |= ui
                .checkbox(&mut self.settings.show_timestamps, "Show Timestamps")
                .changed();
            changed |= ui
                .checkbox(&mut self.settings.auto_scroll, "Auto Scroll")
                .changed();

            ui.separator();

            if ui
                .checkbox(&mut self.settings.notifications_enabled, "Desktop Notifications")
                .changed()
            {
                let enabled = self.settings.notifications_enabled;
                self.context.notification_service_mut().set_enabled(enabled);
                changed = true;
            }
            changed |= ui
                .checkbox(&mut self.settings.append_mode_flag, "Append --mode gui")
                .on_hover_text("Tell scripts they run under the GUI")
                .changed();

            ui.horizontal(|ui| {
                ui.label("Parallel runs:");
                if ui
                    .add(
                        egui::DragValue::new(&mut self.settings.max_parallel_runs)
                            .range(1..=MAX_PARALLEL_RUNS),
                    )
                    .changed()
                {
                    self.runs
                        .set_max_parallel(self.settings.max_parallel_runs as usize);
                    changed = true;
                }
            });

            ui.horizontal(|ui| {
                ui.label("Interpreter:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.settings.interpreter)
                        .desired_width(120.0),
                );
                if response.lost_focus() {
                    if self.settings.interpreter.trim().is_empty() {
                        self.settings.interpreter = default_interpreter().to_string();
                    }
                    changed = true;
                }
            });

            if changed {
                self.persist_settings();
            }
        });
    }
}
