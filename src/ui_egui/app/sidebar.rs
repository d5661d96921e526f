use egui::{RichText, Stroke};

use super::{display_name, RunnerApp};
use crate::models::script::MainPathMode;

impl RunnerApp {
    pub(super) fn render_sidebar(&mut self, ctx: &egui::Context) {
        let dragging_files = ctx.input(|i| !i.raw.hovered_files.is_empty());

        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(260.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.render_main_path_selector(ui, dragging_files);
                ui.add_space(8.0);
                ui.separator();
                self.render_script_list(ui, dragging_files);
                ui.separator();
                self.render_run_controls(ui);
                ui.add_space(6.0);
            });
    }

    fn render_main_path_selector(&mut self, ui: &mut egui::Ui, dragging_files: bool) {
        ui.strong("Main Path");

        let accent = self.active_theme.accent;
        let frame = egui::Frame::group(ui.style()).stroke(if dragging_files {
            Stroke::new(2.0, accent)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        });

        frame.show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let mut mode = self.settings.main_path_mode;
                egui::ComboBox::from_id_source("main_path_mode")
                    .width(80.0)
                    .selected_text(mode.as_str())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut mode, MainPathMode::File, "File");
                        ui.selectable_value(&mut mode, MainPathMode::Folder, "Folder");
                    });
                if mode != self.settings.main_path_mode {
                    self.set_main_path_mode(mode);
                }

                if ui.button("Browse...").clicked() {
                    self.browse_main_path();
                }
            });

            let label = display_name(self.state.main_path.trim());
            let response = ui.label(RichText::new(label).monospace());
            if !self.state.main_path.is_empty() {
                response.on_hover_text(self.state.main_path.as_str());
            }
            if dragging_files {
                ui.label(RichText::new("Drop here to set the main path").small().color(accent));
            }
        });
    }

    fn render_script_list(&mut self, ui: &mut egui::Ui, dragging_files: bool) {
        ui.horizontal(|ui| {
            ui.strong("Scripts");
            ui.label(RichText::new(format!("({})", self.catalog.len())).small());
        });

        let mut clicked = None;
        let list_height = (ui.available_height() - 80.0).max(80.0);
        let response = egui::ScrollArea::vertical()
            .id_source("script_list")
            .max_height(list_height)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if self.catalog.is_empty() {
                    ui.label(RichText::new("No scripts. Use File → Scan Folder...").italics());
                }
                for (index, script) in self.catalog.scripts().iter().enumerate() {
                    ui.horizontal(|ui| {
                        let selected = self.state.selected_script == Some(index);
                        if ui.selectable_label(selected, script.name.as_str()).clicked() {
                            clicked = Some(index);
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.small_button("❓").on_hover_text(script.clue_or_default());
                        });
                    });
                }
            });

        let rect = response.inner_rect;
        self.state.script_list_rect = Some(rect);
        if dragging_files {
            ui.painter().rect_stroke(
                rect,
                4.0,
                Stroke::new(1.0, self.active_theme.accent.gamma_multiply(0.5)),
            );
        }

        if let Some(index) = clicked {
            self.select_script(index);
        }
    }

    fn render_run_controls(&mut self, ui: &mut egui::Ui) {
        let viewed_active = self
            .viewed_run()
            .map(|r| r.status().is_active())
            .unwrap_or(false);
        let has_script = self.state.selected_script.is_some();

        ui.horizontal(|ui| {
            let run = egui::Button::new(RichText::new("▶ Run").strong())
                .min_size(egui::vec2(80.0, 28.0));
            if ui
                .add_enabled(has_script, run)
                .on_hover_text("Ctrl+Enter")
                .clicked()
            {
                self.start_run();
            }

            let cancel = egui::Button::new("⏹ Cancel").min_size(egui::vec2(80.0, 28.0));
            if ui
                .add_enabled(viewed_active, cancel)
                .on_hover_text("Ctrl+.")
                .clicked()
            {
                self.cancel_viewed_run();
            }
        });

        if ui.button("🧹 Clear All").clicked() {
            self.request_clear_all();
        }
    }
}
