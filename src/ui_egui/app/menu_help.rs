use egui::Context;

use super::RunnerApp;

/// Help menu and About dialog.
impl RunnerApp {
    pub(super) fn render_help_menu(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Help", |ui| {
            if ui.button("ℹ About...").clicked() {
                self.state.show_about_dialog = true;
                ui.close_menu();
            }
        });
    }

    pub(super) fn render_about_dialog(&mut self, ctx: &Context) {
        if !self.state.show_about_dialog {
            return;
        }

        let mut dialog_open = true;
        egui::Window::new("About Script Runner")
            .open(&mut dialog_open)
            .collapsible(false)
            .resizable(false)
            .auto_sized()
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.set_max_width(420.0);

                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(15.0, 10.0))
                    .show(ui, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.heading("🐍 Script Runner");
                            ui.add_space(5.0);
                            ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                            ui.add_space(10.0);
                            ui.separator();
                            ui.add_space(10.0);
                            ui.label(env!("CARGO_PKG_DESCRIPTION"));
                            ui.add_space(10.0);
                            ui.label(format!("Author: {}", env!("CARGO_PKG_AUTHORS")));
                            ui.add_space(5.0);
                            ui.label(format!("License: {}", env!("CARGO_PKG_LICENSE")));
                            ui.add_space(10.0);
                            ui.separator();
                            ui.add_space(10.0);
                        });

                        egui::Grid::new("about_paths")
                            .num_columns(2)
                            .spacing([20.0, 4.0])
                            .show(ui, |ui| {
                                ui.label("Catalog:");
                                ui.label(self.catalog_path.display().to_string());
                                ui.end_row();

                                ui.label("Scripts:");
                                ui.label(self.catalog.len().to_string());
                                ui.end_row();

                                ui.label("Database:");
                                ui.label(self.context.database().path());
                                ui.end_row();

                                ui.label("Interpreter:");
                                ui.label(self.settings.interpreter.as_str());
                                ui.end_row();

                                ui.label("OS:");
                                ui.label(format!(
                                    "{} ({})",
                                    std::env::consts::OS,
                                    std::env::consts::ARCH
                                ));
                                ui.end_row();
                            });

                        ui.add_space(5.0);
                    });
            });

        if !dialog_open {
            self.state.show_about_dialog = false;
        }
    }
}
