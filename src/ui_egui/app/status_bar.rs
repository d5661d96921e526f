//! Status bar: the last status message on the left, run counts and
//! shortcut hints on the right.

use egui::{Color32, RichText};

use super::RunnerApp;

fn secondary_text_color(is_dark: bool) -> Color32 {
    if is_dark {
        Color32::from_gray(160)
    } else {
        Color32::from_gray(100)
    }
}

/// "2 running, 1 queued" or "Idle"
pub(super) fn run_counts_text(running: usize, queued: usize) -> String {
    match (running, queued) {
        (0, 0) => "Idle".to_string(),
        (r, 0) => format!("{} running", r),
        (0, q) => format!("{} queued", q),
        (r, q) => format!("{} running, {} queued", r, q),
    }
}

impl RunnerApp {
    pub(super) fn render_status_bar(&mut self, ctx: &egui::Context) {
        let secondary = secondary_text_color(self.active_theme.is_dark);
        let running = self.runs.running_count();
        let queued = self.runs.active_count() - running;

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(RichText::new(&self.state.status).small());

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let hint = if running + queued > 0 {
                            "Ctrl+. stop  ·  Ctrl+R restart"
                        } else {
                            "Ctrl+Enter run  ·  Ctrl+F filter"
                        };
                        ui.label(RichText::new(hint).small().color(secondary));
                        ui.separator();
                        ui.label(
                            RichText::new(format!(
                                "{}  ·  max {} parallel",
                                run_counts_text(running, queued),
                                self.runs.max_parallel()
                            ))
                            .small()
                            .color(secondary),
                        );
                    });
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, "Idle")]
    #[test_case(2, 0, "2 running")]
    #[test_case(0, 3, "3 queued")]
    #[test_case(2, 1, "2 running, 1 queued")]
    fn test_run_counts_text(running: usize, queued: usize, expected: &str) {
        assert_eq!(run_counts_text(running, queued), expected);
    }
}
