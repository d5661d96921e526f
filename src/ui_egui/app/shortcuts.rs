use super::RunnerApp;

#[derive(Debug, Default)]
struct ShortcutPresses {
    run: bool,
    stop: bool,
    restart: bool,
    clear_log: bool,
    find: bool,
    escape: bool,
}

impl RunnerApp {
    pub(super) fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        // Read first, act after: actions may need the context again
        let pressed = ctx.input(|i| ShortcutPresses {
            run: i.modifiers.ctrl && i.key_pressed(egui::Key::Enter),
            stop: i.modifiers.ctrl && i.key_pressed(egui::Key::Period),
            restart: i.modifiers.ctrl && i.key_pressed(egui::Key::R),
            clear_log: i.modifiers.ctrl && i.key_pressed(egui::Key::L),
            find: i.modifiers.ctrl && i.key_pressed(egui::Key::F),
            escape: i.key_pressed(egui::Key::Escape),
        });

        // The confirm dialog handles its own keys
        if self.confirm_dialog.is_open() {
            return;
        }

        if pressed.escape {
            if self.state.show_about_dialog {
                self.state.show_about_dialog = false;
            } else if self.state.selected_line.is_some() {
                self.state.selected_line = None;
            }
        }

        if pressed.run {
            self.start_run();
        }
        if pressed.stop {
            self.cancel_viewed_run();
        }
        if pressed.restart {
            self.restart_viewed_run();
        }
        if pressed.clear_log {
            self.clear_log();
        }
        if pressed.find {
            self.state.focus_filter_requested = true;
        }
    }
}
