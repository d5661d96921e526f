mod confirm;
mod context;
mod form_panel;
mod imports;
mod lifecycle;
mod log_panel;
mod menu;
mod menu_help;
mod notifications;
mod runs_panel;
mod shortcuts;
mod sidebar;
mod state;
mod status_bar;
mod toast;

use std::path::{Path, PathBuf};

use self::confirm::{ConfirmAction, ConfirmDialogState};
use self::context::AppContext;
use self::state::AppState;
use self::toast::ToastManager;
use crate::models::form::ParameterForm;
use crate::models::run::RunId;
use crate::models::script::{MainPathMode, ScriptDefinition};
use crate::models::settings::Settings;
use crate::models::template::ArgumentTemplate;
use crate::services::catalog::ScriptCatalog;
use crate::services::command::{
    prepare_run, resolve_interpreter, split_custom_args, CommandBuilder, CommandLine, RunCheck,
    RunRequest,
};
use crate::services::runner::{Run, RunManager};
use crate::ui_egui::theme::RunnerTheme;

/// Shown in the command preview while no main path is chosen
const MAIN_PATH_PLACEHOLDER: &str = "<main path>";
/// Label of the main path selector when nothing is chosen
pub(crate) const NO_MAIN_PATH_LABEL: &str = "No file Selected";

pub struct RunnerApp {
    /// Shared access to the leaked database and desktop services
    context: AppContext,
    settings: Settings,
    catalog: ScriptCatalog,
    /// Where the catalog is loaded from and saved to
    catalog_path: PathBuf,
    runs: RunManager,
    /// Parameters of the selected script
    form: ParameterForm,
    active_theme: RunnerTheme,
    state: AppState,
    toast_manager: ToastManager,
    confirm_dialog: ConfirmDialogState,
}

impl eframe::App for RunnerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.handle_update(ctx, frame);
    }

    fn on_exit(&mut self, gl: Option<&eframe::glow::Context>) {
        self.handle_exit(gl);
    }
}

impl RunnerApp {
    fn selected_script(&self) -> Option<&ScriptDefinition> {
        self.state.selected_script.and_then(|i| self.catalog.get(i))
    }

    /// The run shown in the log pane
    fn viewed_run(&self) -> Option<&Run> {
        self.state
            .selected_run
            .and_then(|id| self.runs.get(id))
            .or_else(|| self.runs.latest())
    }

    fn viewed_run_id(&self) -> Option<RunId> {
        self.viewed_run().map(Run::id)
    }

    pub(super) fn select_script(&mut self, index: usize) {
        if self.state.selected_script == Some(index) {
            return;
        }
        let Some(script) = self.catalog.get(index) else {
            return;
        };

        let name = script.name.clone();
        self.form.build(&script.args_schema);
        self.state.selected_script = Some(index);
        self.state.focused_field = None;
        self.state.selected_template = None;
        self.state.template_name.clear();
        self.state.status = format!("Selected: {}", name);
        self.refresh_templates();
        log::debug!("Selected script {}", name);
    }

    /// Forget the selection, e.g. after the catalog was replaced
    fn reset_script_selection(&mut self, keep_name: Option<&str>) {
        self.state.selected_script = None;
        self.form.clear();
        self.state.templates.clear();
        self.state.selected_template = None;
        if let Some(index) = keep_name.and_then(|name| self.catalog.position(name)) {
            self.select_script(index);
        }
    }

    /// Command the current inputs would run. Unlike `check_run` this does not
    /// validate, so the preview updates while the form is still incomplete.
    pub(super) fn preview_command(&self) -> Option<CommandLine> {
        let script = self.selected_script()?;
        let main_path = match self.state.main_path.trim() {
            "" => MAIN_PATH_PLACEHOLDER,
            path => path,
        };
        let custom = split_custom_args(&self.state.custom_args).unwrap_or_default();

        Some(
            CommandBuilder::new(resolve_interpreter(script, &self.settings.interpreter))
                .main_path(main_path, script.log_arg_style.clone())
                .form_args(self.form.cli_args())
                .extra_args(script.extra_args.clone())
                .extra_args(custom)
                .mode_flag(self.settings.append_mode_flag)
                .working_dir(script.working_dir.clone())
                .build(&self.catalog.resolve_path(script)),
        )
    }

    fn check_run(&self) -> RunCheck {
        let script = self.selected_script();
        let script_path = script.map(|s| self.catalog.resolve_path(s));
        prepare_run(&RunRequest {
            script,
            script_path: script_path.as_deref(),
            main_path: &self.state.main_path,
            form: &self.form,
            custom_args: &self.state.custom_args,
            interpreter: &self.settings.interpreter,
            append_mode_flag: self.settings.append_mode_flag,
        })
    }

    /// Validate the inputs and start a run, asking first when the script file
    /// is missing
    pub(super) fn start_run(&mut self) {
        let check = self.check_run();
        if !check.errors.is_empty() {
            log::info!("Run rejected: {}", check.error_text());
            self.toast_manager.warning(check.error_text());
            return;
        }
        let Some(command) = check.command else {
            return;
        };
        let script_name = self
            .selected_script()
            .map(|s| s.name.clone())
            .unwrap_or_default();

        if let Some(message) = check.warnings.into_iter().next() {
            self.confirm_dialog.request(ConfirmAction::RunMissingScript {
                script_name,
                message,
                command,
            });
            return;
        }

        let main_path = Some(self.state.main_path.trim().to_string());
        self.submit_run(script_name, command, main_path);
    }

    fn submit_run(&mut self, script_name: String, command: CommandLine, main_path: Option<String>) {
        let main_path = main_path.filter(|p| !p.trim().is_empty());
        let id = self.runs.submit(script_name, command, main_path);
        self.state.selected_run = Some(id);
        self.state.selected_line = None;
        self.state.status = match self.runs.get(id) {
            Some(run) => run.status_text(),
            None => "Running...".to_string(),
        };
    }

    pub(super) fn cancel_run(&mut self, id: RunId) {
        match self.runs.cancel(id) {
            Ok(true) => log::info!("Cancel requested for run {}", id),
            Ok(false) => {}
            Err(e) => {
                log::error!("Failed to cancel run {}: {}", id, e);
                self.toast_manager.error(e.to_string());
            }
        }
    }

    pub(super) fn cancel_viewed_run(&mut self) {
        if let Some(id) = self.viewed_run().filter(|r| r.status().is_active()).map(Run::id) {
            self.cancel_run(id);
        }
    }

    pub(super) fn restart_run(&mut self, id: RunId) {
        match self.runs.restart(id) {
            Some(new_id) => {
                self.state.selected_run = Some(new_id);
                self.state.selected_line = None;
                self.toast_manager.info(format!("Restarted run {} as {}", id, new_id));
            }
            None => log::warn!("Run {} no longer exists", id),
        }
    }

    pub(super) fn restart_viewed_run(&mut self) {
        if let Some(id) = self.viewed_run_id() {
            self.restart_run(id);
        }
    }

    pub(super) fn stop_all(&mut self) {
        let stopped = self.runs.cancel_all();
        if stopped > 0 {
            self.toast_manager.info(format!("Stopping {} runs", stopped));
        }
    }

    pub(super) fn clear_finished_runs(&mut self) {
        let removed = self.runs.clear_finished();
        if self.state.selected_run.and_then(|id| self.runs.get(id)).is_none() {
            self.state.selected_run = None;
            self.state.selected_line = None;
        }
        log::debug!("Removed {} finished runs", removed);
    }

    pub(super) fn clear_log(&mut self) {
        if let Some(id) = self.viewed_run_id() {
            self.runs.clear_log(id);
        }
        self.state.selected_line = None;
    }

    /// Clear everything, asking first when something is still running
    pub(super) fn request_clear_all(&mut self) {
        if self.runs.active_count() > 0 {
            self.confirm_dialog.request(ConfirmAction::ClearAll);
        } else {
            self.clear_all();
        }
    }

    fn clear_all(&mut self) {
        self.runs.cancel_all();
        self.runs.clear_finished();
        let remaining: Vec<RunId> = self.runs.runs().iter().map(Run::id).collect();
        for id in remaining {
            self.runs.clear_log(id);
        }

        self.state.selected_run = None;
        self.state.selected_line = None;
        self.state.custom_args.clear();
        self.state.filter = Default::default();
        self.set_main_path(String::new());

        let schema = self.selected_script().map(|s| s.args_schema.clone());
        match schema {
            Some(schema) => self.form.build(&schema),
            None => self.form.clear(),
        }
        self.state.focused_field = None;
        self.state.status = "Ready".to_string();
    }

    pub(super) fn set_main_path(&mut self, path: String) {
        self.state.main_path = path;
        let stored = Some(self.state.main_path.trim().to_string()).filter(|p| !p.is_empty());
        if self.settings.last_main_path != stored {
            self.settings.last_main_path = stored;
            self.persist_settings();
        }
    }

    /// Switching between file and folder clears the chosen path
    pub(super) fn set_main_path_mode(&mut self, mode: MainPathMode) {
        if self.settings.main_path_mode == mode {
            return;
        }
        self.settings.main_path_mode = mode;
        self.state.main_path.clear();
        self.settings.last_main_path = None;
        self.persist_settings();
    }

    /// Paste text into a form field: the given one, the focused one or the
    /// form's fallback field
    pub(super) fn paste_into_field(&mut self, target: Option<usize>, text: &str) {
        let target = target.or(self.state.focused_field);
        match self.form.paste(target, text) {
            Ok(index) => {
                self.state.focused_field = Some(index);
                self.state.status = "Pasted from Log".to_string();
            }
            Err(e) => self.toast_manager.warning(e.to_string()),
        }
    }

    /// Paste the selected log line
    pub(super) fn paste_selected_line(&mut self) {
        let text = self.state.selected_line.clone().unwrap_or_default();
        self.paste_into_field(None, &text);
    }

    pub(super) fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.settings.theme = if self.active_theme.is_dark {
            "light".to_string()
        } else {
            "dark".to_string()
        };
        self.settings.use_system_theme = false;
        self.apply_theme(ctx);
        self.persist_settings();
    }

    pub(super) fn persist_settings(&mut self) {
        if let Err(e) = self.context.settings_service().update(&self.settings) {
            log::error!("Failed to save settings: {}", e);
            self.toast_manager.error(format!("Failed to save settings: {}", e));
        }
    }

    pub(super) fn refresh_history(&mut self) {
        let limit = self.settings.history_limit as usize;
        match self.context.history_service().list_recent(limit) {
            Ok(entries) => self.state.history = entries,
            Err(e) => log::error!("Failed to load history: {}", e),
        }
    }

    /// Run a history entry's stored command again
    pub(super) fn rerun_history(&mut self, history_id: i64) {
        let Some(entry) = self.state.history.iter().find(|e| e.id == Some(history_id)) else {
            return;
        };
        let Some(mut command) = CommandLine::from_argv(&entry.argv) else {
            self.toast_manager.warning("This history entry has no command");
            return;
        };
        command.working_dir = self
            .catalog
            .find(&entry.script_name)
            .and_then(|s| s.working_dir.clone());

        let script_name = entry.script_name.clone();
        let main_path = entry.main_path.clone();
        self.submit_run(script_name, command, main_path);
    }

    pub(super) fn refresh_templates(&mut self) {
        let Some(script_name) = self.selected_script().map(|s| s.name.clone()) else {
            self.state.templates.clear();
            return;
        };
        match self.context.template_service().list_for_script(&script_name) {
            Ok(templates) => self.state.templates = templates,
            Err(e) => {
                log::error!("Failed to load templates: {}", e);
                self.state.templates.clear();
            }
        }
    }

    pub(super) fn apply_template(&mut self, id: i64) {
        let Some(template) = self.state.templates.iter().find(|t| t.id == Some(id)).cloned() else {
            return;
        };

        let applied = self.form.apply_snapshot(&template.values);
        self.state.custom_args = template.extra_args.clone();
        if let Some(main_path) = template.main_path.clone() {
            self.set_main_path(main_path);
        }
        self.state.selected_template = Some(id);
        self.state.template_name = template.name.clone();
        self.toast_manager.success(format!(
            "Applied \"{}\" ({} fields)",
            template.name, applied
        ));
    }

    /// Save the current inputs under the typed name, replacing a template of
    /// the same name
    pub(super) fn save_template(&mut self) {
        let name = self.state.template_name.trim().to_string();
        if name.is_empty() {
            self.toast_manager.warning("Enter a template name first.");
            return;
        }
        let Some(script_name) = self.selected_script().map(|s| s.name.clone()) else {
            self.toast_manager.warning("Please select a script.");
            return;
        };

        let mut builder = ArgumentTemplate::builder()
            .name(name.as_str())
            .script_name(script_name)
            .values(self.form.values_snapshot())
            .extra_args(self.state.custom_args.trim());
        if !self.state.main_path.trim().is_empty() {
            builder = builder.main_path(self.state.main_path.trim());
        }
        let mut template = match builder.build() {
            Ok(template) => template,
            Err(e) => {
                self.toast_manager.error(e);
                return;
            }
        };

        let existing = self.state.templates.iter().find(|t| t.name == name).and_then(|t| t.id);
        let service = self.context.template_service();
        let result = match existing {
            Some(id) => {
                template.id = Some(id);
                service.update(&template).map(|_| id)
            }
            None => service.create(template).and_then(|t| {
                t.id.ok_or_else(|| anyhow::anyhow!("Template was saved without an id"))
            }),
        };

        match result {
            Ok(id) => {
                self.refresh_templates();
                self.state.selected_template = Some(id);
                self.toast_manager.success(format!("Saved template \"{}\"", name));
            }
            Err(e) => {
                log::error!("Failed to save template: {}", e);
                self.toast_manager.error(format!("Failed to save template: {}", e));
            }
        }
    }

    pub(super) fn request_delete_template(&mut self) {
        let Some(template) = self
            .state
            .selected_template
            .and_then(|id| self.state.templates.iter().find(|t| t.id == Some(id)))
        else {
            return;
        };
        if let Some(id) = template.id {
            self.confirm_dialog.request(ConfirmAction::DeleteTemplate {
                template_id: id,
                template_name: template.name.clone(),
            });
        }
    }
}

/// Where a path dropped on the main path selector ends up: folder mode takes
/// a directory itself or a file's parent directory
pub(crate) fn resolve_dropped_main_path(path: &Path, mode: MainPathMode) -> PathBuf {
    match mode {
        MainPathMode::File => path.to_path_buf(),
        MainPathMode::Folder if path.is_dir() => path.to_path_buf(),
        MainPathMode::Folder => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// Last component of a path, for labels and status messages
pub(crate) fn display_name(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match Path::new(trimmed).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None if path.is_empty() => NO_MAIN_PATH_LABEL.to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_mode_keeps_dropped_path() {
        let path = Path::new("/var/log/app.log");
        assert_eq!(resolve_dropped_main_path(path, MainPathMode::File), path);
    }

    #[test]
    fn test_folder_mode_uses_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("run.log");
        std::fs::write(&file, "x").unwrap();

        assert_eq!(
            resolve_dropped_main_path(&file, MainPathMode::Folder),
            dir.path()
        );
        assert_eq!(
            resolve_dropped_main_path(dir.path(), MainPathMode::Folder),
            dir.path()
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("/var/log/app.log"), "app.log");
        assert_eq!(display_name("/var/log/"), "log");
        assert_eq!(display_name(""), NO_MAIN_PATH_LABEL);
        assert_eq!(display_name("/"), "/");
    }
}
