use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::{display_name, resolve_dropped_main_path, RunnerApp};
use crate::models::field::{FieldKind, FieldValue};
use crate::models::script::MainPathMode;
use crate::services::catalog::ScriptCatalog;
use crate::services::transcript::write_transcript;

const MAIN_FILE_FILTER: &str = "All Files (*);;Log Files (*.log *.txt)";
const CATALOG_FILTER: &str = "Script Catalog (*.toml)";

impl RunnerApp {
    /// Route files dropped on the window by where the pointer was: a file
    /// field, the script list or anywhere else for the main path
    pub(super) fn handle_file_drops(&mut self, ctx: &egui::Context) {
        // Collect outside of ctx.input, the handlers below need the context free
        let (dropped, pointer) = ctx.input(|i| {
            let files: Vec<PathBuf> = i
                .raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect();
            (files, i.pointer.latest_pos())
        });

        let Some(path) = dropped.first().cloned() else {
            return;
        };
        if dropped.len() > 1 {
            log::info!("{} files dropped, using {}", dropped.len(), path.display());
        }

        if let Some(field) = pointer.and_then(|pos| self.state.field_at(pos)) {
            self.drop_on_field(field, &path);
            return;
        }

        let on_script_list = match (pointer, self.state.script_list_rect) {
            (Some(pos), Some(rect)) => rect.contains(pos),
            _ => false,
        };
        if on_script_list {
            self.add_scripts_from_drop(&path);
            return;
        }

        let resolved = resolve_dropped_main_path(&path, self.settings.main_path_mode);
        let text = resolved.to_string_lossy().into_owned();
        self.state.status = format!("Main Path set: {}", display_name(&text));
        self.set_main_path(text);
    }

    fn drop_on_field(&mut self, field: usize, path: &Path) {
        let text = path.to_string_lossy().into_owned();
        if self.form.set_value(field, FieldValue::Path(text.clone())) {
            self.state.focused_field = Some(field);
            self.state.status = format!("File dropped: {}", display_name(&text));
        } else {
            log::warn!("Field {} does not take a file", field);
        }
    }

    /// A `.py` file is added as one script, a folder is scanned and a
    /// `.toml` file replaces the catalog
    fn add_scripts_from_drop(&mut self, path: &Path) {
        if path.is_dir() {
            self.discover_scripts(path);
            return;
        }

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            self.load_catalog_from(path.to_path_buf());
            return;
        }

        match self.catalog.add_script_file(path) {
            Ok(name) => {
                self.save_catalog();
                self.toast_manager.success(format!("Added script \"{}\"", name));
                if let Some(index) = self.catalog.position(&name) {
                    self.select_script(index);
                }
            }
            Err(e) => self.toast_manager.warning(e.to_string()),
        }
    }

    pub(super) fn browse_main_path(&mut self) {
        let picked = match self.settings.main_path_mode {
            MainPathMode::File => with_filters(
                rfd::FileDialog::new().set_title("Choose main file..."),
                MAIN_FILE_FILTER,
            )
            .pick_file(),
            MainPathMode::Folder => rfd::FileDialog::new()
                .set_title("Choose log directory...")
                .pick_folder(),
        };

        if let Some(path) = picked {
            let text = path.to_string_lossy().into_owned();
            self.state.status = format!("Main Path set: {}", display_name(&text));
            self.set_main_path(text);
        }
    }

    /// Open or save dialog for a file field, per its kind
    pub(super) fn browse_field(&mut self, index: usize) {
        let Some(binding) = self.form.binding(index) else {
            return;
        };
        let schema = &binding.schema;

        let title = schema
            .dialog_title
            .clone()
            .unwrap_or_else(|| format!("Choose {}", schema.display_label()));
        let mut dialog = rfd::FileDialog::new().set_title(title);
        if let Some(filter) = schema.filter.as_deref() {
            dialog = with_filters(dialog, filter);
        }
        if let FieldValue::Path(current) = &binding.value {
            if let Some(parent) = Path::new(current).parent().filter(|p| p.is_dir()) {
                dialog = dialog.set_directory(parent);
            }
        }

        let picked = match schema.kind {
            FieldKind::FileSave => dialog.save_file(),
            _ => dialog.pick_file(),
        };
        if let Some(path) = picked {
            self.form
                .set_value(index, FieldValue::Path(path.to_string_lossy().into_owned()));
        }
    }

    pub(super) fn open_catalog_dialog(&mut self) {
        let mut dialog = with_filters(
            rfd::FileDialog::new().set_title("Open script catalog"),
            CATALOG_FILTER,
        );
        if let Some(dir) = self.catalog_path.parent().filter(|p| p.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.pick_file() {
            self.load_catalog_from(path);
        }
    }

    /// Replace the catalog with the one at `path` and remember the location
    fn load_catalog_from(&mut self, path: PathBuf) {
        match ScriptCatalog::load(&path) {
            Ok(catalog) => {
                let keep = self.selected_script().map(|s| s.name.clone());
                self.catalog = catalog;
                self.catalog_path = path;
                self.settings.catalog_path = Some(self.catalog_path.to_string_lossy().into_owned());
                self.persist_settings();

                self.reset_script_selection(keep.as_deref());
                if self.state.selected_script.is_none() && !self.catalog.is_empty() {
                    self.select_script(0);
                }
                self.toast_manager
                    .success(format!("Loaded {} scripts", self.catalog.len()));
            }
            Err(e) => {
                log::error!("Failed to open catalog {}: {}", path.display(), e);
                self.toast_manager.error(e.to_string());
            }
        }
    }

    pub(super) fn reload_catalog(&mut self) {
        let keep = self.selected_script().map(|s| s.name.clone());
        self.catalog = ScriptCatalog::load_or_builtin(&self.catalog_path);
        self.reset_script_selection(keep.as_deref());
        if self.state.selected_script.is_none() && !self.catalog.is_empty() {
            self.select_script(0);
        }
        self.state.status = format!("Reloaded {} scripts", self.catalog.len());
    }

    pub(super) fn scan_folder_dialog(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_title("Scan folder for Python scripts")
            .pick_folder()
        {
            self.discover_scripts(&dir);
        }
    }

    fn discover_scripts(&mut self, dir: &Path) {
        match self.catalog.discover(dir) {
            Ok(0) => self.toast_manager.info("No new scripts found"),
            Ok(added) => {
                self.save_catalog();
                self.toast_manager.success(format!("Added {} scripts", added));
                if self.state.selected_script.is_none() {
                    self.select_script(0);
                }
            }
            Err(e) => self.toast_manager.warning(e.to_string()),
        }
    }

    fn save_catalog(&mut self) {
        if let Err(e) = self.catalog.save(&self.catalog_path) {
            log::error!("Failed to save catalog: {}", e);
            self.toast_manager.error(format!("Failed to save catalog: {}", e));
        }
    }

    pub(super) fn save_transcript_dialog(&mut self) {
        let Some(run) = self.viewed_run() else {
            return;
        };
        let file_name = transcript_file_name(run.script_name(), Local::now());
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save transcript")
            .set_file_name(file_name)
            .add_filter("Log Files", &["log", "txt"])
            .save_file()
        else {
            return;
        };

        match write_transcript(&path, run, self.settings.show_timestamps) {
            Ok(lines) => {
                self.toast_manager
                    .success(format!("Saved {} lines to {}", lines, display_name(&path.to_string_lossy())));
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.toast_manager.error(format!("{:#}", e));
            }
        }
    }
}

fn with_filters(mut dialog: rfd::FileDialog, filter: &str) -> rfd::FileDialog {
    for (name, exts) in parse_dialog_filter(filter) {
        dialog = dialog.add_filter(name, exts.as_slice());
    }
    dialog
}

/// Parse a filter string such as `Logs (*.log *.txt);;All Files (*)` into
/// named extension lists. Entries without a pattern are skipped.
pub(crate) fn parse_dialog_filter(filter: &str) -> Vec<(String, Vec<String>)> {
    filter.split(";;")
        .filter_map(|entry| {
            let open = entry.find('(')?;
            let close = entry[open..].find(')')? + open;
            let name = entry[..open].trim();
            let exts: Vec<String> = entry[open + 1..close]
                .split_whitespace()
                .map(|pattern| pattern.trim_start_matches("*.").to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
            if exts.is_empty() {
                return None;
            }
            let name = if name.is_empty() { exts.join(", ") } else { name.to_string() };
            Some((name, exts))
        })
        .collect()
}

/// Suggested file name for a saved transcript
pub(crate) fn transcript_file_name(script_name: &str, time: DateTime<Local>) -> String {
    let stem: String = script_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "run".to_string() } else { stem };
    format!("{}_{}.log", stem, time.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_dialog_filter() {
        assert_eq!(
            parse_dialog_filter(MAIN_FILE_FILTER),
            vec![
                ("All Files".to_string(), vec!["*".to_string()]),
                (
                    "Log Files".to_string(),
                    vec!["log".to_string(), "txt".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_parse_dialog_filter_skips_malformed_entries() {
        assert!(parse_dialog_filter("").is_empty());
        assert!(parse_dialog_filter("Broken (*.log").is_empty());
        assert_eq!(
            parse_dialog_filter("No pattern;;(*.csv)"),
            vec![("csv".to_string(), vec!["csv".to_string()])]
        );
    }

    #[test]
    fn test_transcript_file_name() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(
            transcript_file_name("Add numbers", time),
            "Add_numbers_20240309_140500.log"
        );
        assert_eq!(transcript_file_name("  ", time), "run_20240309_140500.log");
    }
}
