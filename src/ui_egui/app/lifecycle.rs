use std::path::PathBuf;

use anyhow::{Context, Result};
#[cfg(not(debug_assertions))]
use directories::ProjectDirs;

use super::confirm::ConfirmDialogState;
use super::context::AppContext;
use super::state::AppState;
use super::toast::ToastManager;
use super::RunnerApp;
use crate::models::form::ParameterForm;
use crate::models::settings::Settings;
use crate::services::catalog::ScriptCatalog;
use crate::services::database::Database;
use crate::services::notification::NotificationService;
use crate::services::runner::RunManager;
use crate::services::settings::SettingsService;
use crate::ui_egui::theme::RunnerTheme;

#[cfg(debug_assertions)]
const DEBUG_CATALOG_FILE: &str = "scripts.toml";

impl RunnerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self> {
        // eframe needs 'static app state, so the database lives for the whole process
        let database = initialize_database()?;

        let settings_service = SettingsService::new(database);
        let settings = load_settings_or_default(&settings_service);
        log::info!(
            "Loaded settings: interpreter={}, max_parallel_runs={}",
            settings.interpreter,
            settings.max_parallel_runs
        );

        let catalog_path = resolve_catalog_path(&settings);
        let catalog = ScriptCatalog::load_or_builtin(&catalog_path);
        log::info!(
            "Catalog {} provides {} scripts",
            catalog_path.display(),
            catalog.len()
        );

        let mut notification_service = NotificationService::new();
        notification_service.set_enabled(settings.notifications_enabled);

        let context = AppContext::new(database, notification_service);
        close_stale_history(&context, settings.history_limit as usize);

        let runs = RunManager::new(settings.max_parallel_runs as usize);
        let main_path = settings.last_main_path.clone().unwrap_or_default();

        let mut app = Self {
            context,
            settings,
            catalog,
            catalog_path,
            runs,
            form: ParameterForm::new(),
            active_theme: RunnerTheme::light(),
            state: AppState::new(main_path),
            toast_manager: ToastManager::new(),
            confirm_dialog: ConfirmDialogState::new(),
        };

        app.apply_theme(&cc.egui_ctx);
        if !app.catalog.is_empty() {
            app.select_script(0);
            app.state.status = "Ready".to_string();
        }
        app.refresh_history();
        Ok(app)
    }

    pub(super) fn theme_for_settings(settings: &Settings) -> RunnerTheme {
        if !settings.use_system_theme {
            return RunnerTheme::for_dark_mode(settings.is_dark());
        }
        match dark_light::detect() {
            dark_light::Mode::Dark => RunnerTheme::dark(),
            dark_light::Mode::Light => RunnerTheme::light(),
            dark_light::Mode::Default => RunnerTheme::for_dark_mode(settings.is_dark()),
        }
    }

    pub(super) fn apply_theme(&mut self, ctx: &egui::Context) {
        let theme = Self::theme_for_settings(&self.settings);
        theme.apply_to_context(ctx);
        self.active_theme = theme;
    }

    pub(super) fn handle_update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_runs(ctx);

        self.handle_file_drops(ctx);
        self.handle_keyboard_shortcuts(ctx);

        self.render_menu_bar(ctx);

        // Bottom panels go before the side and central panels so they span the full width
        self.render_status_bar(ctx);
        self.render_runs_panel(ctx);
        self.render_sidebar(ctx);
        self.render_main_panel(ctx);

        self.render_about_dialog(ctx);
        self.handle_confirm_dialog(ctx);

        // Toasts last so they appear on top
        let is_dark = self.active_theme.is_dark;
        self.toast_manager.render(ctx, is_dark);
    }

    pub(super) fn handle_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let stopped = self.runs.cancel_all();
        if stopped > 0 {
            log::info!("Stopping {} runs before exit", stopped);
        }
        self.persist_settings();
    }
}

fn initialize_database() -> Result<&'static Database> {
    #[cfg(debug_assertions)]
    let db_path = "script_runner.db".to_string();

    #[cfg(not(debug_assertions))]
    let db_path = {
        if let Some(proj_dirs) = ProjectDirs::from("com", "ScriptRunner", "Script Runner") {
            let data_dir = proj_dirs.data_dir();
            std::fs::create_dir_all(data_dir).with_context(|| {
                format!("Failed to create data directory {}", data_dir.display())
            })?;
            data_dir.join("script_runner.db").to_string_lossy().to_string()
        } else {
            "script_runner_prod.db".to_string()
        }
    };

    let db = Database::new(&db_path)?;
    db.initialize_schema()
        .context("Failed to initialize database schema")?;
    log::info!("Using database {}", db.path());

    Ok(Box::leak(Box::new(db)))
}

fn load_settings_or_default(settings_service: &SettingsService) -> Settings {
    match settings_service.get() {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load settings: {}, using defaults", e);
            Settings::default()
        }
    }
}

/// The configured catalog file, else the per-build default location
fn resolve_catalog_path(settings: &Settings) -> PathBuf {
    if let Some(path) = settings.catalog_path.as_deref().filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    #[cfg(debug_assertions)]
    {
        PathBuf::from(DEBUG_CATALOG_FILE)
    }

    #[cfg(not(debug_assertions))]
    {
        match ScriptCatalog::default_path() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{}; using scripts.toml in the working directory", e);
                PathBuf::from("scripts.toml")
            }
        }
    }
}

/// Runs still marked running belong to a previous session that ended abruptly
fn close_stale_history(context: &AppContext, keep: usize) {
    let history = context.history_service();
    match history.close_stale() {
        Ok(0) => {}
        Ok(n) => log::warn!("Marked {} interrupted runs from a previous session as failed", n),
        Err(e) => log::error!("Failed to close stale history rows: {}", e),
    }
    if let Err(e) = history.prune(keep) {
        log::error!("Failed to prune history: {}", e);
    }
}
