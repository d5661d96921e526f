// Integration tests for persistence, the catalog and command building

mod fixtures;

use std::collections::BTreeMap;

use chrono::{Duration, Local};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use script_runner::models::field::FieldValue;
use script_runner::models::form::ParameterForm;
use script_runner::models::run::{HistoryEntry, RunStatus};
use script_runner::models::script::MainPathMode;
use script_runner::models::template::ArgumentTemplate;
use script_runner::services::catalog::ScriptCatalog;
use script_runner::services::command::{prepare_run, RunRequest};
use script_runner::services::history::{HistoryService, RunOutcome};
use script_runner::services::settings::SettingsService;
use script_runner::services::template::TemplateService;

#[test]
fn test_settings_persistence() {
    let (_dir, db) = fixtures::open_database();
    let service = SettingsService::new(&db);

    let mut settings = service.get().expect("Failed to get settings");
    assert_eq!(settings.theme, "light");
    assert_eq!(settings.max_parallel_runs, 2);
    assert_eq!(settings.history_limit, 200);
    assert!(settings.append_mode_flag);

    settings.theme = "dark".to_string();
    settings.main_path_mode = MainPathMode::Folder;
    settings.last_main_path = Some("/var/log".to_string());
    settings.max_parallel_runs = 4;
    settings.show_timestamps = true;
    settings.catalog_path = Some("/etc/runner/scripts.toml".to_string());
    service.update(&settings).expect("Failed to update settings");

    let loaded = service.get().expect("Failed to reload settings");
    assert_eq!(loaded, settings);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let (_dir, db) = fixtures::open_database();
    let service = SettingsService::new(&db);

    let mut settings = service.get().unwrap();
    settings.max_parallel_runs = 0;
    assert!(service.update(&settings).is_err());
    assert_eq!(service.get().unwrap().max_parallel_runs, 2);
}

#[test]
fn test_history_lifecycle() {
    let (_dir, db) = fixtures::open_database();
    let history = HistoryService::new(db.connection());

    let argv = vec![
        "python3".to_string(),
        "report.py".to_string(),
        "--log".to_string(),
        "/var/log/app.log".to_string(),
    ];
    let mut entry = HistoryEntry::new("Report", argv.clone(), Some("/var/log/app.log".into()));
    entry.started_at = Local::now() - Duration::seconds(5);
    let id = history.record_start(&entry).unwrap();

    let outcome = RunOutcome {
        status: RunStatus::Finished { exit_code: Some(0) },
        finished_at: Local::now(),
        output_lines: 12,
        error_lines: 1,
    };
    history.record_finish(id, &outcome).unwrap();

    let recent = history.list_recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    let stored = &recent[0];
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.argv, argv);
    assert_eq!(stored.run_status(), RunStatus::Finished { exit_code: Some(0) });
    assert_eq!(stored.output_lines, 12);
    assert_eq!(stored.error_lines, 1);
    assert!(stored.duration_secs().unwrap() >= 4);
}

#[test]
fn test_history_prune_and_stale_runs() {
    let (_dir, db) = fixtures::open_database();
    let history = HistoryService::new(db.connection());

    let base = Local::now() - Duration::hours(1);
    for i in 0..5 {
        let mut entry = HistoryEntry::new(format!("job {}", i), vec!["python3".into()], None);
        entry.started_at = base + Duration::minutes(i);
        history.record_start(&entry).unwrap();
    }

    // Every row is still marked running
    assert_eq!(history.close_stale().unwrap(), 5);
    assert!(matches!(
        history.list_recent(1).unwrap()[0].run_status(),
        RunStatus::Failed { .. }
    ));

    assert_eq!(history.prune(2).unwrap(), 3);
    let names: Vec<String> = history
        .list_recent(10)
        .unwrap()
        .into_iter()
        .map(|e| e.script_name)
        .collect();
    assert_eq!(names, vec!["job 4", "job 3"]);

    assert_eq!(history.clear().unwrap(), 2);
    assert!(history.list_recent(10).unwrap().is_empty());
}

#[test]
fn test_template_persistence() {
    let (_dir, db) = fixtures::open_database();
    let templates = TemplateService::new(db.connection());

    let mut values = BTreeMap::new();
    values.insert("--user".to_string(), FieldValue::Text("pavel".into()));
    values.insert("--days".to_string(), FieldValue::Int(14));

    let created = templates
        .create(
            ArgumentTemplate::builder()
                .name("Two weeks")
                .script_name("Report")
                .values(values.clone())
                .extra_args("--dry-run")
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(created.id.is_some());
    assert_eq!(created.values, values);

    // Names are unique per script
    let duplicate = ArgumentTemplate::builder()
        .name("Two weeks")
        .script_name("Report")
        .build()
        .unwrap();
    assert!(templates.create(duplicate).is_err());

    let mut updated = created.clone();
    updated.main_path = Some("/var/log/app.log".to_string());
    templates.update(&updated).unwrap();

    let listed = templates.list_for_script("Report").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].main_path.as_deref(), Some("/var/log/app.log"));
    assert!(templates.list_for_script("Cleaner").unwrap().is_empty());

    templates.delete(listed[0].id.unwrap()).unwrap();
    assert!(templates.list_for_script("Report").unwrap().is_empty());
}

#[test]
fn test_template_restores_form_values() {
    let catalog = ScriptCatalog::from_toml_str(fixtures::SAMPLE_CATALOG).unwrap();
    let report = catalog.find("Report").unwrap();

    let mut form = ParameterForm::from_schema(&report.args_schema);
    form.set_value(0, FieldValue::Text("alice".into()));
    form.set_value(1, FieldValue::Int(3));
    let snapshot = form.values_snapshot();

    let mut fresh = ParameterForm::from_schema(&report.args_schema);
    assert_eq!(fresh.apply_snapshot(&snapshot), 4);
    assert_eq!(fresh.cli_args(), form.cli_args());
}

#[test]
fn test_catalog_file_to_command() {
    let dir = TempDir::new().unwrap();
    let catalog_path = fixtures::write_sample_catalog(dir.path());

    let catalog = ScriptCatalog::load(&catalog_path).unwrap();
    assert_eq!(catalog.len(), 2);
    let report = catalog.find("Report").unwrap();
    let script_path = catalog.resolve_path(report);
    assert_eq!(script_path, dir.path().join("tools").join("report.py"));

    let mut form = ParameterForm::from_schema(&report.args_schema);
    form.set_value(0, FieldValue::Text("pavel".into()));
    form.set_value(3, FieldValue::Bool(true));

    let check = prepare_run(&RunRequest {
        script: Some(report),
        script_path: Some(&script_path),
        main_path: "/var/log/app.log",
        form: &form,
        custom_args: "--limit 'ten lines'",
        interpreter: "python3",
        append_mode_flag: true,
    });
    assert!(check.is_ok(), "{:?}", check.errors);
    assert!(check.warnings.is_empty());

    let command = check.command.unwrap();
    assert_eq!(
        command.argv(),
        vec![
            "python3".to_string(),
            script_path.to_string_lossy().into_owned(),
            "--log".into(),
            "/var/log/app.log".into(),
            "--user".into(),
            "pavel".into(),
            "--days".into(),
            "7".into(),
            "--format".into(),
            "csv".into(),
            "--verbose".into(),
            "--quiet".into(),
            "--limit".into(),
            "ten lines".into(),
            "--mode".into(),
            "gui".into(),
        ]
    );
}

#[test]
fn test_missing_script_is_a_warning() {
    let catalog = ScriptCatalog::from_toml_str(fixtures::SAMPLE_CATALOG).unwrap();
    let cleaner = catalog.find("Cleaner").unwrap();
    let form = ParameterForm::from_schema(&cleaner.args_schema);

    let check = prepare_run(&RunRequest {
        script: Some(cleaner),
        script_path: None,
        main_path: "/tmp/logs",
        form: &form,
        custom_args: "",
        interpreter: "python3",
        append_mode_flag: false,
    });

    assert!(check.is_ok());
    assert_eq!(check.warnings.len(), 1);
    assert_eq!(
        check.command.unwrap().argv(),
        vec!["python3.11", "/opt/tools/clean.py", "/tmp/logs"]
    );
}

#[test]
fn test_catalog_save_and_discover() {
    let dir = TempDir::new().unwrap();
    let scripts = dir.path().join("scripts");
    std::fs::create_dir_all(&scripts).unwrap();
    std::fs::write(scripts.join("fetch.py"), "").unwrap();
    std::fs::write(scripts.join("__init__.py"), "").unwrap();

    let mut catalog = ScriptCatalog::from_toml_str(fixtures::SAMPLE_CATALOG).unwrap();
    assert_eq!(catalog.discover(&scripts).unwrap(), 1);

    let path = dir.path().join("out").join("scripts.toml");
    catalog.save(&path).unwrap();
    let reloaded = ScriptCatalog::load(&path).unwrap();
    assert_eq!(reloaded.names(), vec!["Report", "Cleaner", "fetch"]);
    assert_eq!(reloaded.find("Report"), catalog.find("Report"));
}
