// Command construction
// Builds the argv for a script run and renders it for preview

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::form::ParameterForm;
use crate::models::script::{LogArgStyle, ScriptDefinition};

/// Appended when the mode flag is enabled so scripts know they run in the GUI
pub const MODE_FLAG: [&str; 2] = ["--mode", "gui"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unterminated {0} quote in custom arguments")]
    UnterminatedQuote(char),
    #[error("Custom arguments end with a dangling backslash")]
    DanglingEscape,
}

/// A fully resolved process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Rebuild a command from a stored argv
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
        })
    }

    /// Shell-style rendering for display and copying
    pub fn preview(&self) -> String {
        self.argv()
            .iter()
            .map(|a| quote_arg(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if !needs_quotes {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Assembles the argv in the order
/// `interpreter script [main path] [form args] [script extras] [custom args] [--mode gui]`
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    interpreter: String,
    main_path: Option<(String, LogArgStyle)>,
    form_args: Vec<String>,
    extra_args: Vec<String>,
    mode_flag: bool,
    working_dir: Option<PathBuf>,
}

impl CommandBuilder {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            main_path: None,
            form_args: Vec::new(),
            extra_args: Vec::new(),
            mode_flag: false,
            working_dir: None,
        }
    }

    pub fn main_path(mut self, path: impl Into<String>, style: LogArgStyle) -> Self {
        let path = path.into();
        if !path.trim().is_empty() {
            self.main_path = Some((path, style));
        }
        self
    }

    pub fn form_args(mut self, args: Vec<String>) -> Self {
        self.form_args = args;
        self
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    pub fn mode_flag(mut self, enabled: bool) -> Self {
        self.mode_flag = enabled;
        self
    }

    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn build(self, script_path: &Path) -> CommandLine {
        let mut args = vec![script_path.to_string_lossy().into_owned()];

        if let Some((path, style)) = self.main_path {
            match style {
                LogArgStyle::Flag(flag) => {
                    args.push(flag);
                    args.push(path);
                }
                LogArgStyle::Positional => args.push(path),
            }
        }

        args.extend(self.form_args);
        args.extend(self.extra_args);

        if self.mode_flag {
            args.extend(MODE_FLAG.iter().map(|s| s.to_string()));
        }

        CommandLine {
            program: self.interpreter,
            args,
            working_dir: self.working_dir,
        }
    }
}

/// Split a line of user-typed arguments.
///
/// Whitespace separates arguments. Single quotes keep everything literal,
/// double quotes allow `\"` and `\\`, and a backslash outside quotes escapes
/// the next character.
pub fn split_custom_args(text: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc @ ('"' | '\\')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(CommandError::UnterminatedQuote('"')),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_arg = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err(CommandError::DanglingEscape),
                }
            }
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                in_arg = true;
                current.push(c);
            }
        }
    }

    if in_arg {
        args.push(current);
    }

    Ok(args)
}

/// Everything needed to check and build a run
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub script: Option<&'a ScriptDefinition>,
    /// Script path after resolving it against the catalog directory
    pub script_path: Option<&'a Path>,
    pub main_path: &'a str,
    pub form: &'a ParameterForm,
    pub custom_args: &'a str,
    pub interpreter: &'a str,
    pub append_mode_flag: bool,
}

/// Outcome of the pre-run checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCheck {
    pub command: Option<CommandLine>,
    /// Blocking problems, shown to the user before anything starts
    pub errors: Vec<String>,
    /// Problems the user may choose to ignore
    pub warnings: Vec<String>,
}

impl RunCheck {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.command.is_some()
    }

    /// Errors as one message, one per line
    pub fn error_text(&self) -> String {
        self.errors.join("\n")
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }
}

/// The script's own interpreter, or `default` when it names none
pub fn resolve_interpreter<'a>(script: &'a ScriptDefinition, default: &'a str) -> &'a str {
    script
        .interpreter
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or(default)
}

/// Validate a run request and build its command line.
///
/// Checks stop at the first failing stage: main path, then script, then the
/// form, then the custom arguments.
pub fn prepare_run(request: &RunRequest<'_>) -> RunCheck {
    if request.main_path.trim().is_empty() {
        return RunCheck::fail("Please choose a log file.");
    }

    let Some(script) = request.script else {
        return RunCheck::fail("Please select a script.");
    };

    let errors = request.form.validate();
    if !errors.is_empty() {
        return RunCheck {
            errors,
            ..RunCheck::default()
        };
    }

    let custom = match split_custom_args(request.custom_args) {
        Ok(args) => args,
        Err(e) => return RunCheck::fail(e.to_string()),
    };

    let script_path = request.script_path.unwrap_or(script.path.as_path());
    let mut warnings = Vec::new();
    if !script_path.exists() {
        warnings.push(format!(
            "Script '{}' was not found. Continue anyway?",
            script_path.display()
        ));
    }

    let interpreter = resolve_interpreter(script, request.interpreter);

    let command = CommandBuilder::new(interpreter)
        .main_path(request.main_path.trim(), script.log_arg_style.clone())
        .form_args(request.form.cli_args())
        .extra_args(script.extra_args.clone())
        .extra_args(custom)
        .mode_flag(request.append_mode_flag)
        .working_dir(script.working_dir.clone())
        .build(script_path);

    RunCheck {
        command: Some(command),
        errors: Vec::new(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{FieldKind, FieldSchema, FieldValue};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn add_numbers() -> ScriptDefinition {
        ScriptDefinition::new("Add numbers", "add_numbers.py")
            .with_field(FieldSchema::new("--user", "User", FieldKind::Text).required())
            .with_field(FieldSchema::new("--a", "first number", FieldKind::Int).required())
    }

    fn filled_form(script: &ScriptDefinition) -> ParameterForm {
        let mut form = ParameterForm::from_schema(&script.args_schema);
        form.set_value(0, FieldValue::Text("Pavel".into()));
        form.set_value(1, FieldValue::Int(3));
        form
    }

    fn request<'a>(
        script: Option<&'a ScriptDefinition>,
        form: &'a ParameterForm,
        main_path: &'a str,
        custom_args: &'a str,
    ) -> RunRequest<'a> {
        RunRequest {
            script,
            script_path: None,
            main_path,
            form,
            custom_args,
            interpreter: "python3",
            append_mode_flag: true,
        }
    }

    #[test]
    fn test_builder_flag_style_order() {
        let command = CommandBuilder::new("python3")
            .main_path("/tmp/run.log", LogArgStyle::Flag("--log".into()))
            .form_args(vec!["--a".into(), "1".into()])
            .extra_args(vec!["--verbose".into()])
            .mode_flag(true)
            .build(Path::new("add.py"));

        assert_eq!(command.program, "python3");
        assert_eq!(
            command.args,
            vec!["add.py", "--log", "/tmp/run.log", "--a", "1", "--verbose", "--mode", "gui"]
        );
    }

    #[test]
    fn test_builder_positional_style() {
        let command = CommandBuilder::new("python")
            .main_path("out", LogArgStyle::Positional)
            .build(Path::new("b.py"));
        assert_eq!(command.args, vec!["b.py", "out"]);
    }

    #[test]
    fn test_builder_skips_blank_main_path() {
        let command = CommandBuilder::new("python")
            .main_path("  ", LogArgStyle::default())
            .build(Path::new("b.py"));
        assert_eq!(command.args, vec!["b.py"]);
    }

    #[test]
    fn test_preview_quotes_when_needed() {
        let mut command = CommandLine::new("python3");
        command.args = vec![
            "my script.py".into(),
            "--name".into(),
            "say \"hi\"".into(),
            "".into(),
            "plain".into(),
        ];
        assert_eq!(
            command.preview(),
            r#"python3 "my script.py" --name "say \"hi\"" "" plain"#
        );
    }

    #[test]
    fn test_preview_keeps_backslash_paths() {
        let mut command = CommandLine::new("python");
        command.args = vec![r"C:\Temp\x.py".into()];
        assert_eq!(command.preview(), r#"python "C:\\Temp\\x.py""#);
        assert_eq!(split_custom_args(&command.preview()).unwrap(), command.argv());
    }

    #[test]
    fn test_argv_round_trip() {
        let command = CommandBuilder::new("python3")
            .form_args(vec!["--x".into(), "1".into()])
            .build(Path::new("s.py"));
        let rebuilt = CommandLine::from_argv(&command.argv()).unwrap();
        assert_eq!(rebuilt, command);
        assert!(CommandLine::from_argv(&[]).is_none());
    }

    #[test_case("", &[] ; "empty")]
    #[test_case("  --a   1 ", &["--a", "1"] ; "extra whitespace")]
    #[test_case(r#"--name "John Smith""#, &["--name", "John Smith"] ; "double quotes")]
    #[test_case("--path 'C:\\Temp dir'", &["--path", "C:\\Temp dir"] ; "single quotes are literal")]
    #[test_case(r#"a\ b"#, &["a b"] ; "escaped space")]
    #[test_case(r#""say \"hi\"""#, &["say \"hi\""] ; "escaped quote")]
    #[test_case(r#"--empty """#, &["--empty", ""] ; "empty quoted argument")]
    #[test_case(r#"pre"fix"ed"#, &["prefixed"] ; "adjacent quoting joins")]
    fn test_split_custom_args(input: &str, expected: &[&str]) {
        assert_eq!(split_custom_args(input).unwrap(), expected);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(
            split_custom_args("--name \"John"),
            Err(CommandError::UnterminatedQuote('"'))
        );
        assert_eq!(
            split_custom_args("'open"),
            Err(CommandError::UnterminatedQuote('\''))
        );
        assert_eq!(split_custom_args("end\\"), Err(CommandError::DanglingEscape));
    }

    #[test]
    fn test_prepare_requires_main_path() {
        let script = add_numbers();
        let form = filled_form(&script);
        let check = prepare_run(&request(Some(&script), &form, " ", ""));
        assert_eq!(check.errors, vec!["Please choose a log file."]);
        assert!(!check.is_ok());
    }

    #[test]
    fn test_prepare_requires_script() {
        let form = ParameterForm::new();
        let check = prepare_run(&request(None, &form, "/tmp/a.log", ""));
        assert_eq!(check.errors, vec!["Please select a script."]);
    }

    #[test]
    fn test_prepare_reports_all_missing_fields() {
        let script = add_numbers();
        let mut form = ParameterForm::from_schema(&script.args_schema);
        form.set_value(0, FieldValue::Text(String::new()));
        let check = prepare_run(&request(Some(&script), &form, "/tmp/a.log", ""));
        assert_eq!(check.error_text(), "'User' is required.");
    }

    #[test]
    fn test_prepare_bad_custom_args() {
        let script = add_numbers();
        let form = filled_form(&script);
        let check = prepare_run(&request(Some(&script), &form, "/tmp/a.log", "'oops"));
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("Unterminated"));
    }

    #[test]
    fn test_prepare_missing_script_is_warning() {
        let script = add_numbers();
        let form = filled_form(&script);
        let check = prepare_run(&request(Some(&script), &form, "/tmp/a.log", "--dry-run"));

        assert!(check.is_ok());
        assert_eq!(check.warnings.len(), 1);
        assert_eq!(
            check.command.unwrap().args,
            vec![
                "add_numbers.py",
                "--log",
                "/tmp/a.log",
                "--user",
                "Pavel",
                "--a",
                "3",
                "--dry-run",
                "--mode",
                "gui"
            ]
        );
    }

    #[test]
    fn test_prepare_existing_script_no_warning() {
        let file = NamedTempFile::new().unwrap();
        let script = ScriptDefinition::new("Temp", file.path());
        let form = ParameterForm::from_schema(&script.args_schema);
        let mut req = request(Some(&script), &form, "/tmp/a.log", "");
        req.append_mode_flag = false;

        let check = prepare_run(&req);
        assert!(check.warnings.is_empty());
        assert_eq!(check.command.unwrap().args.len(), 3);
    }

    #[test]
    fn test_prepare_script_interpreter_overrides() {
        let mut script = add_numbers();
        script.interpreter = Some("/usr/bin/python3.12".into());
        let form = filled_form(&script);
        let check = prepare_run(&request(Some(&script), &form, "/tmp/a.log", ""));
        assert_eq!(check.command.unwrap().program, "/usr/bin/python3.12");
    }
}
