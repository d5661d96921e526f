// Parameter field model
// Describes one entry of a script's argument schema and the values it can hold

use serde::{Deserialize, Serialize};
use thiserror::Error;

const INT_MIN_DEFAULT: i64 = -1_000_000_000;
const INT_MAX_DEFAULT: i64 = 1_000_000_000;
const FLOAT_MIN_DEFAULT: f64 = -1e9;
const FLOAT_MAX_DEFAULT: f64 = 1e9;

/// The kind of input widget a field is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Select,
    Checkbox,
    FileOpen,
    FileSave,
}

impl FieldKind {
    /// Parse a kind name as written in a catalog. Unknown names fall back to text.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => FieldKind::Int,
            "float" | "number" => FieldKind::Float,
            "select" | "choice" => FieldKind::Select,
            "checkbox" | "bool" | "flag" => FieldKind::Checkbox,
            "file_open" => FieldKind::FileOpen,
            "file_save" => FieldKind::FileSave,
            _ => FieldKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::FileOpen => "file_open",
            FieldKind::FileSave => "file_save",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::FileOpen | FieldKind::FileSave)
    }
}

impl From<String> for FieldKind {
    fn from(value: String) -> Self {
        FieldKind::from_name(&value)
    }
}

impl From<FieldKind> for String {
    fn from(value: FieldKind) -> Self {
        value.as_str().to_string()
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Text
    }
}

/// A default value as written in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DefaultValue {
    fn as_text(&self) -> String {
        match self {
            DefaultValue::Bool(b) => b.to_string(),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => s.clone(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            DefaultValue::Int(i) => Some(*i),
            DefaultValue::Float(f) => Some(*f as i64),
            DefaultValue::Text(s) => s.trim().parse().ok(),
            DefaultValue::Bool(_) => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            DefaultValue::Int(i) => Some(*i as f64),
            DefaultValue::Float(f) => Some(*f),
            DefaultValue::Text(s) => s.trim().parse().ok(),
            DefaultValue::Bool(_) => None,
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            DefaultValue::Bool(b) => *b,
            DefaultValue::Int(i) => *i != 0,
            DefaultValue::Float(f) => *f != 0.0,
            DefaultValue::Text(s) => is_truthy(s),
        }
    }
}

/// Schema for a single script parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// CLI flag such as `--user`. Empty for positional arguments.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// File dialog filter, e.g. `Log/Text (*.log *.txt);;All Files (*)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_title: Option<String>,
}

impl FieldSchema {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            default: None,
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
            filter: None,
            dialog_title: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Label text, falling back to the key
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    /// Label as shown next to the input; required fields are starred
    pub fn form_label(&self) -> String {
        if self.required {
            format!("{} *", self.display_label())
        } else {
            self.display_label().to_string()
        }
    }

    pub fn int_bounds(&self) -> (i64, i64) {
        (
            self.min.map(|v| v as i64).unwrap_or(INT_MIN_DEFAULT),
            self.max.map(|v| v as i64).unwrap_or(INT_MAX_DEFAULT),
        )
    }

    pub fn float_bounds(&self) -> (f64, f64) {
        (
            self.min.unwrap_or(FLOAT_MIN_DEFAULT),
            self.max.unwrap_or(FLOAT_MAX_DEFAULT),
        )
    }

    /// Drag speed for numeric widgets
    pub fn step_or_default(&self) -> f64 {
        match (self.step, self.kind) {
            (Some(step), _) if step > 0.0 => step,
            (_, FieldKind::Float) => 0.1,
            _ => 1.0,
        }
    }

    /// Value the widget starts with when the form is built
    pub fn initial_value(&self) -> FieldValue {
        match self.kind {
            FieldKind::Text => FieldValue::Text(
                self.default.as_ref().map(DefaultValue::as_text).unwrap_or_default(),
            ),
            FieldKind::Int => {
                let (min, max) = self.int_bounds();
                let value = self.default.as_ref().and_then(DefaultValue::as_i64).unwrap_or(0);
                FieldValue::Int(value.clamp(min, max.max(min)))
            }
            FieldKind::Float => {
                let (min, max) = self.float_bounds();
                let value = self.default.as_ref().and_then(DefaultValue::as_f64).unwrap_or(0.0);
                FieldValue::Float(value.clamp(min, max.max(min)))
            }
            FieldKind::Select => {
                let default = self.default.as_ref().map(DefaultValue::as_text);
                let selected = match default {
                    Some(d) if self.options.contains(&d) => d,
                    _ => self.options.first().cloned().unwrap_or_default(),
                };
                FieldValue::Select(selected)
            }
            FieldKind::Checkbox => {
                FieldValue::Bool(self.default.as_ref().map(DefaultValue::as_bool).unwrap_or(false))
            }
            FieldKind::FileOpen | FieldKind::FileSave => FieldValue::Path(String::new()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() && self.label.trim().is_empty() {
            return Err("Field needs a key or a label".to_string());
        }

        if self.kind == FieldKind::Select && self.options.is_empty() {
            return Err(format!("Select field '{}' has no options", self.display_label()));
        }

        for (name, bound) in [("min", self.min), ("max", self.max), ("step", self.step)] {
            if let Some(v) = bound.filter(|v| !v.is_finite()) {
                return Err(format!(
                    "Field '{}' has a non-finite {} ({})",
                    self.display_label(),
                    name,
                    v
                ));
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!(
                    "Field '{}' has min {} greater than max {}",
                    self.display_label(),
                    min,
                    max
                ));
            }
        }

        Ok(())
    }
}

/// Reasons a pasted value can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldValueError {
    #[error("Selected text is not an integer.")]
    NotAnInteger,
    #[error("Selected text is not a number.")]
    NotANumber,
    #[error("'{0}' is not an available option.")]
    UnknownOption(String),
}

/// The current value of a parameter field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Select(String),
    Bool(bool),
    Path(String),
}

impl FieldValue {
    /// Interpret free text (e.g. a selection copied from the log) for a field
    pub fn parse_for(schema: &FieldSchema, text: &str) -> Result<FieldValue, FieldValueError> {
        let t = text.trim();
        match schema.kind {
            FieldKind::Text => Ok(FieldValue::Text(t.to_string())),
            FieldKind::FileOpen | FieldKind::FileSave => Ok(FieldValue::Path(t.to_string())),
            FieldKind::Int => {
                let parsed: f64 = t.parse().map_err(|_| FieldValueError::NotAnInteger)?;
                if !parsed.is_finite() {
                    return Err(FieldValueError::NotAnInteger);
                }
                let (min, max) = schema.int_bounds();
                Ok(FieldValue::Int((parsed.trunc() as i64).clamp(min, max.max(min))))
            }
            FieldKind::Float => {
                let parsed: f64 = t.parse().map_err(|_| FieldValueError::NotANumber)?;
                if !parsed.is_finite() {
                    return Err(FieldValueError::NotANumber);
                }
                let (min, max) = schema.float_bounds();
                Ok(FieldValue::Float(parsed.clamp(min, max.max(min))))
            }
            FieldKind::Select => {
                if schema.options.iter().any(|o| o == t) {
                    Ok(FieldValue::Select(t.to_string()))
                } else {
                    Err(FieldValueError::UnknownOption(t.to_string()))
                }
            }
            FieldKind::Checkbox => Ok(FieldValue::Bool(is_truthy(t))),
        }
    }

    /// Whether this value counts as "missing" for a required field
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) | FieldValue::Path(s) => s.trim().is_empty(),
            FieldValue::Int(_) | FieldValue::Float(_) | FieldValue::Bool(_) => false,
        }
    }

    /// Text passed on the command line
    pub fn as_arg(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) | FieldValue::Path(s) => s.trim().to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// True when the value can be stored in a field of the given kind
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Text(_), FieldKind::Text)
                | (FieldValue::Int(_), FieldKind::Int)
                | (FieldValue::Float(_), FieldKind::Float)
                | (FieldValue::Select(_), FieldKind::Select)
                | (FieldValue::Bool(_), FieldKind::Checkbox)
                | (FieldValue::Path(_), FieldKind::FileOpen)
                | (FieldValue::Path(_), FieldKind::FileSave)
        )
    }
}

fn is_truthy(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn int_field() -> FieldSchema {
        FieldSchema::new("--a", "first number", FieldKind::Int)
            .required()
            .with_range(-1_000_000.0, 1_000_000.0)
    }

    #[test_case("text", FieldKind::Text)]
    #[test_case("string", FieldKind::Text)]
    #[test_case("INT", FieldKind::Int)]
    #[test_case("float", FieldKind::Float)]
    #[test_case("select", FieldKind::Select)]
    #[test_case("checkbox", FieldKind::Checkbox)]
    #[test_case("file_open", FieldKind::FileOpen)]
    #[test_case("file_save", FieldKind::FileSave)]
    #[test_case("mystery", FieldKind::Text)]
    fn test_kind_from_name(name: &str, expected: FieldKind) {
        assert_eq!(FieldKind::from_name(name), expected);
    }

    #[test]
    fn test_form_label_marks_required() {
        assert_eq!(int_field().form_label(), "first number *");
        let optional = FieldSchema::new("--b", "", FieldKind::Text);
        assert_eq!(optional.form_label(), "--b");
    }

    #[test]
    fn test_initial_int_value_is_clamped() {
        let field = FieldSchema::new("--limit", "Limit", FieldKind::Int)
            .with_range(1.0, 1000.0)
            .with_default(DefaultValue::Int(5000));
        assert_eq!(field.initial_value(), FieldValue::Int(1000));

        let no_default = FieldSchema::new("--limit", "Limit", FieldKind::Int).with_range(1.0, 10.0);
        assert_eq!(no_default.initial_value(), FieldValue::Int(1));
    }

    #[test]
    fn test_initial_select_value() {
        let field = FieldSchema::new("--mode", "Mode", FieldKind::Select)
            .with_options(["fast", "accurate"])
            .with_default(DefaultValue::Text("accurate".into()));
        assert_eq!(field.initial_value(), FieldValue::Select("accurate".into()));

        let bad_default = field.clone().with_default(DefaultValue::Text("slow".into()));
        assert_eq!(bad_default.initial_value(), FieldValue::Select("fast".into()));
    }

    #[test]
    fn test_initial_checkbox_and_file_values() {
        let flag = FieldSchema::new("--dry-run", "Dry run", FieldKind::Checkbox)
            .with_default(DefaultValue::Bool(true));
        assert_eq!(flag.initial_value(), FieldValue::Bool(true));

        let file = FieldSchema::new("--inputlog", "Input Log", FieldKind::FileOpen);
        assert_eq!(file.initial_value(), FieldValue::Path(String::new()));
    }

    #[test]
    fn test_validate_select_without_options() {
        let field = FieldSchema::new("--profile", "Profile", FieldKind::Select);
        assert!(field.validate().is_err());
    }

    #[test]
    fn test_validate_inverted_range() {
        let field = FieldSchema::new("--x", "X", FieldKind::Float).with_range(1.0, 0.0);
        assert!(field.validate().is_err());
    }

    #[test_case("min = nan" ; "nan min")]
    #[test_case("max = inf" ; "infinite max")]
    #[test_case("step = -inf" ; "infinite step")]
    fn test_validate_rejects_non_finite_bounds(bound: &str) {
        let field: FieldSchema = toml::from_str(&format!(
            "key = \"--ratio\"\ntype = \"float\"\n{}\n",
            bound
        ))
        .unwrap();
        assert!(field.validate().is_err());
    }

    #[test_case("42", FieldValue::Int(42))]
    #[test_case(" 7.9 ", FieldValue::Int(7))]
    #[test_case("-3", FieldValue::Int(-3))]
    #[test_case("5000000", FieldValue::Int(1_000_000))]
    fn test_parse_int(text: &str, expected: FieldValue) {
        assert_eq!(FieldValue::parse_for(&int_field(), text).unwrap(), expected);
    }

    #[test]
    fn test_parse_int_rejects_words() {
        let err = FieldValue::parse_for(&int_field(), "sum=3").unwrap_err();
        assert_eq!(err.to_string(), "Selected text is not an integer.");
    }

    #[test]
    fn test_parse_float_rejects_words() {
        let field = FieldSchema::new("--epsilon", "Epsilon", FieldKind::Float);
        assert_eq!(
            FieldValue::parse_for(&field, "abc").unwrap_err(),
            FieldValueError::NotANumber
        );
        assert_eq!(
            FieldValue::parse_for(&field, "0.25").unwrap(),
            FieldValue::Float(0.25)
        );
    }

    #[test]
    fn test_parse_select_requires_known_option() {
        let field = FieldSchema::new("--profile", "Profile", FieldKind::Select)
            .with_options(["default", "extended"]);
        assert_eq!(
            FieldValue::parse_for(&field, "extended").unwrap(),
            FieldValue::Select("extended".into())
        );
        let err = FieldValue::parse_for(&field, "other").unwrap_err();
        assert_eq!(err.to_string(), "'other' is not an available option.");
    }

    #[test_case("yes", true)]
    #[test_case("On", true)]
    #[test_case("1", true)]
    #[test_case("TRUE", true)]
    #[test_case("no", false)]
    #[test_case("maybe", false)]
    fn test_parse_checkbox(text: &str, expected: bool) {
        let field = FieldSchema::new("--SN", "SN", FieldKind::Checkbox);
        assert_eq!(
            FieldValue::parse_for(&field, text).unwrap(),
            FieldValue::Bool(expected)
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(FieldValue::Text("  ".into()).is_empty());
        assert!(FieldValue::Path(String::new()).is_empty());
        assert!(!FieldValue::Int(0).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
    }

    #[test]
    fn test_as_arg() {
        assert_eq!(FieldValue::Text(" alice ".into()).as_arg(), "alice");
        assert_eq!(FieldValue::Float(0.1).as_arg(), "0.1");
        assert_eq!(FieldValue::Int(-7).as_arg(), "-7");
    }

    #[test]
    fn test_schema_from_toml() {
        let field: FieldSchema = toml::from_str(
            r#"
            key = "--threshold"
            label = "Threshold"
            type = "int"
            default = 50
            min = 0
            max = 100
            "#,
        )
        .unwrap();
        assert_eq!(field.kind, FieldKind::Int);
        assert_eq!(field.default, Some(DefaultValue::Int(50)));
        assert_eq!(field.int_bounds(), (0, 100));
        assert!(!field.required);
    }
}
