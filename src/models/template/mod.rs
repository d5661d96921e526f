// Argument Template model
// Stores reusable parameter values for a script

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::models::field::FieldValue;

/// Saved parameter values for quick re-use
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentTemplate {
    pub id: Option<i64>,
    pub name: String,
    pub script_name: String,
    pub values: BTreeMap<String, FieldValue>,
    /// Custom arguments typed next to the form
    pub extra_args: String,
    pub main_path: Option<String>,
    pub created_at: Option<DateTime<Local>>,
}

impl ArgumentTemplate {
    /// Create a new template with required fields
    pub fn new(name: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            script_name: script_name.into(),
            values: BTreeMap::new(),
            extra_args: String::new(),
            main_path: None,
            created_at: None,
        }
    }

    /// Create a builder for constructing templates
    pub fn builder() -> ArgumentTemplateBuilder {
        ArgumentTemplateBuilder::new()
    }

    /// Validate the template
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Template name cannot be empty".to_string());
        }

        if self.script_name.trim().is_empty() {
            return Err("Template must belong to a script".to_string());
        }

        if self.name.len() > 100 {
            return Err("Template name cannot exceed 100 characters".to_string());
        }

        Ok(())
    }
}

/// Builder for creating argument templates
#[derive(Default)]
pub struct ArgumentTemplateBuilder {
    name: Option<String>,
    script_name: Option<String>,
    values: BTreeMap<String, FieldValue>,
    extra_args: String,
    main_path: Option<String>,
}

impl ArgumentTemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = Some(script_name.into());
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn values(mut self, values: BTreeMap<String, FieldValue>) -> Self {
        self.values = values;
        self
    }

    pub fn extra_args(mut self, extra_args: impl Into<String>) -> Self {
        self.extra_args = extra_args.into();
        self
    }

    pub fn main_path(mut self, main_path: impl Into<String>) -> Self {
        self.main_path = Some(main_path.into());
        self
    }

    pub fn build(self) -> Result<ArgumentTemplate, String> {
        let name = self.name.ok_or("Template name is required")?;
        let script_name = self.script_name.ok_or("Script name is required")?;

        let template = ArgumentTemplate {
            id: None,
            name,
            script_name,
            values: self.values,
            extra_args: self.extra_args,
            main_path: self.main_path,
            created_at: None,
        };

        template.validate()?;
        Ok(template)
    }
}
