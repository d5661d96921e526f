// Parameter form model
// Holds the live values of a script's parameters and turns them into CLI arguments

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::field::{FieldKind, FieldSchema, FieldValue, FieldValueError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Focus a form field to paste into.")]
    NoTargetField,
    #[error("Select text in the Log pane first.")]
    EmptySelection,
    #[error(transparent)]
    InvalidValue(#[from] FieldValueError),
}

/// A schema entry paired with its current value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    pub schema: FieldSchema,
    pub value: FieldValue,
}

impl FieldBinding {
    pub fn new(schema: FieldSchema) -> Self {
        let value = schema.initial_value();
        Self { schema, value }
    }

    /// Key used to store this field in templates
    pub fn storage_key(&self) -> &str {
        if self.schema.key.is_empty() {
            self.schema.display_label()
        } else {
            &self.schema.key
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterForm {
    bindings: Vec<FieldBinding>,
}

impl ParameterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_schema(schema: &[FieldSchema]) -> Self {
        let mut form = Self::new();
        form.build(schema);
        form
    }

    /// Replace all fields with fresh bindings for the given schema
    pub fn build(&mut self, schema: &[FieldSchema]) {
        self.bindings = schema.iter().cloned().map(FieldBinding::new).collect();
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Restore every field to its initial value
    pub fn reset(&mut self) {
        for binding in &mut self.bindings {
            binding.value = binding.schema.initial_value();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut [FieldBinding] {
        &mut self.bindings
    }

    pub fn binding(&self, index: usize) -> Option<&FieldBinding> {
        self.bindings.get(index)
    }

    pub fn set_value(&mut self, index: usize, value: FieldValue) -> bool {
        match self.bindings.get_mut(index) {
            Some(binding) if value.fits(binding.schema.kind) => {
                binding.value = value;
                true
            }
            _ => false,
        }
    }

    /// Messages for every required field that has no value
    pub fn validate(&self) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| b.schema.required && b.value.is_empty())
            .map(|b| format!("'{}' is required.", b.schema.display_label()))
            .collect()
    }

    /// Arguments in schema order.
    ///
    /// Keyed fields produce `key value`, even when the value is empty;
    /// checkboxes produce `key` only when checked. Empty positional values
    /// are left out since nothing would mark their place.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for binding in &self.bindings {
            let key = binding.schema.key.trim();
            match (&binding.value, key.is_empty()) {
                (FieldValue::Bool(checked), false) => {
                    if *checked {
                        args.push(key.to_string());
                    }
                }
                (FieldValue::Bool(_), true) => {}
                (value, false) => {
                    args.push(key.to_string());
                    args.push(value.as_arg());
                }
                (value, true) => {
                    if !value.is_empty() {
                        args.push(value.as_arg());
                    }
                }
            }
        }
        args
    }

    /// The field that receives a paste when the user did not pick one:
    /// the first required field, otherwise the first field.
    pub fn fallback_target(&self) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| b.schema.required)
            .or(if self.bindings.is_empty() { None } else { Some(0) })
    }

    /// Paste text into a field, parsing it for the field's kind.
    /// Returns the index that was updated.
    pub fn paste(&mut self, target: Option<usize>, text: &str) -> Result<usize, FormError> {
        let normalized = normalize_selection(text);
        if normalized.is_empty() {
            return Err(FormError::EmptySelection);
        }

        let index = target
            .filter(|i| *i < self.bindings.len())
            .or_else(|| self.fallback_target())
            .ok_or(FormError::NoTargetField)?;

        let binding = &mut self.bindings[index];
        binding.value = FieldValue::parse_for(&binding.schema, &normalized)?;
        Ok(index)
    }

    /// Current values keyed by field key (label for positional fields)
    pub fn values_snapshot(&self) -> BTreeMap<String, FieldValue> {
        self.bindings
            .iter()
            .map(|b| (b.storage_key().to_string(), b.value.clone()))
            .collect()
    }

    /// Apply stored values. Unknown keys and values of the wrong type are skipped.
    /// Returns how many fields were updated.
    pub fn apply_snapshot(&mut self, values: &BTreeMap<String, FieldValue>) -> usize {
        let mut applied = 0;
        for binding in &mut self.bindings {
            let Some(value) = values.get(binding.storage_key()) else {
                continue;
            };
            if !value.fits(binding.schema.kind) {
                log::debug!(
                    "Skipping stored value for '{}': type does not match {}",
                    binding.storage_key(),
                    binding.schema.kind.as_str()
                );
                continue;
            }
            if let (FieldValue::Select(selected), FieldKind::Select) = (value, binding.schema.kind) {
                if !binding.schema.options.contains(selected) {
                    continue;
                }
            }
            binding.value = value.clone();
            applied += 1;
        }
        applied
    }
}

/// Some widgets hand out selections with U+2029 paragraph separators
fn normalize_selection(text: &str) -> String {
    text.replace('\u{2029}', "\n").trim().to_string()
}
