use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Field-level validation report returned with a 400 response.
///
/// `form_errors` holds problems that cannot be pinned to one field (malformed
/// JSON, wrong value types); `field_errors` maps a dotted camelCase path such
/// as `metadata.createdBy` to its messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    pub fn field(path: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(path, message);
        errors
    }

    pub fn add(&mut self, path: &str, message: impl Into<String>) {
        self.field_errors
            .entry(path.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let name = to_camel_case(field);
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, name),
                None => name,
            };

            match kind {
                ValidationErrorsKind::Field(field_errors) => {
                    for error in field_errors {
                        self.add(&path, describe(error));
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(Some(&path), nested),
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        self.collect(Some(&format!("{}.{}", path, index)), nested);
                    }
                }
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut report = Self::default();
        report.collect(None, &errors);
        report
    }
}

impl From<serde_json::Error> for FieldErrors {
    fn from(error: serde_json::Error) -> Self {
        Self::form(error.to_string())
    }
}

fn describe(error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match error.code.as_ref() {
        "required" => "Required".to_string(),
        "url" => "Invalid url".to_string(),
        "email" => "Invalid email".to_string(),
        "length" => match error.params.get("max") {
            Some(max) => format!("Must be at most {} characters", max),
            None => "Invalid length".to_string(),
        },
        other => format!("Invalid value ({})", other),
    }
}

/// `validator` keys errors by Rust field name and ignores serde renames, so
/// report keys are converted back to the camelCase used on the wire
fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
