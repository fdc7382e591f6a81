#![forbid(unsafe_code)]

//! Form options and their loaders.
//!
//! Options are plain serde data, so a form can be declared in code or loaded
//! from a JSON (or, with the `toml-config` feature, TOML) file:
//!
//! ```toml
//! form_id = "signup"
//!
//! [default_values]
//! first_name = ""
//! age = 0
//!
//! [[validation]]
//! name = "age-range"
//! triggers = ["change", "submit"]
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unreadable file | I/O error | [`ConfigError::Io`] with the path |
//! | Bad syntax or shape | Parser error | [`ConfigError::Json`] / `ConfigError::Toml` |
//! | Unknown extension | Not `.json` / `.toml` | [`ConfigError::UnsupportedFormat`] |
//! | Missing `default_values` | Required field | Parser error |

use std::path::Path;

use formwork_path::{FieldPath, Value};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::meta::FieldMeta;
use crate::state::{BaseFormState, ErrorMap};

/// Partial overrides for the non-value parts of a fresh base state.
///
/// `None` means "use the zero value" when building a state from scratch and
/// "keep the current value" when overlaid on an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_map: Option<ErrorMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_meta_base: Option<OrdMap<FieldPath, FieldMeta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_submitting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_submitted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_validating: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_submit_successful: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_attempts: Option<u32>,
}

impl DefaultState {
    /// Capture every non-value field of `base`.
    #[must_use]
    pub fn from_base(base: &BaseFormState) -> Self {
        Self {
            error_map: Some(base.error_map.clone()),
            field_meta_base: Some(base.field_meta_base.clone()),
            is_submitting: Some(base.is_submitting),
            is_submitted: Some(base.is_submitted),
            is_validating: Some(base.is_validating),
            is_submit_successful: Some(base.is_submit_successful),
            submission_attempts: Some(base.submission_attempts),
        }
    }

    /// Fields set in `other` win; the rest are kept from `self`.
    #[must_use]
    pub fn overlay(self, other: &DefaultState) -> Self {
        Self {
            error_map: other.error_map.clone().or(self.error_map),
            field_meta_base: other.field_meta_base.clone().or(self.field_meta_base),
            is_submitting: other.is_submitting.or(self.is_submitting),
            is_submitted: other.is_submitted.or(self.is_submitted),
            is_validating: other.is_validating.or(self.is_validating),
            is_submit_successful: other.is_submit_successful.or(self.is_submit_successful),
            submission_attempts: other.submission_attempts.or(self.submission_attempts),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// When a validator wants to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationEvent {
    Init,
    Change,
    Blur,
    Submit,
}

/// Whether a validator's errors belong to a field or to the whole form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScope {
    #[default]
    Field,
    Form,
}

/// Declaration of a validator. The form stores these and hands them to
/// whatever runs validation; it never executes them itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorDescriptor {
    pub name: String,
    #[serde(default)]
    pub triggers: Vec<ValidationEvent>,
    #[serde(default)]
    pub scope: ValidationScope,
}

impl ValidatorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggers: Vec::new(),
            scope: ValidationScope::default(),
        }
    }

    #[must_use]
    pub fn on(mut self, event: ValidationEvent) -> Self {
        if !self.triggers.contains(&event) {
            self.triggers.push(event);
        }
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ValidationScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Everything a [`Form`](crate::Form) is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormOptions {
    pub default_values: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state: Option<DefaultState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidatorDescriptor>,
}

impl FormOptions {
    pub fn new(default_values: impl Into<Value>) -> Self {
        Self {
            default_values: default_values.into(),
            default_state: None,
            form_id: None,
            validation: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_form_id(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    #[must_use]
    pub fn with_default_state(mut self, default_state: DefaultState) -> Self {
        self.default_state = Some(default_state);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: ValidatorDescriptor) -> Self {
        self.validation.push(validator);
        self
    }

    /// Parse options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse options from TOML text.
    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a `.json` or `.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        debug!(path = %path.display(), format = %extension, "loading form options");

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match extension.as_str() {
            "json" => Self::from_json_str(&text),
            #[cfg(feature = "toml-config")]
            "toml" => Self::from_toml_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }
}
