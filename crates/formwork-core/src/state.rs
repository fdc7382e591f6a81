#![forbid(unsafe_code)]

//! Canonical form state and its read-only projection.
//!
//! [`BaseFormState`] is what the form's store holds. [`FormState`] is what
//! the form's derived store computes from it: the same fields plus the
//! aggregates UI code reads (`errors`, `is_touched`).
//!
//! Both use persistent `im` collections, so replacing the whole state on
//! each mutation copies only the path that changed.
//!
//! # Invariants
//!
//! 1. `FormState` is a pure function of `BaseFormState` ([`FormState::project`]).
//! 2. `FormState::errors` always equals `error_map.form`.
//! 3. `FormState::is_touched` is true iff some field meta entry is touched.

use formwork_path::{FieldPath, Value};
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use crate::meta::FieldMeta;
use crate::options::DefaultState;

/// Validation errors as produced by a validator: opaque data.
pub type Errors = Vector<Value>;

/// Form-level and per-field validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMap {
    pub form: Errors,
    pub fields: OrdMap<FieldPath, Errors>,
}

impl ErrorMap {
    /// Errors recorded for `path` (empty when none).
    #[must_use]
    pub fn field(&self, path: &FieldPath) -> Errors {
        self.fields.get(path).cloned().unwrap_or_default()
    }

    /// No form or field errors at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.values().all(Vector::is_empty)
    }
}

/// The state a form's store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseFormState {
    pub values: Value,
    pub error_map: ErrorMap,
    pub field_meta_base: OrdMap<FieldPath, FieldMeta>,
    pub is_submitting: bool,
    pub is_submitted: bool,
    pub is_validating: bool,
    pub is_submit_successful: bool,
    pub submission_attempts: u32,
}

impl BaseFormState {
    /// Meta for `path`, or the default when no entry exists yet.
    #[must_use]
    pub fn field_meta(&self, path: &FieldPath) -> FieldMeta {
        self.field_meta_base.get(path).copied().unwrap_or_default()
    }

    /// Whether any field has been touched.
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.field_meta_base.values().any(|meta| meta.is_touched)
    }
}

/// Read-only projection of [`BaseFormState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub values: Value,
    pub error_map: ErrorMap,
    pub field_meta_base: OrdMap<FieldPath, FieldMeta>,
    pub is_submitting: bool,
    pub is_submitted: bool,
    pub is_validating: bool,
    pub is_submit_successful: bool,
    pub submission_attempts: u32,
    /// Form-level errors (`error_map.form`).
    pub errors: Errors,
    /// Some field has been touched.
    pub is_touched: bool,
}

impl FormState {
    /// Compute the projection of `base`.
    #[must_use]
    pub fn project(base: &BaseFormState) -> Self {
        Self {
            values: base.values.clone(),
            error_map: base.error_map.clone(),
            field_meta_base: base.field_meta_base.clone(),
            is_submitting: base.is_submitting,
            is_submitted: base.is_submitted,
            is_validating: base.is_validating,
            is_submit_successful: base.is_submit_successful,
            submission_attempts: base.submission_attempts,
            errors: base.error_map.form.clone(),
            is_touched: base.is_touched(),
        }
    }

    #[must_use]
    pub fn field_meta(&self, path: &FieldPath) -> FieldMeta {
        self.field_meta_base.get(path).copied().unwrap_or_default()
    }
}

impl From<&BaseFormState> for FormState {
    fn from(base: &BaseFormState) -> Self {
        Self::project(base)
    }
}

/// Build a fresh base state: `default_values` as the values, every other
/// field from `default_state` or its zero value.
#[must_use]
pub fn get_default_form_state(
    default_state: &DefaultState,
    default_values: Value,
) -> BaseFormState {
    BaseFormState {
        values: default_values,
        error_map: default_state.error_map.clone().unwrap_or_default(),
        field_meta_base: default_state.field_meta_base.clone().unwrap_or_default(),
        is_submitting: default_state.is_submitting.unwrap_or(false),
        is_submitted: default_state.is_submitted.unwrap_or(false),
        is_validating: default_state.is_validating.unwrap_or(false),
        is_submit_successful: default_state.is_submit_successful.unwrap_or(false),
        submission_attempts: default_state.submission_attempts.unwrap_or(0),
    }
}
