#![forbid(unsafe_code)]

//! Per-field metadata.

use serde::{Deserialize, Serialize};

/// Interaction flags tracked for one field path.
///
/// An entry is created the first time a field's meta is updated and is never
/// removed; a missing entry reads as [`FieldMeta::default`] (all `false`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMeta {
    pub is_touched: bool,
    pub is_blurred: bool,
    pub is_dirty: bool,
    pub is_validating: bool,
}

impl FieldMeta {
    /// The field value has not been changed by the user.
    #[must_use]
    pub const fn is_pristine(&self) -> bool {
        !self.is_dirty
    }

    /// Copy with `is_touched` and `is_dirty` set, other flags unchanged.
    #[must_use]
    pub const fn touched_and_dirty(self) -> Self {
        Self {
            is_touched: true,
            is_dirty: true,
            ..self
        }
    }
}

/// Options for [`Form::set_field_value`](crate::Form::set_field_value).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateMetaOptions {
    /// Leave the field's meta untouched.
    pub dont_update_meta: bool,
}

impl UpdateMetaOptions {
    /// Write the value without marking the field touched or dirty.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            dont_update_meta: true,
        }
    }
}
