#![forbid(unsafe_code)]

//! Form state controller for formwork.
//!
//! A [`Form`] keeps canonical form state ([`BaseFormState`]: values, error
//! map, per-field meta, submission flags) in a store and exposes a derived,
//! read-only [`FormState`] that UI code observes. Values are addressed by
//! [`FieldPath`](formwork_path::FieldPath), so nested objects and arrays are
//! updated without copying untouched data.
//!
//! Validation and submission are left to collaborators: the form stores
//! [`ValidatorDescriptor`]s and exposes the error-map setters validators
//! write through, but never runs anything itself.
//!
//! # Feature flags
//!
//! - `toml-config` (default): [`FormOptions::from_toml_str`] and `.toml`
//!   support in [`FormOptions::from_path`].

pub mod error;
pub mod form;
pub mod meta;
pub mod options;
pub mod state;

pub use error::ConfigError;
pub use form::Form;
pub use meta::{FieldMeta, UpdateMetaOptions};
pub use options::{
    DefaultState, FormOptions, ValidationEvent, ValidationScope, ValidatorDescriptor,
};
pub use state::{BaseFormState, ErrorMap, Errors, FormState, get_default_form_state};
