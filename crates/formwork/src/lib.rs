#![forbid(unsafe_code)]

//! formwork: reactive form state.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`path`]: `Value` trees and path addressing.
//! - [`reactive`]: stores, batching and derived values.
//! - [`forms`]: the [`Form`] controller and its options.
//!
//! Most code only needs the [`prelude`].
//!
//! ```
//! use formwork::prelude::*;
//!
//! let form = Form::new(FormOptions::new(Value::from_entries([("email", "")])));
//! let _mounted = form.mount();
//! form.set_field_value("email", |_| Value::from("ada@example.com"), UpdateMetaOptions::default());
//! assert!(form.state().is_touched);
//! ```

pub use formwork_core as forms;
pub use formwork_path as path;
pub use formwork_reactive as reactive;

pub use formwork_core::{
    BaseFormState, ConfigError, DefaultState, ErrorMap, FieldMeta, Form, FormOptions, FormState,
    UpdateMetaOptions, ValidationEvent, ValidationScope, ValidatorDescriptor,
    get_default_form_state,
};
pub use formwork_path::{FieldPath, Segment, Value, get_by_path, set_by_path};
pub use formwork_reactive::{Derived, MountGuard, Store, Subscription, batch};

pub mod prelude {
    //! The types and functions most form code touches.
    pub use crate::{
        FieldMeta, FieldPath, Form, FormOptions, FormState, MountGuard, Subscription,
        UpdateMetaOptions, Value, batch, get_by_path, set_by_path,
    };
}
