#![forbid(unsafe_code)]

//! The form controller.
//!
//! A [`Form`] owns one [`Store<BaseFormState>`] and one
//! [`Derived<FormState>`] computed from it. All mutations go through the
//! form's methods; each replaces the base state with a new value that shares
//! every untouched part with the old one. Multi-step mutations run inside a
//! single batch, so the derived state recomputes once per call.
//!
//! # Lifecycle
//!
//! The derived state is computed once at construction. Call [`Form::mount`]
//! to keep it current; release the returned guard to stop tracking. While
//! unmounted, [`Form::state`] returns the last projection it computed, and
//! [`Form::base_state`] always returns the canonical state.
//!
//! # Invariants
//!
//! 1. `set_field_value` recomputes the derived state exactly once while
//!    mounted, whether or not it also updates meta.
//! 2. Meta entries are created on first write and never removed.
//! 3. `update` only rewrites state that derives from options when the form is
//!    untouched and the relevant option changed by value.
//! 4. `reset` always restores the state built from the current options.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formwork_path::{FieldPath, Value, get_by_path, set_by_path};
use formwork_reactive::{Derived, MountGuard, Store, Subscription, batch};
use tracing::{debug, debug_span, trace};
use uuid::Uuid;

use crate::meta::{FieldMeta, UpdateMetaOptions};
use crate::options::{DefaultState, FormOptions};
use crate::state::{BaseFormState, ErrorMap, Errors, FormState, get_default_form_state};

/// One form instance.
///
/// `Form` is a cheap handle; clones control the same form.
///
/// # Example
///
/// ```
/// use formwork_core::{Form, FormOptions, UpdateMetaOptions};
/// use formwork_path::Value;
///
/// let form = Form::new(FormOptions::new(Value::from_entries([
///     ("first_name", Value::from("")),
///     ("age", Value::from(0)),
/// ])));
/// let _mounted = form.mount();
///
/// form.set_field_value("age", |_| Value::from(30), UpdateMetaOptions::default());
///
/// let state = form.state();
/// assert_eq!(state.values.get("age"), Some(&Value::from(30)));
/// assert!(state.is_touched);
/// assert!(form.get_field_meta("age").is_dirty);
/// ```
#[derive(Clone)]
pub struct Form {
    form_id: Rc<str>,
    options: Rc<RefCell<FormOptions>>,
    base: Store<BaseFormState>,
    state: Derived<FormState>,
}

impl Form {
    pub fn new(options: FormOptions) -> Self {
        let form_id: Rc<str> = match &options.form_id {
            Some(id) => Rc::from(id.as_str()),
            None => Rc::from(Uuid::new_v4().to_string()),
        };
        let defaults = options.default_state.clone().unwrap_or_default();
        let base = Store::new(get_default_form_state(
            &defaults,
            options.default_values.clone(),
        ));
        let state = Derived::new((base.clone(),), |input| {
            FormState::project(&input.curr_deps.0)
        });
        debug!(form_id = %form_id, "form created");

        Self {
            form_id,
            options: Rc::new(RefCell::new(options)),
            base,
            state,
        }
    }

    /// Stable id: the configured one, or a generated UUID v4.
    #[must_use]
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Snapshot of the current options.
    #[must_use]
    pub fn options(&self) -> FormOptions {
        self.options.borrow().clone()
    }

    /// The derived form state.
    #[must_use]
    pub fn state(&self) -> FormState {
        self.state.state()
    }

    /// The canonical base state.
    #[must_use]
    pub fn base_state(&self) -> BaseFormState {
        self.base.get()
    }

    /// Start keeping the derived state current.
    pub fn mount(&self) -> MountGuard {
        self.state.mount()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state.is_mounted()
    }

    /// Observe every recomputation of the derived state.
    pub fn subscribe(&self, callback: impl Fn(&FormState) + 'static) -> Subscription {
        self.state.subscribe(callback)
    }

    /// Replace the options, refreshing default-derived state when it is safe.
    ///
    /// State is rebuilt only when `default_state` or `default_values`
    /// changed by value and no field has been touched yet. Changed
    /// `default_state` fields are laid over the current state; changed
    /// `default_values` replace the current values. `Value::Null` as
    /// `default_values` means "no values given": the stored options take
    /// it, but the current values are kept.
    pub fn update(&self, options: FormOptions) {
        let _span = debug_span!("form_update", form_id = %self.form_id).entered();

        let next_state = options.default_state.clone();
        let next_values = options.default_values.clone();
        let previous = self.options.replace(options);

        let touched = self.base.with(BaseFormState::is_touched);
        let update_state = !touched && next_state != previous.default_state;
        let update_values =
            !touched && !next_values.is_null() && next_values != previous.default_values;
        debug!(touched, update_state, update_values, "form options replaced");

        if !update_state && !update_values {
            return;
        }

        batch(|| {
            self.base.set_state(|current| {
                let mut defaults = DefaultState::from_base(current);
                if update_state && let Some(patch) = &next_state {
                    defaults = defaults.overlay(patch);
                }
                let values = if update_values {
                    next_values
                } else {
                    current.values.clone()
                };
                get_default_form_state(&defaults, values)
            });
        });
    }

    /// Restore the state built from the current options.
    pub fn reset(&self) {
        let (defaults, values) = {
            let options = self.options.borrow();
            (
                options.default_state.clone().unwrap_or_default(),
                options.default_values.clone(),
            )
        };
        debug!(form_id = %self.form_id, "form reset");
        self.base.set_state(|_| get_default_form_state(&defaults, values));
    }

    /// Replace the meta at `path` with `updater(current)`.
    pub fn set_field_meta(
        &self,
        path: impl Into<FieldPath>,
        updater: impl FnOnce(FieldMeta) -> FieldMeta,
    ) {
        let path = path.into();
        self.base.set_state(|prev| {
            let meta = updater(prev.field_meta(&path));
            let mut next = prev.clone();
            next.field_meta_base.insert(path, meta);
            next
        });
    }

    /// Replace the value at `path` with `updater(current)`.
    ///
    /// Unless `opts.dont_update_meta`, the field is also marked touched and
    /// dirty. Both writes land in one batch.
    pub fn set_field_value(
        &self,
        path: impl Into<FieldPath>,
        updater: impl FnOnce(Option<&Value>) -> Value,
        opts: UpdateMetaOptions,
    ) {
        let path = path.into();
        trace!(form_id = %self.form_id, %path, meta = !opts.dont_update_meta, "set field value");
        batch(|| {
            if !opts.dont_update_meta {
                self.set_field_meta(&path, FieldMeta::touched_and_dirty);
            }
            self.base.set_state(|prev| BaseFormState {
                values: set_by_path(&prev.values, &path, updater),
                ..prev.clone()
            });
        });
    }

    /// Current value at `path`, read from the base state.
    #[must_use]
    pub fn get_field_value(&self, path: impl Into<FieldPath>) -> Option<Value> {
        let path = path.into();
        self.base.with(|state| get_by_path(&state.values, &path).cloned())
    }

    /// Current meta at `path`; the default when the field has none yet.
    #[must_use]
    pub fn get_field_meta(&self, path: impl Into<FieldPath>) -> FieldMeta {
        let path = path.into();
        self.base.with(|state| state.field_meta(&path))
    }

    /// Replace the error map with `updater(current)`.
    pub fn set_error_map(&self, updater: impl FnOnce(&ErrorMap) -> ErrorMap) {
        self.base.set_state(|prev| BaseFormState {
            error_map: updater(&prev.error_map),
            ..prev.clone()
        });
    }

    /// Set the errors for one field. An empty list clears the entry.
    pub fn set_field_errors(
        &self,
        path: impl Into<FieldPath>,
        errors: impl IntoIterator<Item = Value>,
    ) {
        let path = path.into();
        let errors: Errors = errors.into_iter().collect();
        self.set_error_map(|prev| {
            let mut next = prev.clone();
            if errors.is_empty() {
                next.fields.remove(&path);
            } else {
                next.fields.insert(path, errors);
            }
            next
        });
    }

    /// Set the form-level errors.
    pub fn set_form_errors(&self, errors: impl IntoIterator<Item = Value>) {
        let errors: Errors = errors.into_iter().collect();
        self.set_error_map(|prev| ErrorMap {
            form: errors,
            fields: prev.fields.clone(),
        });
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("form_id", &self.form_id)
            .field("mounted", &self.is_mounted())
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn signup() -> FormOptions {
        FormOptions::new(Value::from_entries([
            ("first_name", Value::from("")),
            ("age", Value::from(0)),
        ]))
    }

    fn recompute_counter(form: &Form) -> (Rc<Cell<usize>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = form.subscribe(move |_| h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn generated_form_ids_are_unique() {
        let a = Form::new(signup());
        let b = Form::new(signup());
        assert_ne!(a.form_id(), b.form_id());
        assert_eq!(a.form_id().len(), 36);
    }

    #[test]
    fn configured_form_id_is_kept() {
        let form = Form::new(signup().with_form_id("signup"));
        assert_eq!(form.form_id(), "signup");
    }

    #[test]
    fn state_is_computed_at_construction() {
        let form = Form::new(signup());
        let state = form.state();
        assert_eq!(state.values, signup().default_values);
        assert!(!state.is_touched);
        assert!(!form.is_mounted());
    }

    #[test]
    fn set_field_value_recomputes_once() {
        let form = Form::new(signup());
        let _mounted = form.mount();
        let (hits, _sub) = recompute_counter(&form);

        form.set_field_value("age", |_| Value::from(1), UpdateMetaOptions::default());
        assert_eq!(hits.get(), 1);
        assert_eq!(form.get_field_value("age"), Some(Value::from(1)));
    }

    #[test]
    fn set_field_value_creates_nested_containers() {
        let form = Form::new(signup());
        let _mounted = form.mount();
        form.set_field_value(
            "address.lines[1]",
            |_| Value::from("Flat 2"),
            UpdateMetaOptions::default(),
        );
        assert_eq!(
            form.get_field_value("address.lines"),
            Some(Value::from(vec![Value::Null, Value::from("Flat 2")]))
        );
        assert!(form.get_field_meta("address.lines.1").is_touched);
    }

    #[test]
    fn updater_sees_current_value() {
        let form = Form::new(signup());
        form.set_field_value(
            "age",
            |prev| Value::from(prev.and_then(Value::as_i64).unwrap_or(0) + 5),
            UpdateMetaOptions::silent(),
        );
        assert_eq!(form.get_field_value("age"), Some(Value::from(5)));
        assert_eq!(form.get_field_meta("age"), FieldMeta::default());
    }

    #[test]
    fn set_field_meta_preserves_other_fields() {
        let form = Form::new(signup());
        form.set_field_meta("age", |meta| FieldMeta {
            is_blurred: true,
            ..meta
        });
        form.set_field_meta("first_name", |meta| FieldMeta {
            is_validating: true,
            ..meta
        });
        let base = form.base_state();
        assert!(base.field_meta(&"age".into()).is_blurred);
        assert!(base.field_meta(&"first_name".into()).is_validating);
        assert_eq!(base.values, signup().default_values);
    }

    #[test]
    fn error_setters() {
        let form = Form::new(signup());
        let _mounted = form.mount();
        form.set_form_errors([Value::from("form invalid")]);
        form.set_field_errors("age", [Value::from("too young")]);

        let state = form.state();
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.error_map.field(&"age".into()).len(), 1);

        form.set_field_errors("age", Vec::new());
        assert!(form.state().error_map.fields.is_empty());
        assert_eq!(form.state().errors.len(), 1);
    }

    #[test]
    fn update_without_changes_keeps_state() {
        let form = Form::new(signup());
        let _mounted = form.mount();
        form.set_field_meta("age", |meta| FieldMeta {
            is_blurred: true,
            ..meta
        });
        let (hits, _sub) = recompute_counter(&form);

        form.update(signup());
        assert_eq!(hits.get(), 0);
        assert!(form.get_field_meta("age").is_blurred);
    }

    #[test]
    fn update_overlays_changed_default_state() {
        let form = Form::new(signup());
        let _mounted = form.mount();
        form.set_form_errors([Value::from("kept")]);

        form.update(signup().with_default_state(DefaultState {
            submission_attempts: Some(2),
            ..DefaultState::default()
        }));
        let state = form.state();
        assert_eq!(state.submission_attempts, 2);
        assert_eq!(state.errors.len(), 1, "fields not in the patch are kept");
    }

    #[test]
    fn update_always_replaces_options() {
        let form = Form::new(signup());
        form.set_field_value("age", |_| Value::from(3), UpdateMetaOptions::default());
        form.update(signup().with_form_id("renamed"));
        assert_eq!(form.options().form_id.as_deref(), Some("renamed"));
    }

    #[test]
    fn debug_includes_form_id() {
        let form = Form::new(signup().with_form_id("dbg"));
        assert!(format!("{form:?}").contains("dbg"));
    }
}
