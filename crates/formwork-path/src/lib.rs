#![forbid(unsafe_code)]

//! Structurally-shared values and path addressing for formwork.
//!
//! - [`Value`]: a JSON-like tree whose containers are shared on clone.
//! - [`FieldPath`]: an address into a `Value` (`"items[0].qty"`).
//! - [`get_by_path`] / [`set_by_path`]: pure read and copy-on-write update.
//!
//! Nothing in this crate mutates a `Value` in place. Writes return a new
//! root that shares every untouched subtree with the old one, which is what
//! lets the form store replace its whole state on each mutation cheaply.

pub mod access;
pub mod path;
pub mod value;

pub use access::{MAX_PADDED_INDEX, get_by_path, set_by_path};
pub use path::{FieldPath, Segment};
pub use value::{Map, Value};
