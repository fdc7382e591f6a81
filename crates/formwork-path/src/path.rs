#![forbid(unsafe_code)]

//! Field paths: addresses of a location inside a [`Value`](crate::Value).
//!
//! A [`FieldPath`] is a sequence of [`Segment`]s. Each segment is either an
//! object key or an array index. Paths are usually written as strings:
//!
//! | Text | Segments |
//! |------|----------|
//! | `"name"` | `[Key("name")]` |
//! | `"address.city"` | `[Key("address"), Key("city")]` |
//! | `"items[2].qty"` | `[Key("items"), Index(2), Key("qty")]` |
//! | `"items.2.qty"` | same as above |
//! | `"a\.b"` | `[Key("a.b")]` |
//!
//! Parsing never fails: `[` reads as `.`, `]` is dropped, `\` escapes the
//! next character, empty segments are skipped, and a segment made only of
//! ASCII digits becomes an index.
//!
//! # Invariants
//!
//! 1. Paths are canonical: a `FieldPath` never holds an all-digit key that
//!    fits in `usize` (it holds the `Index` instead) or an empty key, however
//!    it was built. Two paths addressing the same location compare equal.
//! 2. `FieldPath::parse(&path.to_string()) == path` for every path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Characters written with a `\` prefix inside keys.
const ESCAPED: [char; 4] = ['\\', '.', '[', ']'];

/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Object key access.
    Key(String),
    /// Array index access.
    Index(usize),
}

impl Segment {
    /// A key segment. All-digit keys become [`Segment::Index`].
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Self::Key(k.into()).canonical()
    }

    #[inline]
    pub fn index(i: usize) -> Self {
        Self::Index(i)
    }

    #[inline]
    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    fn canonical(self) -> Self {
        match self {
            Self::Key(raw) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
                match raw.parse() {
                    Ok(i) => Self::Index(i),
                    Err(_) => Self::Key(raw),
                }
            }
            other => other,
        }
    }

    fn is_empty_key(&self) -> bool {
        matches!(self, Self::Key(k) if k.is_empty())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => {
                for c in k.chars() {
                    if ESCAPED.contains(&c) {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Self::key(s)
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Self::key(s)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// A complete path into a value tree. The empty path addresses the root.
///
/// # Examples
///
/// ```
/// use formwork_path::{FieldPath, Segment};
///
/// let parsed = FieldPath::parse("users[0].name");
/// let built = FieldPath::root().key("users").key("0").key("name");
/// assert_eq!(parsed, built);
/// assert_eq!(parsed.to_string(), "users[0].name");
/// assert_eq!(parsed.segments()[1], Segment::Index(0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The empty path.
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted/bracketed path string.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut path = Self::root();
        let mut current = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => current.push(chars.next().unwrap_or('\\')),
                '.' | '[' => path.push_segment(Segment::Key(std::mem::take(&mut current))),
                ']' => {}
                _ => current.push(c),
            }
        }
        path.push_segment(Segment::Key(current));
        path
    }

    /// Build a path from segments, canonicalizing each one.
    #[must_use]
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut path = Self::root();
        for segment in segments {
            path.push_segment(segment);
        }
        path
    }

    /// Append a key segment (builder style).
    #[must_use]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.push_segment(Segment::Key(k.into()));
        self
    }

    /// Append an index segment (builder style).
    #[must_use]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Segment::Index(i));
        self
    }

    fn push_segment(&mut self, segment: Segment) {
        let segment = segment.canonical();
        if !segment.is_empty_key() {
            self.0.push(segment);
        }
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !segment.is_index() {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&String> for FieldPath {
    fn from(s: &String) -> Self {
        Self::parse(s)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

impl<const N: usize> From<[Segment; N]> for FieldPath {
    fn from(segments: [Segment; N]) -> Self {
        Self::from_segments(segments)
    }
}

impl FromIterator<Segment> for FieldPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self::from_segments(iter)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}
