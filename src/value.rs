//! Scalar values exchanged between the flattener, the binder, the
//! validators and the serializer.
//!
//! At the document layer everything is text; [`Value`] is the typed form a
//! field takes once the binder has applied its declared kind. Conversion
//! back to on-disk text lives here as well so the binder and the serializer
//! agree on one rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fieldmap::FieldMap;

/// Path separator convention for serialized file references.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStyle {
    /// Keep the separators exactly as stored.
    #[default]
    Native,
    /// Forward slashes.
    Unix,
    /// Backslashes.
    Windows,
}

/// A reference to another file, kept verbatim as written in the source.
///
/// The engine never touches the file system; resolving the path to bytes is
/// the loading collaborator's job. Only the separator style is adjusted, and
/// only at serialization time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    path: String,
}

impl FileReference {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }

    /// The path exactly as it appeared in the source.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path with separators converted to the requested style.
    pub fn styled(&self, style: PathStyle) -> String {
        match style {
            PathStyle::Native => self.path.clone(),
            PathStyle::Unix => self.path.replace('\\', "/"),
            PathStyle::Windows => self.path.replace('/', "\\"),
        }
    }
}

/// A typed field value.
///
/// `Str` is the universal carrier at the document layer; the other scalar
/// variants appear once the binder has typed a field per its declared kind.
/// `Map` only occurs for the reserved `comments` sub-mapping produced by the
/// flattener.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Path(FileReference),
    List(Vec<Value>),
    Map(FieldMap),
}

impl Value {
    pub fn str<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for the "no value" marker: an empty or all-whitespace string.
    ///
    /// Fields holding this marker are dropped before typing so they fall
    /// back to their declared default instead of binding an empty value.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Str(s) if s.trim().is_empty())
    }
}

/// Render a finite or non-finite float in its shortest round-trip form.
///
/// Called by:
/// - [`Value`]'s `Display` when no caller format-spec applies.
/// - The serializer as the fallback when `float_format` is unset.
pub(crate) fn push_float_string(target: &mut String, f: f64) {
    if f.is_nan() {
        target.push_str("nan");
    } else if f.is_infinite() {
        if f.is_sign_positive() {
            target.push_str("inf");
        } else {
            target.push_str("-inf");
        }
    } else {
        let mut buf = zmij::Buffer::new();
        target.push_str(buf.format_finite(f));
    }
}

impl fmt::Display for Value {
    /// Default on-disk text form: booleans as `0`/`1`, floats in shortest
    /// round-trip form, lists joined with a single space. The serializer
    /// overrides the float and list-delimiter parts per its options; this
    /// impl is the delimiter-free baseline used in messages and tests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                let mut text = String::new();
                push_float_string(&mut text, *x);
                f.write_str(&text)
            }
            Value::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            Value::Path(p) => f.write_str(p.path()),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Map(_) => f.write_str("<map>"),
        }
    }
}
