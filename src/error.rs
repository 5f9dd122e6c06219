//! Defines the engine error and its source position.
use std::fmt;

/// Error type covering every failure class of the engine.
///
/// Each variant carries enough context to be surfaced to the user verbatim;
/// there is no retry path, since every failure is a deterministic function
/// of the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Free-form error with optional source line.
    Message { msg: String, line: Option<usize> },
    /// A format that mandates a canonical section order saw a header out of
    /// that order. Fatal for the document.
    OutOfOrder {
        header: String,
        line: usize,
        expected: Vec<String>,
    },
    /// Polymorphic resolution found no subtype accepting the discriminator
    /// value.
    UnknownDiscriminator {
        abstract_name: String,
        value: String,
        identifier: Option<String>,
    },
    /// Input keys matched no declared field or alias and the model's policy
    /// is to reject them. All offenders for the section are listed at once.
    UnknownKeys { section: String, keys: Vec<String> },
    /// One or more structural validation rules failed. Independent problems
    /// are aggregated; `problems` holds one message per violated rule.
    Validation {
        object: String,
        identifier: Option<String>,
        problems: Vec<String>,
    },
    /// A list field's length disagrees with its declared count field.
    LengthMismatch {
        count_field: String,
        list_field: String,
        expected: usize,
        actual: usize,
        identifier: Option<String>,
    },
}

impl Error {
    /// Construct a `Message` error with no known line.
    ///
    /// Called by:
    /// - Scalar conversion and binding helpers throughout the crate.
    pub(crate) fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            line: None,
        }
    }

    /// Attach a concrete source line to this error and return it.
    ///
    /// Only `Message` carries an optional line; the structured variants fix
    /// their position at construction time.
    #[allow(dead_code)]
    pub(crate) fn with_line(mut self, set_line: usize) -> Self {
        if let Error::Message { line, .. } = &mut self {
            *line = Some(set_line);
        }
        self
    }

    /// If the error has a known source line, return it.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Message { line, .. } => *line,
            Error::OutOfOrder { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message { msg, line } => fmt_with_line(f, msg, line),
            Error::OutOfOrder {
                header,
                line,
                expected,
            } => write!(
                f,
                "section [{header}] at line {line} violates the mandated order: {}",
                expected.join(", ")
            ),
            Error::UnknownDiscriminator {
                abstract_name,
                value,
                identifier,
            } => {
                write!(f, "no subtype of {abstract_name} accepts type \"{value}\"")?;
                if let Some(id) = identifier {
                    write!(f, " (object: {id})")?;
                }
                Ok(())
            }
            Error::UnknownKeys { section, keys } => {
                write!(f, "unknown keywords in [{section}]: {}", keys.join(", "))
            }
            Error::Validation {
                object,
                identifier,
                problems,
            } => {
                write!(f, "{object}")?;
                if let Some(id) = identifier {
                    write!(f, " \"{id}\"")?;
                }
                write!(f, " is invalid: {}", problems.join("; "))
            }
            Error::LengthMismatch {
                count_field,
                list_field,
                expected,
                actual,
                identifier,
            } => {
                if let Some(id) = identifier {
                    write!(f, "\"{id}\": ")?;
                }
                write!(
                    f,
                    "{list_field} holds {actual} value(s) but {count_field} requires {expected}"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Print a message optionally suffixed with "at line X".
fn fmt_with_line(f: &mut fmt::Formatter<'_>, msg: &str, line: &Option<usize>) -> fmt::Result {
    if let Some(line) = line {
        write!(f, "{msg} at line {line}")
    } else {
        write!(f, "{msg}")
    }
}
