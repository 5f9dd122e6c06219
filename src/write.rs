//! Inverse of the flattener/binder: typed objects back into [`Section`]s,
//! and the thin text formatter that turns a [`Document`] into lines.
//!
//! Field iteration follows the model's declared field order, never the
//! input order and never alphabetical. Conversion rules: booleans as
//! `0`/`1`, lists joined with the same delimiter-resolution rule the binder
//! splits with, enums as their literal value (models emit `Value::Str`),
//! floats per the caller's format spec (shortest round-trip form when
//! unset), file references in the requested path style, unset fields as
//! empty properties unless `skip_empty` is on.

use serde::{Deserialize, Serialize};

use crate::binder::Model;
use crate::document::{Document, Property, Section, SectionItem};
use crate::error::Error;
use crate::schema::canonical_key;
use crate::value::{PathStyle, Value, push_float_string};

/// Serialization configuration.
///
/// Construct via [`write_options!`](crate::write_options!):
///
/// ```rust
/// use inibind::PathStyle;
///
/// let options = inibind::write_options! {
///     float_format: Some("%.3f".to_string()),
///     path_style: PathStyle::Unix,
/// };
/// assert!(!options.skip_empty);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteOptions {
    /// printf-style float format spec, `%[width][.precision][f|e|g]`.
    /// Unset means shortest round-trip form.
    pub float_format: Option<String>,
    /// Skip properties whose value is unset or renders empty.
    pub skip_empty: bool,
    /// Separator style for serialized file references.
    pub path_style: PathStyle,
    /// Column the `=` is aligned to; 0 disables alignment.
    pub key_column: usize,
    /// Delimiter for list values of unknown-but-kept keys, which have no
    /// field spec to resolve a delimiter from.
    pub extras_delimiter: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            float_format: None,
            skip_empty: false,
            path_style: PathStyle::Native,
            key_column: 0,
            extras_delimiter: " ".to_string(),
        }
    }
}

/// Parsed float format spec: `%[width][.precision][f|e|g]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloatFormat {
    width: usize,
    precision: Option<usize>,
    style: FloatStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FloatStyle {
    Fixed,
    Scientific,
    Shortest,
}

impl FloatFormat {
    /// Parse a spec string. `%.3f`, `%10.3f`, `%15.6e` and `%g` are the
    /// shapes the model suite's dialects use.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let body = spec.strip_prefix('%').unwrap_or(spec);
        let (body, style) = match body.chars().last() {
            Some('f') => (&body[..body.len() - 1], FloatStyle::Fixed),
            Some('e') => (&body[..body.len() - 1], FloatStyle::Scientific),
            Some('g') => (&body[..body.len() - 1], FloatStyle::Shortest),
            _ => {
                return Err(Error::msg(format!(
                    "float format \"{spec}\" must end in f, e or g"
                )));
            }
        };
        let (width_text, precision) = match body.split_once('.') {
            Some((w, p)) => (
                w,
                Some(p.parse::<usize>().map_err(|_| {
                    Error::msg(format!("float format \"{spec}\": bad precision"))
                })?),
            ),
            None => (body, None),
        };
        let width = if width_text.is_empty() {
            0
        } else {
            width_text
                .parse::<usize>()
                .map_err(|_| Error::msg(format!("float format \"{spec}\": bad width")))?
        };
        Ok(Self {
            width,
            precision,
            style,
        })
    }

    pub fn format(&self, f: f64) -> String {
        let text = match (self.style, self.precision) {
            (FloatStyle::Fixed, Some(p)) => format!("{f:.p$}"),
            (FloatStyle::Fixed, None) => {
                let mut s = String::new();
                push_float_string(&mut s, f);
                s
            }
            (FloatStyle::Scientific, Some(p)) => format!("{f:.p$e}"),
            (FloatStyle::Scientific, None) => format!("{f:e}"),
            (FloatStyle::Shortest, _) => {
                let mut s = String::new();
                push_float_string(&mut s, f);
                s
            }
        };
        if text.len() < self.width {
            format!("{text:>width$}", width = self.width)
        } else {
            text
        }
    }
}

/// Serialize one typed object into a section.
///
/// Pure over the object's current state: calling it twice on an unmodified
/// object yields identical content.
pub fn to_section<T: Model>(model: &T, options: &WriteOptions) -> Result<Section, Error> {
    let schema = T::schema();
    let float_format = match &options.float_format {
        Some(spec) => Some(FloatFormat::parse(spec)?),
        None => None,
    };
    let mut fields = model.to_fields();
    let comments = model.comments();
    let mut section = Section::new(schema.header);

    for spec in &schema.fields {
        let value = fields.remove(&canonical_key(spec.canonical));
        let text = match &value {
            Some(v) => value_text(v, schema.delimiter_for(spec), float_format.as_ref(), options),
            None => String::new(),
        };
        if text.is_empty() && options.skip_empty {
            continue;
        }
        let comment = comments
            .and_then(|c| c.get(spec.canonical))
            .map(str::to_string);
        let property = Property::new(
            spec.key(),
            if text.is_empty() { None } else { Some(text) },
        )
        .with_comment(comment);
        section.push_property(property);
    }

    // Unknown-but-allowed keys reappear after the declared fields, in the
    // order they were first seen.
    for (key, value) in &fields {
        if crate::schema::RESERVED_KEYS.contains(&key) {
            continue;
        }
        let text = value_text(value, &options.extras_delimiter, float_format.as_ref(), options);
        if text.is_empty() && options.skip_empty {
            continue;
        }
        section.push_property(Property::new(
            key,
            if text.is_empty() { None } else { Some(text) },
        ));
    }

    Ok(section)
}

/// Serialize a run of same-typed objects into one document, one section
/// per object (the repeated-block layout of definition files).
pub fn to_document<T: Model>(models: &[T], options: &WriteOptions) -> Result<Document, Error> {
    let mut document = Document::new();
    for model in models {
        document.sections.push(to_section(model, options)?);
    }
    Ok(document)
}

fn value_text(
    value: &Value,
    delimiter: &str,
    float_format: Option<&FloatFormat>,
    options: &WriteOptions,
) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => match float_format {
            Some(format) => format.format(*f),
            None => {
                let mut s = String::new();
                push_float_string(&mut s, *f);
                s
            }
        },
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Path(p) => p.styled(options.path_style),
        Value::List(items) => {
            let joiner = if delimiter.trim().is_empty() {
                " "
            } else {
                delimiter
            };
            items
                .iter()
                .map(|item| value_text(item, delimiter, float_format, options))
                .collect::<Vec<_>>()
                .join(joiner)
        }
        Value::Map(_) => String::new(),
    }
}

/// Render a document back into text. The writer is deliberately thin: the
/// structure carries everything, this only formats lines.
pub fn render(document: &Document, options: &WriteOptions) -> String {
    let mut out = String::new();
    for block in &document.header_comment {
        for line in &block.lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    if !document.header_comment.is_empty() {
        out.push('\n');
    }
    for (idx, section) in document.sections.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        render_section(&mut out, section, options);
    }
    out
}

/// Render one section: header, content in source order, datablock rows.
pub fn render_section(out: &mut String, section: &Section, options: &WriteOptions) {
    out.push('[');
    out.push_str(&section.header);
    out.push_str("]\n");
    for item in &section.content {
        match item {
            SectionItem::Property(property) => {
                let key: &str = &property.key;
                if options.key_column > 0 {
                    out.push_str(&format!(
                        "{key:<width$} = ",
                        width = options.key_column
                    ));
                } else {
                    out.push_str(key);
                    out.push_str(" = ");
                }
                if let Some(value) = &property.value {
                    out.push_str(value);
                }
                if let Some(comment) = &property.comment {
                    if property.value.is_some() {
                        out.push(' ');
                    }
                    out.push_str("# ");
                    out.push_str(comment);
                }
                // Trailing spaces from an empty value are not emitted.
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('\n');
            }
            SectionItem::Comment(block) => {
                for line in &block.lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
    if let Some(rows) = &section.datablock {
        for row in rows {
            out.push_str(&row.join(" "));
            out.push('\n');
        }
    }
}

/// Convenience: serialize models and render in one step.
pub fn render_models<T: Model>(models: &[T], options: &WriteOptions) -> Result<String, Error> {
    Ok(render(&to_document(models, options)?, options))
}
