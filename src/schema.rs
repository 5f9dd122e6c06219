//! Explicit per-type schema tables.
//!
//! Every typed model declares one [`Schema`]: an ordered list of
//! [`FieldSpec`] records (canonical name, on-disk alias, kind, default,
//! list delimiter, required flag) plus model-level policy. The binder and
//! the serializer both consult the same table, so input acceptance and
//! output spelling cannot drift apart. There is no runtime reflection;
//! schemas are built once, normally in a `LazyLock` static.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::fieldmap::FieldMap;
use crate::validate::Rule;
use crate::value::{FileReference, Value};

/// Reserved keys the unknown-keyword check never flags: the comments
/// sidecar, the trailing datablock and the section-header marker merged in
/// by the flattener.
pub const RESERVED_KEYS: [&str; 3] = ["comments", "datablock", "header"];

/// Canonical lookup form of a keyword: ASCII lower-cased with internal
/// separators (`_`, `-`, space) stripped.
///
/// Must be stable and collision-free among a model's declared fields;
/// [`SchemaBuilder::build`] asserts the latter.
pub fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// What to do with input keys matching no declared field or alias.
/// Per-model configuration, not a global switch.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownKeyPolicy {
    /// Keep them, unvalidated; they reappear on serialization.
    Allow,
    /// Discard them, collecting one warning per key.
    Drop,
    /// Reject the section, listing every offender in one message.
    #[default]
    Error,
}

/// Declared value shape of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    Path,
    List(Box<FieldKind>),
}

impl FieldKind {
    pub fn list_of(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }
}

/// One declared field: canonical name, optional distinct on-disk keyword,
/// kind, default, list delimiter and required flag.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub canonical: &'static str,
    pub alias: Option<&'static str>,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub delimiter: Option<&'static str>,
    pub required: bool,
}

impl FieldSpec {
    pub fn new(canonical: &'static str, kind: FieldKind) -> Self {
        Self {
            canonical,
            alias: None,
            kind,
            default: None,
            delimiter: None,
            required: false,
        }
    }

    /// The distinct on-disk keyword, emitted verbatim on save.
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Value the field falls back to when the input leaves it unset.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Per-field list delimiter, overriding the model default.
    pub fn delimiter(mut self, delimiter: &'static str) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The keyword written on output: the alias when declared, else the
    /// canonical name.
    pub fn key(&self) -> &'static str {
        self.alias.unwrap_or(self.canonical)
    }
}

/// Outcome of an explicit field assignment: whether the value was stored,
/// plus any unknown-keyword warnings collected along the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOutcome {
    pub applied: bool,
    pub warnings: Vec<String>,
}

/// The full declaration of one typed model.
pub struct Schema {
    pub name: &'static str,
    /// Section header this model binds to/serializes as.
    pub header: &'static str,
    pub fields: Vec<FieldSpec>,
    pub default_delimiter: &'static str,
    pub unknown_keys: UnknownKeyPolicy,
    /// Whether the model carries a comments sidecar.
    pub comments: bool,
    /// Whether repeated keys flatten into ordered lists (vs last-wins).
    pub duplicates_as_list: bool,
    /// Canonical name of the field used to identify the object in messages.
    pub identifier: Option<&'static str>,
    /// Extra per-model keys exempt from the unknown-keyword check.
    pub excluded: Vec<&'static str>,
    /// Structural validation pipeline, run in declaration order.
    pub rules: Vec<Box<dyn Rule>>,
    index: AHashMap<String, usize>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("header", &self.header)
            .field("fields", &self.fields)
            .field("unknown_keys", &self.unknown_keys)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            header: name,
            fields: Vec::new(),
            default_delimiter: " ",
            unknown_keys: UnknownKeyPolicy::default(),
            comments: false,
            duplicates_as_list: false,
            identifier: None,
            excluded: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Field spec for a canonical name or alias, in any spelling.
    pub fn resolve(&self, key: &str) -> Option<&FieldSpec> {
        self.index
            .get(&canonical_key(key))
            .map(|&idx| &self.fields[idx])
    }

    pub(crate) fn slot(&self, key: &str) -> Option<usize> {
        self.index.get(&canonical_key(key)).copied()
    }

    /// True for keys the unknown-keyword check must skip.
    pub fn is_exempt(&self, canonical: &str) -> bool {
        RESERVED_KEYS.contains(&canonical)
            || self
                .excluded
                .iter()
                .any(|e| canonical_key(e) == canonical)
    }

    /// Delimiter for a list field: its own declared delimiter if set, else
    /// the model default.
    pub fn delimiter_for(&self, spec: &FieldSpec) -> &str {
        spec.delimiter.unwrap_or(self.default_delimiter)
    }

    /// Explicit field assignment, re-running the unknown-keyword check.
    ///
    /// The value is assumed already typed. Returns the outcome with any
    /// collected warnings, or the error the model's policy demands. This is
    /// the mutation path for already-constructed objects; it never
    /// re-triggers structural validation.
    pub fn set_field(
        &self,
        fields: &mut FieldMap,
        key: &str,
        value: Value,
    ) -> Result<SetOutcome, Error> {
        let ck = canonical_key(key);
        if let Some(spec) = self.resolve(&ck) {
            fields.insert(canonical_key(spec.canonical), value);
            return Ok(SetOutcome {
                applied: true,
                warnings: Vec::new(),
            });
        }
        if self.is_exempt(&ck) {
            fields.insert(ck, value);
            return Ok(SetOutcome {
                applied: true,
                warnings: Vec::new(),
            });
        }
        match self.unknown_keys {
            UnknownKeyPolicy::Allow => {
                fields.insert(ck, value);
                Ok(SetOutcome {
                    applied: true,
                    warnings: Vec::new(),
                })
            }
            UnknownKeyPolicy::Drop => Ok(SetOutcome {
                applied: false,
                warnings: vec![format!(
                    "unknown keyword \"{key}\" dropped from [{}]",
                    self.header
                )],
            }),
            UnknownKeyPolicy::Error => Err(Error::UnknownKeys {
                section: self.header.to_string(),
                keys: vec![key.to_string()],
            }),
        }
    }

    /// Convert a raw (string) value into the field's declared kind,
    /// splitting list fields on the resolved delimiter first. Tokens are
    /// trimmed; empty tokens are dropped. Already-typed values pass through.
    pub(crate) fn type_value(&self, spec: &FieldSpec, value: Value) -> Result<Value, Error> {
        match &spec.kind {
            FieldKind::List(inner) => {
                let delimiter = self.delimiter_for(spec);
                let mut items = Vec::new();
                match value {
                    Value::Str(s) => split_into(&mut items, &s, delimiter, inner, spec)?,
                    Value::List(parts) => {
                        // Duplicate-key merging yields a list of raw strings;
                        // each occurrence may itself hold several tokens.
                        for part in parts {
                            match part {
                                Value::Str(s) => {
                                    split_into(&mut items, &s, delimiter, inner, spec)?
                                }
                                other => items.push(other),
                            }
                        }
                    }
                    other => return Ok(other),
                }
                Ok(Value::List(items))
            }
            kind => match value {
                Value::Str(s) => parse_scalar(kind, s.trim(), spec.canonical),
                other => Ok(other),
            },
        }
    }
}

fn split_into(
    items: &mut Vec<Value>,
    raw: &str,
    delimiter: &str,
    inner: &FieldKind,
    spec: &FieldSpec,
) -> Result<(), Error> {
    let tokens: Vec<&str> = if delimiter.trim().is_empty() {
        raw.split_whitespace().collect()
    } else {
        raw.split(delimiter).collect()
    };
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        items.push(parse_scalar(inner, token, spec.canonical)?);
    }
    Ok(())
}

/// Parse one textual token into a scalar of the given kind.
fn parse_scalar(kind: &FieldKind, token: &str, field: &str) -> Result<Value, Error> {
    match kind {
        FieldKind::Str => Ok(Value::str(token)),
        FieldKind::Int => token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::msg(format!("{field}: \"{token}\" is not an integer"))),
        FieldKind::Float => token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::msg(format!("{field}: \"{token}\" is not a number"))),
        FieldKind::Bool => match token.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            _ => Err(Error::msg(format!(
                "{field}: \"{token}\" is not a boolean (expected 0/1/true/false)"
            ))),
        },
        FieldKind::Path => Ok(Value::Path(FileReference::new(token))),
        // Nested lists do not occur in these dialects; a stray inner list
        // kind parses tokens as its element type.
        FieldKind::List(inner) => parse_scalar(inner, token, field),
    }
}

/// Builder for [`Schema`]; `build` freezes the table and creates the
/// canonical-key index.
pub struct SchemaBuilder {
    name: &'static str,
    header: &'static str,
    fields: Vec<FieldSpec>,
    default_delimiter: &'static str,
    unknown_keys: UnknownKeyPolicy,
    comments: bool,
    duplicates_as_list: bool,
    identifier: Option<&'static str>,
    excluded: Vec<&'static str>,
    rules: Vec<Box<dyn Rule>>,
}

impl SchemaBuilder {
    pub fn header(mut self, header: &'static str) -> Self {
        self.header = header;
        self
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn default_delimiter(mut self, delimiter: &'static str) -> Self {
        self.default_delimiter = delimiter;
        self
    }

    pub fn unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn with_comments(mut self) -> Self {
        self.comments = true;
        self
    }

    pub fn duplicates_as_list(mut self) -> Self {
        self.duplicates_as_list = true;
        self
    }

    pub fn identifier(mut self, canonical: &'static str) -> Self {
        self.identifier = Some(canonical);
        self
    }

    pub fn exclude(mut self, key: &'static str) -> Self {
        self.excluded.push(key);
        self
    }

    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Freeze the schema. Panics if two declared names/aliases collide
    /// after canonicalization; that is a programming error in the schema
    /// declaration, caught the first time the table is built.
    pub fn build(self) -> Schema {
        let mut index: AHashMap<String, usize> =
            AHashMap::with_capacity(self.fields.len() * 2);
        for (idx, spec) in self.fields.iter().enumerate() {
            let ck = canonical_key(spec.canonical);
            if let Some(&prev) = index.get(&ck) {
                if prev != idx {
                    panic!(
                        "schema {}: field \"{}\" collides with \"{}\" after canonicalization",
                        self.name, spec.canonical, self.fields[prev].canonical
                    );
                }
            }
            index.insert(ck, idx);
            if let Some(alias) = spec.alias {
                let ak = canonical_key(alias);
                if let Some(&prev) = index.get(&ak) {
                    if prev != idx {
                        panic!(
                            "schema {}: alias \"{}\" collides with field \"{}\"",
                            self.name, alias, self.fields[prev].canonical
                        );
                    }
                }
                index.insert(ak, idx);
            }
        }
        Schema {
            name: self.name,
            header: self.header,
            fields: self.fields,
            default_delimiter: self.default_delimiter,
            unknown_keys: self.unknown_keys,
            comments: self.comments,
            duplicates_as_list: self.duplicates_as_list,
            identifier: self.identifier,
            excluded: self.excluded,
            rules: self.rules,
            index,
        }
    }
}

/// Per-object comments sidecar: one optional string slot per declared
/// field, addressed by canonical name or alias.
pub struct Comments {
    schema: &'static Schema,
    slots: Vec<Option<String>>,
}

impl Comments {
    pub fn empty(schema: &'static Schema) -> Self {
        Self {
            schema,
            slots: vec![None; schema.fields.len()],
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let idx = self.schema.slot(key)?;
        self.slots[idx].as_deref()
    }

    /// Store a comment for a declared field. Returns false (and stores
    /// nothing) when the key matches no field.
    pub fn set<S: Into<String>>(&mut self, key: &str, comment: S) -> bool {
        match self.schema.slot(key) {
            Some(idx) => {
                self.slots[idx] = Some(comment.into());
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Clone for Comments {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema,
            slots: self.slots.clone(),
        }
    }
}

impl PartialEq for Comments {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.slots == other.slots
    }
}

impl fmt::Debug for Comments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comments")
            .field("schema", &self.schema.name)
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder("Sample")
            .field(FieldSpec::new("branch_id", FieldKind::Str).alias("branchId"))
            .field(
                FieldSpec::new("levels", FieldKind::list_of(FieldKind::Float)).delimiter(";"),
            )
            .field(FieldSpec::new("count", FieldKind::Int).default_value(Value::Int(0)))
            .build()
    }

    #[test]
    fn canonicalization_strips_separators_and_case() {
        assert_eq!(canonical_key("Branch_Id"), "branchid");
        assert_eq!(canonical_key("branch id"), "branchid");
        assert_eq!(canonical_key("branch-id"), "branchid");
    }

    #[test]
    fn resolve_accepts_both_spellings() {
        let schema = sample();
        assert!(schema.resolve("branchId").is_some());
        assert!(schema.resolve("branch_id").is_some());
        assert!(schema.resolve("BRANCHID").is_some());
        assert!(schema.resolve("nope").is_none());
    }

    #[test]
    fn list_splitting_uses_field_delimiter_and_drops_empties() {
        let schema = sample();
        let spec = schema.resolve("levels").unwrap();
        let typed = schema
            .type_value(spec, Value::str("1.0; 2.0 ;;3.5"))
            .unwrap();
        assert_eq!(
            typed,
            Value::List(vec![
                Value::Float(1.0),
                Value::Float(2.0),
                Value::Float(3.5)
            ])
        );
    }

    #[test]
    fn default_delimiter_splits_on_whitespace() {
        let schema = Schema::builder("S")
            .field(FieldSpec::new("xs", FieldKind::list_of(FieldKind::Float)))
            .build();
        let spec = schema.resolve("xs").unwrap();
        let typed = schema.type_value(spec, Value::str("1.0  2.0\t3.0")).unwrap();
        assert_eq!(typed.as_list().map(<[Value]>::len), Some(3));
    }

    #[test]
    fn bool_accepts_int_and_word_forms() {
        let schema = Schema::builder("S")
            .field(FieldSpec::new("flag", FieldKind::Bool))
            .build();
        let spec = schema.resolve("flag").unwrap();
        assert_eq!(
            schema.type_value(spec, Value::str("1")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            schema.type_value(spec, Value::str("False")).unwrap(),
            Value::Bool(false)
        );
        assert!(schema.type_value(spec, Value::str("maybe")).is_err());
    }

    #[test]
    #[should_panic(expected = "collides")]
    fn colliding_declarations_panic_at_build() {
        let _ = Schema::builder("Bad")
            .field(FieldSpec::new("branch_id", FieldKind::Str))
            .field(FieldSpec::new("branchid", FieldKind::Str))
            .build();
    }

    #[test]
    fn set_field_enforces_policy() {
        let schema = sample(); // Error policy by default
        let mut fields = FieldMap::new();
        let ok = schema
            .set_field(&mut fields, "branchId", Value::str("b1"))
            .unwrap();
        assert!(ok.applied);
        assert_eq!(fields.get_str("branchid"), Some("b1"));

        let err = schema
            .set_field(&mut fields, "rogue", Value::str("x"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownKeys { keys, .. } if keys == vec!["rogue"]));
    }
}
