//! Typed binder: flattened mapping in, validated typed object out.
//!
//! The pipeline a mapping goes through, in order: alias resolution against
//! the schema, unset-marker dropping, unknown-keyword policy, per-field
//! typing (including list-delimiter splitting), default materialization,
//! required check, comments sidecar population, then the schema's
//! structural rule pipeline. Construction is atomic: either a fully valid
//! object comes back or an error does; nothing partially valid escapes.
//!
//! Non-fatal findings (dropped keywords, discarded comments) are collected
//! into [`BoundFields::warnings`] for the caller to surface; the engine
//! never prints.

use crate::document::Section;
use crate::error::Error;
use crate::fieldmap::FieldMap;
use crate::flatten::{COMMENTS_KEY, HEADER_KEY, flatten};
use crate::schema::{Comments, Schema, UnknownKeyPolicy, canonical_key};
use crate::validate::run_rules;
use crate::value::{FileReference, Value};

/// A strongly-typed domain object bound to one section schema.
///
/// Implementors declare their [`Schema`] once (normally in a `LazyLock`
/// static), extract their fields in `from_fields`, and reproduce the same
/// mapping in `to_fields`. The binder and the serializer both consult the
/// schema, which keeps input acceptance and output spelling symmetric.
pub trait Model: Sized {
    fn schema() -> &'static Schema;

    /// Construct from the fully typed, validated field set.
    fn from_fields(fields: BoundFields) -> Result<Self, Error>;

    /// The typed field set this object serializes from, keyed by canonical
    /// field names. Unknown-but-allowed keys kept at bind time must be
    /// included so they survive the round trip.
    fn to_fields(&self) -> FieldMap;

    /// The comments sidecar, for models that declare comment support.
    fn comments(&self) -> Option<&Comments> {
        None
    }
}

/// The result of the binding pipeline, handed to `Model::from_fields`.
#[derive(Debug)]
pub struct BoundFields {
    schema: &'static Schema,
    values: FieldMap,
    /// Keys matching no declared field, kept under the Allow policy.
    pub extra: FieldMap,
    /// Comments sidecar, populated when the model declares support.
    pub comments: Option<Comments>,
    /// Collected non-fatal findings.
    pub warnings: Vec<String>,
    /// Trailing tabular rows of the source section, when present.
    pub datablock: Option<Vec<Vec<String>>>,
}

impl BoundFields {
    /// Remove and return a field's typed value, by canonical name or alias.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.remove(&canonical_key(name))
    }

    pub fn take_str(&mut self, name: &str) -> Option<String> {
        self.take(name).map(|v| match v {
            Value::Str(s) => s,
            other => other.to_string(),
        })
    }

    pub fn take_i64(&mut self, name: &str) -> Option<i64> {
        self.take(name).and_then(|v| v.as_i64())
    }

    pub fn take_f64(&mut self, name: &str) -> Option<f64> {
        self.take(name).and_then(|v| v.as_f64())
    }

    pub fn take_bool(&mut self, name: &str) -> Option<bool> {
        self.take(name).and_then(|v| v.as_bool())
    }

    pub fn take_path(&mut self, name: &str) -> Option<FileReference> {
        match self.take(name) {
            Some(Value::Path(p)) => Some(p),
            Some(Value::Str(s)) => Some(FileReference::new(s)),
            _ => None,
        }
    }

    pub fn take_f64_list(&mut self, name: &str) -> Option<Vec<f64>> {
        match self.take(name)? {
            Value::List(items) => items.iter().map(Value::as_f64).collect(),
            scalar => scalar.as_f64().map(|f| vec![f]),
        }
    }

    pub fn take_str_list(&mut self, name: &str) -> Option<Vec<String>> {
        match self.take(name)? {
            Value::List(items) => Some(items.iter().map(Value::to_string).collect()),
            scalar => Some(vec![scalar.to_string()]),
        }
    }

    /// Like [`take`](Self::take) but absent is an error naming the field.
    pub fn need(&mut self, name: &str) -> Result<Value, Error> {
        self.take(name).ok_or_else(|| {
            Error::msg(format!("{}: {name} is required", self.schema.name))
        })
    }

    pub fn need_str(&mut self, name: &str) -> Result<String, Error> {
        self.take_str(name).ok_or_else(|| {
            Error::msg(format!("{}: {name} is required", self.schema.name))
        })
    }

    pub fn need_f64(&mut self, name: &str) -> Result<f64, Error> {
        self.take_f64(name).ok_or_else(|| {
            Error::msg(format!("{}: {name} is required", self.schema.name))
        })
    }
}

/// Bind one parsed section into a typed model.
pub fn bind_section<T: Model>(section: &Section) -> Result<T, Error> {
    let schema = T::schema();
    // Comments are always collected here; the pipeline either populates
    // the sidecar or discards them with one warning, per the schema.
    let raw = flatten(section, schema.duplicates_as_list, true);
    let mut bound = bind_fields(schema, raw)?;
    bound.datablock = section.datablock.clone();
    T::from_fields(bound)
}

/// Bind a hand-built keyword mapping into a typed model. Keys may use any
/// accepted spelling; values may be raw strings or already typed.
pub fn bind_map<T: Model>(raw: FieldMap) -> Result<T, Error> {
    T::from_fields(bind_fields(T::schema(), raw)?)
}

/// The generic binding pipeline shared by [`bind_section`] and
/// [`bind_map`], and by the polymorphic resolver's variant constructors.
pub fn bind_fields(schema: &'static Schema, mut raw: FieldMap) -> Result<BoundFields, Error> {
    let section_name = raw
        .remove(HEADER_KEY)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| schema.header.to_string());
    let comments_map = raw.remove(COMMENTS_KEY);

    let mut values = FieldMap::new();
    let mut extra = FieldMap::new();
    let mut unknown: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (key, value) in raw {
        let ck = canonical_key(&key);
        match schema.resolve(&ck) {
            Some(spec) => {
                // An explicit "no value" marker unsets the field so it
                // falls back to its declared default instead of typing an
                // empty value. Only declared fields unset this way; an
                // unknown key still faces the policy below whatever its
                // value.
                if value.is_unset() {
                    continue;
                }
                let typed = schema.type_value(spec, value)?;
                values.insert(canonical_key(spec.canonical), typed);
            }
            None if schema.is_exempt(&ck) => {}
            None => match schema.unknown_keys {
                UnknownKeyPolicy::Allow => extra.insert(key, value),
                UnknownKeyPolicy::Drop => warnings.push(format!(
                    "unknown keyword \"{key}\" dropped from [{section_name}]"
                )),
                UnknownKeyPolicy::Error => unknown.push(key),
            },
        }
    }

    if !unknown.is_empty() {
        return Err(Error::UnknownKeys {
            section: section_name,
            keys: unknown,
        });
    }

    // Materialize declared defaults so validators see them and a re-bind of
    // serialized output restores the same values.
    let mut missing: Vec<&str> = Vec::new();
    for spec in &schema.fields {
        let ck = canonical_key(spec.canonical);
        if values.contains(&ck) {
            continue;
        }
        match &spec.default {
            Some(default) => values.insert(ck, default.clone()),
            None => {
                if spec.required {
                    missing.push(spec.canonical);
                }
            }
        }
    }
    if !missing.is_empty() {
        return Err(Error::Validation {
            object: schema.name.to_string(),
            identifier: identifier_of(schema, &values),
            problems: missing
                .iter()
                .map(|name| format!("{name} is required"))
                .collect(),
        });
    }

    let comments = if schema.comments {
        let mut sidecar = Comments::empty(schema);
        if let Some(Value::Map(map)) = comments_map {
            for (key, value) in &map {
                let text = match value {
                    // Duplicate keys carry a list of comments; the last
                    // one wins, matching last-wins value semantics.
                    Value::List(items) => items.last().map(Value::to_string),
                    other => Some(other.to_string()),
                };
                if let Some(text) = text {
                    // Comment keys outside the schema are silently ignored;
                    // the matching value key already went through the
                    // unknown-keyword policy.
                    sidecar.set(key, text);
                }
            }
        }
        Some(sidecar)
    } else {
        if comments_map.is_some() {
            warnings.push(format!(
                "[{section_name}] does not support comments; supplied comments were discarded"
            ));
        }
        None
    };

    let identifier = identifier_of(schema, &values);
    run_rules(schema.name, identifier.as_deref(), &schema.rules, &mut values)?;

    Ok(BoundFields {
        schema,
        values,
        extra,
        comments,
        warnings,
        datablock: None,
    })
}

fn identifier_of(schema: &Schema, values: &FieldMap) -> Option<String> {
    let id = schema.identifier?;
    values.get(&canonical_key(id)).map(Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSpec};
    use std::sync::LazyLock;

    static WEIR: LazyLock<Schema> = LazyLock::new(|| {
        Schema::builder("Weir")
            .header("Structure")
            .identifier("id")
            .field(FieldSpec::new("id", FieldKind::Str).required())
            .field(FieldSpec::new("crest_level", FieldKind::Float).alias("crestLevel"))
            .field(
                FieldSpec::new("use_velocity_height", FieldKind::Bool)
                    .alias("useVelocityHeight")
                    .default_value(Value::Bool(true)),
            )
            .build()
    });

    #[derive(Debug, PartialEq)]
    struct Weir {
        id: String,
        crest_level: Option<f64>,
        use_velocity_height: bool,
    }

    impl Model for Weir {
        fn schema() -> &'static Schema {
            &WEIR
        }

        fn from_fields(mut fields: BoundFields) -> Result<Self, Error> {
            Ok(Weir {
                id: fields.need_str("id")?,
                crest_level: fields.take_f64("crest_level"),
                use_velocity_height: fields.take_bool("use_velocity_height").unwrap_or(true),
            })
        }

        fn to_fields(&self) -> FieldMap {
            let mut fields = FieldMap::new();
            fields.insert("id", Value::str(self.id.clone()));
            if let Some(level) = self.crest_level {
                fields.insert("crestlevel", Value::Float(level));
            }
            fields.insert("usevelocityheight", Value::Bool(self.use_velocity_height));
            fields
        }
    }

    fn raw(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::str(*v)))
            .collect()
    }

    #[test]
    fn binds_via_alias_and_canonical_name_alike() {
        let by_alias: Weir = bind_map(raw(&[("crestLevel", "1.5"), ("id", "w1")])).unwrap();
        let by_name: Weir = bind_map(raw(&[("crest_level", "1.5"), ("id", "w1")])).unwrap();
        assert_eq!(by_alias, by_name);
        assert_eq!(by_alias.crest_level, Some(1.5));
    }

    #[test]
    fn unset_marker_falls_back_to_default() {
        let weir: Weir =
            bind_map(raw(&[("id", "w1"), ("useVelocityHeight", "  ")])).unwrap();
        assert!(weir.use_velocity_height);
    }

    #[test]
    fn missing_required_field_fails_atomically() {
        let err = bind_map::<Weir>(raw(&[("crestLevel", "1.5")])).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation { problems, .. } if problems == vec!["id is required"]
        ));
    }

    #[test]
    fn unknown_keys_error_lists_every_offender_once() {
        let err =
            bind_map::<Weir>(raw(&[("id", "w1"), ("rogue", "2"), ("stray", "3")])).unwrap_err();
        match err {
            Error::UnknownKeys { section, keys } => {
                assert_eq!(section, "Structure");
                assert_eq!(keys, vec!["rogue", "stray"]);
            }
            other => panic!("expected UnknownKeys, got {other:?}"),
        }
    }

    #[test]
    fn type_errors_name_the_field() {
        let err = bind_map::<Weir>(raw(&[("id", "w1"), ("crestLevel", "high")])).unwrap_err();
        assert!(err.to_string().contains("crest_level"));
    }
}
