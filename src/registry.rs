//! Polymorphic subtype resolution.
//!
//! An abstract family (cross-section definitions, structures, ...) declares
//! one static [`SubtypeTable`]: an ordered list of variants, each carrying
//! the discriminator literal it declares as its own default plus any
//! dialect aliases, and a constructor that delegates full binding to the
//! concrete subtype. Depth-first search over the subtype hierarchy is the
//! registration order of `variants` followed by `nested` tables.

use crate::error::Error;
use crate::fieldmap::FieldMap;
use crate::schema::canonical_key;
use crate::value::Value;

/// One concrete alternative of an abstract family.
pub struct Variant<T> {
    /// Concrete type name, for diagnostics.
    pub name: &'static str,
    /// The discriminator value this subtype declares as its own default.
    pub discriminator: &'static str,
    /// Additional dialect spellings accepted for the same variant.
    pub aliases: &'static [&'static str],
    /// Delegated constructor; receives the full mapping.
    pub bind: fn(FieldMap) -> Result<T, Error>,
}

impl<T> Variant<T> {
    pub fn new(
        name: &'static str,
        discriminator: &'static str,
        bind: fn(FieldMap) -> Result<T, Error>,
    ) -> Self {
        Self {
            name,
            discriminator,
            aliases: &[],
            bind,
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn accepts(&self, value: &str) -> bool {
        self.discriminator.eq_ignore_ascii_case(value)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(value))
    }
}

/// Static registry of subtypes for one abstract type.
pub struct SubtypeTable<T> {
    /// Abstract type name, used in the unknown-discriminator error.
    pub abstract_name: &'static str,
    /// Keyword holding the discriminator, conventionally `type`.
    pub discriminator_key: &'static str,
    /// Keyword naming the object in diagnostics, conventionally `id`.
    pub identifier_key: &'static str,
    pub variants: Vec<Variant<T>>,
    /// Subtype-of-subtype tables, searched depth-first after `variants`.
    pub nested: Vec<SubtypeTable<T>>,
}

impl<T> SubtypeTable<T> {
    pub fn new(abstract_name: &'static str) -> Self {
        Self {
            abstract_name,
            discriminator_key: "type",
            identifier_key: "id",
            variants: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn discriminator_key(mut self, key: &'static str) -> Self {
        self.discriminator_key = key;
        self
    }

    pub fn identifier_key(mut self, key: &'static str) -> Self {
        self.identifier_key = key;
        self
    }

    pub fn variant(mut self, variant: Variant<T>) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn nested(mut self, table: SubtypeTable<T>) -> Self {
        self.nested.push(table);
        self
    }

    /// Select the subtype matching the mapping's discriminator and delegate
    /// construction to it.
    ///
    /// An empty or absent discriminator is first rewritten to the first
    /// declared default found depth-first, so a bare input still resolves
    /// to a concrete subtype (and the rewritten value participates in the
    /// subtype's own binding).
    pub fn resolve(&self, mut fields: FieldMap) -> Result<T, Error> {
        let key = canonical_key(self.discriminator_key);
        let supplied = fields
            .get(&key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("")
            .to_string();
        let value = if supplied.is_empty() {
            match self.first_default() {
                Some(default) => {
                    fields.insert(key, Value::str(default));
                    default.to_string()
                }
                None => supplied,
            }
        } else {
            supplied
        };
        match self.find(&value) {
            Some(variant) => (variant.bind)(fields),
            None => Err(Error::UnknownDiscriminator {
                abstract_name: self.abstract_name.to_string(),
                value,
                identifier: fields
                    .get(&canonical_key(self.identifier_key))
                    .map(Value::to_string),
            }),
        }
    }

    /// Depth-first search: own variants in registration order, then each
    /// nested table recursively.
    fn find(&self, value: &str) -> Option<&Variant<T>> {
        self.variants
            .iter()
            .find(|v| v.accepts(value))
            .or_else(|| self.nested.iter().find_map(|table| table.find(value)))
    }

    fn first_default(&self) -> Option<&'static str> {
        self.variants
            .first()
            .map(|v| v.discriminator)
            .or_else(|| self.nested.iter().find_map(SubtypeTable::first_default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle { diameter: f64 },
        Rectangle { width: f64 },
        Zw,
    }

    fn table() -> SubtypeTable<Shape> {
        SubtypeTable::new("Shape")
            .variant(Variant::new("Circle", "circle", |f| {
                Ok(Shape::Circle {
                    diameter: f.get_str("diameter").and_then(|s| s.parse().ok()).unwrap_or(0.0),
                })
            }))
            .variant(
                Variant::new("Rectangle", "rectangle", |f| {
                    Ok(Shape::Rectangle {
                        width: f.get_str("width").and_then(|s| s.parse().ok()).unwrap_or(0.0),
                    })
                })
                .aliases(&["rect"]),
            )
            .nested(
                SubtypeTable::new("TabulatedShape")
                    .variant(Variant::new("Zw", "zw", |_| Ok(Shape::Zw))),
            )
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (canonical_key(k), Value::str(*v)))
            .collect()
    }

    #[test]
    fn discriminator_match_is_case_insensitive() {
        let shape = table()
            .resolve(fields(&[("type", "Circle"), ("diameter", "3.0")]))
            .unwrap();
        assert_eq!(shape, Shape::Circle { diameter: 3.0 });
    }

    #[test]
    fn dialect_alias_selects_the_same_variant() {
        let shape = table()
            .resolve(fields(&[("type", "RECT"), ("width", "2.0")]))
            .unwrap();
        assert_eq!(shape, Shape::Rectangle { width: 2.0 });
    }

    #[test]
    fn nested_tables_are_searched_depth_first() {
        let shape = table().resolve(fields(&[("type", "zw")])).unwrap();
        assert_eq!(shape, Shape::Zw);
    }

    #[test]
    fn empty_discriminator_rewrites_to_first_default() {
        let shape = table()
            .resolve(fields(&[("type", ""), ("diameter", "1.0")]))
            .unwrap();
        assert_eq!(shape, Shape::Circle { diameter: 1.0 });

        let shape = table().resolve(fields(&[("diameter", "1.0")])).unwrap();
        assert_eq!(shape, Shape::Circle { diameter: 1.0 });
    }

    #[test]
    fn unknown_discriminator_names_type_value_and_identifier() {
        let err = table()
            .resolve(fields(&[("type", "hexagon"), ("id", "xs07")]))
            .unwrap_err();
        match err {
            Error::UnknownDiscriminator {
                abstract_name,
                value,
                identifier,
            } => {
                assert_eq!(abstract_name, "Shape");
                assert_eq!(value, "hexagon");
                assert_eq!(identifier.as_deref(), Some("xs07"));
            }
            other => panic!("expected UnknownDiscriminator, got {other:?}"),
        }
    }
}
