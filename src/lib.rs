//! Sectioned key/value document engine with a typed, schema-driven binding
//! layer.
//!
//! The crate is the generic core underneath a family of INI-dialect
//! configuration files (model run parameters, cross-sections, structures,
//! friction tables, ...): a position-tracked [`Document`] model, a
//! best-effort line [`parser`](parse_str), a [section flattener](flatten)
//! with duplicate-key policy, a typed [binder](bind_section) driven by
//! explicit per-type [`Schema`] tables (aliases, list delimiters,
//! unknown-keyword policy, comments sidecar), a static
//! [polymorphic subtype registry](SubtypeTable), composable
//! [structural validation rules](validate), and the inverse
//! [serializer](to_section) reconstructing sections from typed objects.
//!
//! The engine guarantees that parse → bind → serialize → parse is stable,
//! and never interprets the physical meaning of any field; concrete file
//! types are schema declarations built on top.
//!
//! ```rust
//! use std::sync::LazyLock;
//! use inibind::{
//!     bind_section, parse_str, to_section, BoundFields, Error, FieldKind, FieldMap,
//!     FieldSpec, Model, ParseOptions, Schema, Value, WriteOptions,
//! };
//!
//! static GENERAL: LazyLock<Schema> = LazyLock::new(|| {
//!     Schema::builder("General")
//!         .field(FieldSpec::new("file_version", FieldKind::Str).alias("fileVersion"))
//!         .field(FieldSpec::new("file_type", FieldKind::Str).alias("fileType"))
//!         .build()
//! });
//!
//! struct General {
//!     file_version: Option<String>,
//!     file_type: Option<String>,
//! }
//!
//! impl Model for General {
//!     fn schema() -> &'static Schema {
//!         &GENERAL
//!     }
//!     fn from_fields(mut fields: BoundFields) -> Result<Self, Error> {
//!         Ok(General {
//!             file_version: fields.take_str("file_version"),
//!             file_type: fields.take_str("file_type"),
//!         })
//!     }
//!     fn to_fields(&self) -> FieldMap {
//!         let mut fields = FieldMap::new();
//!         if let Some(v) = &self.file_version {
//!             fields.insert("fileversion", Value::str(v.clone()));
//!         }
//!         if let Some(t) = &self.file_type {
//!             fields.insert("filetype", Value::str(t.clone()));
//!         }
//!         fields
//!     }
//! }
//!
//! let doc = parse_str(
//!     "[General]\nfileVersion = 3.00\nfileType = crossDef\n",
//!     &ParseOptions::default(),
//! )
//! .unwrap();
//! let general: General = bind_section(doc.section("General").unwrap()).unwrap();
//! assert_eq!(general.file_version.as_deref(), Some("3.00"));
//!
//! let section = to_section(&general, &WriteOptions::default()).unwrap();
//! assert_eq!(section.header, "General");
//! ```

pub mod binder;
pub mod document;
pub mod error;
pub mod fieldmap;
pub mod flatten;
mod macros;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod validate;
pub mod value;
pub mod write;

pub use binder::{BoundFields, Model, bind_fields, bind_map, bind_section};
pub use document::{CommentBlock, Document, Property, Section, SectionItem};
pub use error::Error;
pub use fieldmap::FieldMap;
pub use flatten::{COMMENTS_KEY, HEADER_KEY, flatten};
pub use parser::{ParseOptions, parse_lines, parse_str};
pub use registry::{SubtypeTable, Variant};
pub use schema::{
    Comments, FieldKind, FieldSpec, Schema, SchemaBuilder, SetOutcome, UnknownKeyPolicy,
    canonical_key,
};
pub use validate::{
    Comparison, ConditionalPresence, CountMatches, ExclusiveGroups, ExclusiveSpec, Group,
    Presence, Rule, RuleFailure, run_rules,
};
pub use value::{FileReference, PathStyle, Value};
pub use write::{
    FloatFormat, WriteOptions, render, render_models, render_section, to_document, to_section,
};
