//! Position-tracked parse tree for sectioned key/value documents.
//!
//! Pure data: no validation happens here. Every node remembers the absolute
//! 1-indexed source line(s) it came from so later stages can point
//! diagnostics at the exact input position. Nodes synthesized by the
//! serializer use line `0`, meaning "not from source".

use serde::{Deserialize, Serialize};

/// A contiguous run of comment lines, kept verbatim (marker included) so a
/// rewrite is byte-faithful. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub lines: Vec<String>,
}

impl CommentBlock {
    pub fn new(start_line: usize, lines: Vec<String>) -> Self {
        let end_line = start_line + lines.len().saturating_sub(1);
        Self {
            start_line,
            end_line,
            lines,
        }
    }
}

/// One `key = value` pair, possibly with a trailing inline comment.
///
/// `key` is the literal keyword exactly as written (case and spelling
/// preserved); the value is always a string at this layer. Typing happens
/// in the binder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub line: usize,
    pub key: String,
    pub value: Option<String>,
    pub comment: Option<String>,
}

impl Property {
    pub fn new<K: Into<String>>(key: K, value: Option<String>) -> Self {
        Self {
            line: 0,
            key: key.into(),
            value,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }
}

/// Ordered content of a section: properties interleaved with comment runs,
/// in source order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionItem {
    Property(Property),
    Comment(CommentBlock),
}

/// One `[Header]`-delimited block.
///
/// `content` preserves source order. `datablock` is only populated for
/// formats that declare trailing tabular data support: whitespace-delimited
/// numeric rows following the last property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub header: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: Vec<SectionItem>,
    pub datablock: Option<Vec<Vec<String>>>,
}

impl Section {
    pub fn new<H: Into<String>>(header: H) -> Self {
        Self {
            header: header.into(),
            start_line: 0,
            end_line: 0,
            content: Vec::new(),
            datablock: None,
        }
    }

    pub fn push_property(&mut self, property: Property) {
        self.content.push(SectionItem::Property(property));
    }

    pub fn push_comment(&mut self, block: CommentBlock) {
        self.content.push(SectionItem::Comment(block));
    }

    /// Properties in source order, skipping interleaved comment blocks.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.content.iter().filter_map(|item| match item {
            SectionItem::Property(p) => Some(p),
            SectionItem::Comment(_) => None,
        })
    }
}

/// A whole parsed file: leading comments followed by sections in source
/// order. Whether that order must be preserved on save is the typed model's
/// own contract, not the document's.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub header_comment: Vec<CommentBlock>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// First section with the given header, compared case-insensitively.
    pub fn section(&self, header: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.header.eq_ignore_ascii_case(header))
    }

    /// All sections with the given header, for formats that repeat blocks
    /// (one `[CrossSection]` per object, for example).
    pub fn sections_named<'a>(&'a self, header: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections
            .iter()
            .filter(move |s| s.header.eq_ignore_ascii_case(header))
    }
}
