//! Low-level line parser: text in, [`Document`] out.
//!
//! Best-effort by contract: well-formed constructs the parser does not
//! recognize are skipped, never fatal. The only fatal condition is a
//! violation of a caller-supplied canonical section order (a narrow rule
//! some dialects mandate). Every emitted node carries its absolute
//! 1-indexed source line for diagnostics.

use serde::{Deserialize, Serialize};

use crate::document::{CommentBlock, Document, Property, Section, SectionItem};
use crate::error::Error;

/// Parser configuration.
///
/// Construct via [`parse_options!`](crate::parse_options!) to stay
/// compatible with future fields.
///
/// ```rust
/// let options = inibind::parse_options! {
///     datablocks: true,
/// };
/// let doc = inibind::parse_str("[General]\nfileVersion = 3.00\n", &options).unwrap();
/// assert_eq!(doc.sections.len(), 1);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Characters opening a comment. A line whose first non-blank character
    /// is one of these becomes part of a [`CommentBlock`]; inside a
    /// property, the first marker begins the inline comment.
    pub comment_markers: Vec<char>,
    /// Whether trailing whitespace-delimited numeric rows after the last
    /// property of a section are collected into its datablock.
    pub datablocks: bool,
    /// Canonical section order some dialects mandate. Headers must appear
    /// as a subsequence of this list; a violation is fatal.
    pub ordered_headers: Option<Vec<String>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            comment_markers: vec!['#', '*'],
            datablocks: false,
            ordered_headers: None,
        }
    }
}

/// Parse a whole document from a string.
pub fn parse_str(input: &str, options: &ParseOptions) -> Result<Document, Error> {
    parse_lines(input.lines(), options)
}

/// Parse a whole document from an already-opened sequence of lines (the
/// boundary with the file-loading collaborator).
pub fn parse_lines<'a, I>(lines: I, options: &ParseOptions) -> Result<Document, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    Parser::new(options).run(lines)
}

struct Parser<'o> {
    options: &'o ParseOptions,
    document: Document,
    section: Option<Section>,
    /// Pending contiguous comment lines, verbatim, with their start line.
    comment_run: Vec<String>,
    comment_start: usize,
    /// Position of the previous header in `ordered_headers`, if enforced.
    order_cursor: usize,
}

impl<'o> Parser<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            document: Document::new(),
            section: None,
            comment_run: Vec::new(),
            comment_start: 0,
            order_cursor: 0,
        }
    }

    fn run<'a, I>(mut self, lines: I) -> Result<Document, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut last_line = 0;
        for (idx, raw) in lines.into_iter().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            self.line(raw, line_no)?;
        }
        self.flush_comments(last_line);
        self.close_section(last_line);
        Ok(self.document)
    }

    fn line(&mut self, raw: &str, line_no: usize) -> Result<(), Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.flush_comments(line_no.saturating_sub(1));
            return Ok(());
        }
        if self
            .options
            .comment_markers
            .contains(&trimmed.chars().next().unwrap_or('\0'))
        {
            if self.comment_run.is_empty() {
                self.comment_start = line_no;
            }
            self.comment_run.push(raw.to_string());
            return Ok(());
        }
        self.flush_comments(line_no.saturating_sub(1));

        // A header may carry a trailing inline comment; strip it before
        // recognition so the following properties land in the new section.
        let (head, _) = split_inline_comment(trimmed, &self.options.comment_markers);
        if let Some(header) = parse_header(head.trim()) {
            self.check_order(&header, line_no)?;
            self.close_section(line_no.saturating_sub(1));
            let mut section = Section::new(header);
            section.start_line = line_no;
            section.end_line = line_no;
            self.section = Some(section);
            return Ok(());
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let (value, comment) = split_inline_comment(value, &self.options.comment_markers);
            let value = value.trim();
            let property = Property {
                line: line_no,
                key: key.trim().to_string(),
                value: if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                },
                comment,
            };
            match &mut self.section {
                Some(section) => {
                    section.push_property(property);
                    section.end_line = line_no;
                }
                // A property before any header is not a construct we
                // recognize; best-effort means we skip it.
                None => {}
            }
            return Ok(());
        }

        // No '=': a candidate datablock row when the dialect supports them.
        if self.options.datablocks {
            if let Some(section) = &mut self.section {
                let tokens: Vec<&str> = trimmed.split_whitespace().collect();
                if !tokens.is_empty() && tokens.iter().all(|t| t.parse::<f64>().is_ok()) {
                    section
                        .datablock
                        .get_or_insert_with(Vec::new)
                        .push(tokens.iter().map(|t| t.to_string()).collect());
                    section.end_line = line_no;
                }
            }
        }
        Ok(())
    }

    /// Enforce the caller-supplied canonical section order, if any.
    fn check_order(&mut self, header: &str, line_no: usize) -> Result<(), Error> {
        let Some(order) = &self.options.ordered_headers else {
            return Ok(());
        };
        let Some(pos) = order.iter().position(|h| h.eq_ignore_ascii_case(header)) else {
            // Headers outside the mandated list are unconstrained.
            return Ok(());
        };
        if pos < self.order_cursor {
            return Err(Error::OutOfOrder {
                header: header.to_string(),
                line: line_no,
                expected: order.clone(),
            });
        }
        self.order_cursor = pos;
        Ok(())
    }

    /// Move the pending comment run into the current section, or into the
    /// document header when no section is open yet.
    fn flush_comments(&mut self, end_line: usize) {
        if self.comment_run.is_empty() {
            return;
        }
        let block = CommentBlock {
            start_line: self.comment_start,
            end_line: end_line.max(self.comment_start),
            lines: std::mem::take(&mut self.comment_run),
        };
        match &mut self.section {
            Some(section) => {
                section.end_line = section.end_line.max(block.end_line);
                section.content.push(SectionItem::Comment(block));
            }
            None => self.document.header_comment.push(block),
        }
    }

    fn close_section(&mut self, end_line: usize) {
        if let Some(mut section) = self.section.take() {
            if end_line > section.end_line {
                section.end_line = end_line;
            }
            self.document.sections.push(section);
        }
    }
}

/// `[Header]` recognizer; returns the inner text.
fn parse_header(trimmed: &str) -> Option<String> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim().to_string())
}

/// Split a raw value into the value proper and an optional inline comment.
/// Markers inside single or double quotes do not open a comment.
fn split_inline_comment(raw: &str, markers: &[char]) -> (String, Option<String>) {
    let mut quote: Option<char> = None;
    for (pos, c) in raw.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                } else if markers.contains(&c) {
                    let comment = raw[pos + c.len_utf8()..].trim();
                    let comment = if comment.is_empty() {
                        None
                    } else {
                        Some(comment.to_string())
                    };
                    return (raw[..pos].to_string(), comment);
                }
            }
        }
    }
    (raw.to_string(), None)
}
