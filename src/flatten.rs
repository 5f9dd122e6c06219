//! Section flattener: ordered [`Section`] content into a plain
//! [`FieldMap`], applying the duplicate-key policy and optionally carrying
//! a parallel comments mapping.

use crate::document::Section;
use crate::fieldmap::FieldMap;
use crate::schema::canonical_key;
use crate::value::Value;

/// Reserved key the comments sub-mapping is merged under.
pub const COMMENTS_KEY: &str = "comments";
/// Reserved key the section header is merged under.
pub const HEADER_KEY: &str = "header";

/// Convert a section's ordered property list into a plain mapping.
///
/// Keys are canonicalized ([`canonical_key`]) before insertion. When
/// `duplicate_keys_as_list` is set, a repeated key combines its values into
/// an ordered list; otherwise the last occurrence wins silently. When
/// `with_comments` is set, a parallel `key -> comment` mapping (same
/// duplicate policy) is merged in under [`COMMENTS_KEY`]. Header-level
/// metadata lands under [`HEADER_KEY`]; line-position bookkeeping and the
/// `content`/`datablock` fields themselves are excluded, the datablock
/// being handed to the binder separately.
pub fn flatten(section: &Section, duplicate_keys_as_list: bool, with_comments: bool) -> FieldMap {
    let mut fields = FieldMap::new();
    let mut comments = FieldMap::new();

    for property in section.properties() {
        let key = canonical_key(&property.key);
        let value = Value::str(property.value.clone().unwrap_or_default());
        if duplicate_keys_as_list {
            fields.insert_merging(&key, value);
        } else {
            fields.insert(key.clone(), value);
        }
        if with_comments {
            if let Some(comment) = &property.comment {
                if duplicate_keys_as_list {
                    comments.insert_merging(&key, Value::str(comment.clone()));
                } else {
                    comments.insert(key.clone(), Value::str(comment.clone()));
                }
            }
        }
    }

    fields.insert(HEADER_KEY, Value::str(section.header.clone()));
    if with_comments && !comments.is_empty() {
        fields.insert(COMMENTS_KEY, Value::Map(comments));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Property;

    fn section_with(pairs: &[(&str, &str)]) -> Section {
        let mut section = Section::new("Test");
        for (k, v) in pairs {
            section.push_property(Property::new(*k, Some(v.to_string())));
        }
        section
    }

    #[test]
    fn duplicate_keys_merge_into_ordered_list() {
        let section = section_with(&[("key", "1"), ("key", "2"), ("key", "3")]);
        let flat = flatten(&section, true, false);
        let items = flat.get("key").and_then(Value::as_list).unwrap();
        let values: Vec<_> = items.iter().filter_map(Value::as_str).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn duplicate_keys_last_wins_without_policy() {
        let section = section_with(&[("key", "1"), ("key", "2"), ("key", "3")]);
        let flat = flatten(&section, false, false);
        assert_eq!(flat.get_str("key"), Some("3"));
    }

    #[test]
    fn keys_are_canonicalized() {
        let section = section_with(&[("Branch_Id", "b1")]);
        let flat = flatten(&section, false, false);
        assert_eq!(flat.get_str("branchid"), Some("b1"));
    }

    #[test]
    fn header_is_merged_in() {
        let section = section_with(&[("a", "1")]);
        let flat = flatten(&section, false, false);
        assert_eq!(flat.get_str(HEADER_KEY), Some("Test"));
    }

    #[test]
    fn comments_sidecar_follows_the_same_policy() {
        let mut section = Section::new("Test");
        section.push_property(
            Property::new("a", Some("1".to_string())).with_comment(Some("first".to_string())),
        );
        section.push_property(Property::new("b", Some("2".to_string())));
        let flat = flatten(&section, false, true);
        let comments = flat.get(COMMENTS_KEY).and_then(Value::as_map).unwrap();
        assert_eq!(comments.get_str("a"), Some("first"));
        assert!(comments.get("b").is_none());
    }

    #[test]
    fn no_comments_key_when_disabled_or_empty() {
        let section = section_with(&[("a", "1")]);
        assert!(flatten(&section, false, true).get(COMMENTS_KEY).is_none());
        let mut section = Section::new("Test");
        section.push_property(
            Property::new("a", Some("1".to_string())).with_comment(Some("c".to_string())),
        );
        assert!(flatten(&section, false, false).get(COMMENTS_KEY).is_none());
    }
}
