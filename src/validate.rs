//! Structural cross-field validation rules.
//!
//! Rules are pure functions over the typed field mapping, composed into an
//! ordered pipeline by each model's schema. The pipeline runs every rule
//! and aggregates all independent failures into one error; an individual
//! rule short-circuits internally when continuing is meaningless (a length
//! check against an absent list, for example).

use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;
use crate::fieldmap::FieldMap;
use crate::schema::canonical_key;
use crate::value::Value;

/// One failure reported by a rule. Length mismatches keep their structure
/// so callers can match on the dedicated error variant.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleFailure {
    Message(String),
    LengthMismatch {
        count_field: String,
        list_field: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFailure::Message(msg) => f.write_str(msg),
            RuleFailure::LengthMismatch {
                count_field,
                list_field,
                expected,
                actual,
            } => write!(
                f,
                "{list_field} holds {actual} value(s) but {count_field} requires {expected}"
            ),
        }
    }
}

/// A single structural rule. May amend the field set (back-filling a
/// derived tag, for example) and returns every problem it can determine
/// independently.
pub trait Rule: Send + Sync {
    fn apply(&self, fields: &mut FieldMap) -> Vec<RuleFailure>;
}

/// Run an ordered rule pipeline, aggregating all failures.
///
/// A single length mismatch surfaces as [`Error::LengthMismatch`]; anything
/// else (or several problems at once) becomes [`Error::Validation`] with
/// one message per violated rule.
pub fn run_rules(
    object: &str,
    identifier: Option<&str>,
    rules: &[Box<dyn Rule>],
    fields: &mut FieldMap,
) -> Result<(), Error> {
    let mut failures = Vec::new();
    for rule in rules {
        failures.extend(rule.apply(fields));
    }
    match failures.len() {
        0 => Ok(()),
        1 => match failures.remove(0) {
            RuleFailure::LengthMismatch {
                count_field,
                list_field,
                expected,
                actual,
            } => Err(Error::LengthMismatch {
                count_field,
                list_field,
                expected,
                actual,
                identifier: identifier.map(str::to_string),
            }),
            failure => Err(Error::Validation {
                object: object.to_string(),
                identifier: identifier.map(str::to_string),
                problems: vec![failure.to_string()],
            }),
        },
        _ => Err(Error::Validation {
            object: object.to_string(),
            identifier: identifier.map(str::to_string),
            problems: failures.iter().map(RuleFailure::to_string).collect(),
        }),
    }
}

fn present(fields: &FieldMap, name: &str) -> bool {
    fields.contains(&canonical_key(name))
}

/// Binary comparison used by [`ConditionalPresence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    /// Compare two values: numerically when both are numeric, otherwise by
    /// case-insensitive text.
    pub fn test(&self, left: &Value, right: &Value) -> bool {
        let ordering = match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(
                left.to_string()
                    .to_ascii_lowercase()
                    .cmp(&right.to_string().to_ascii_lowercase()),
            ),
        };
        let Some(ordering) = ordering else {
            // NaN comparisons: only != holds.
            return matches!(self, Comparison::Ne);
        };
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
        }
    }
}

/// One acceptable alternative in an [`ExclusiveGroups`] rule.
#[derive(Clone, Debug)]
pub struct Group {
    /// Fields that must all be present for this alternative to match.
    pub fields: &'static [&'static str],
    /// Derived tag value for the matched alternative (a location-type, for
    /// example), written to or checked against the rule's `tag_field`.
    pub tag: &'static str,
    /// Minimum length for every list field in the group (coordinate-count
    /// bounds).
    pub min_len: Option<usize>,
    /// Whether every list field in the group must have the same length.
    pub equal_lengths: bool,
}

impl Group {
    pub fn new(fields: &'static [&'static str], tag: &'static str) -> Self {
        Self {
            fields,
            tag,
            min_len: None,
            equal_lengths: false,
        }
    }

    pub fn min_len(mut self, min: usize) -> Self {
        self.min_len = Some(min);
        self
    }

    pub fn equal_lengths(mut self) -> Self {
        self.equal_lengths = true;
        self
    }
}

/// Mutually-exclusive alternative groups ("location specification"):
/// exactly one group's fields must be fully present, and no field from any
/// other group may appear. The derived tag is auto-filled into `tag_field`
/// when absent, or checked for consistency when supplied.
#[derive(Clone, Debug)]
pub struct ExclusiveGroups {
    pub groups: Vec<Group>,
    pub tag_field: Option<&'static str>,
}

impl ExclusiveGroups {
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            groups,
            tag_field: None,
        }
    }

    pub fn tag_field(mut self, field: &'static str) -> Self {
        self.tag_field = Some(field);
        self
    }

    fn alternatives(&self) -> String {
        self.groups
            .iter()
            .map(|g| format!("{{{}}}", g.fields.join(" + ")))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

impl Rule for ExclusiveGroups {
    fn apply(&self, fields: &mut FieldMap) -> Vec<RuleFailure> {
        // A group matches when all its fields are present and nothing
        // outside it (within the union of all groups) is. Supersets win
        // naturally: the extra field disqualifies the smaller group.
        let matched: Vec<&Group> = self
            .groups
            .iter()
            .filter(|group| {
                group.fields.iter().all(|f| present(fields, f))
                    && self
                        .groups
                        .iter()
                        .flat_map(|g| g.fields.iter())
                        .filter(|f| present(fields, f))
                        .all(|f| group.fields.contains(f))
            })
            .collect();

        let group = match matched.as_slice() {
            [only] => *only,
            _ => {
                return vec![RuleFailure::Message(format!(
                    "exactly one of {} must be given",
                    self.alternatives()
                ))];
            }
        };

        let mut failures = Vec::new();
        if let Some(min) = group.min_len {
            for field in group.fields {
                let items = fields.get(&canonical_key(field)).and_then(Value::as_list);
                if let Some(items) = items {
                    if items.len() < min {
                        failures.push(RuleFailure::Message(format!(
                            "{field} must hold at least {min} value(s), got {}",
                            items.len()
                        )));
                    }
                }
            }
        }
        if group.equal_lengths {
            let lengths: Vec<(&str, usize)> = group
                .fields
                .iter()
                .filter_map(|f| {
                    fields
                        .get(&canonical_key(f))
                        .and_then(Value::as_list)
                        .map(|l| (*f, l.len()))
                })
                .collect();
            if let Some(((first_name, first_len), rest)) = lengths.split_first() {
                for (name, len) in rest {
                    if len != first_len {
                        failures.push(RuleFailure::Message(format!(
                            "{name} holds {len} value(s) but {first_name} holds {first_len}"
                        )));
                    }
                }
            }
        }
        if let Some(tag_field) = self.tag_field {
            let key = canonical_key(tag_field);
            match fields.get_str(&key) {
                None => fields.insert(key, Value::str(group.tag)),
                Some(existing) => {
                    if !existing.eq_ignore_ascii_case(group.tag) {
                        failures.push(RuleFailure::Message(format!(
                            "{tag_field} is \"{existing}\" but the given fields imply \"{}\"",
                            group.tag
                        )));
                    }
                }
            }
        }
        failures
    }
}

/// Count-vs-list-length: every present list field's length must equal
/// `count + length_incr`, optionally clamped to a minimum. A list may be
/// declared required whenever the count is positive.
#[derive(Clone, Debug)]
pub struct CountMatches {
    pub count_field: &'static str,
    pub list_fields: &'static [&'static str],
    pub length_incr: i64,
    pub min_length: Option<usize>,
    pub required_when_positive: bool,
}

impl CountMatches {
    pub fn new(count_field: &'static str, list_fields: &'static [&'static str]) -> Self {
        Self {
            count_field,
            list_fields,
            length_incr: 0,
            min_length: None,
            required_when_positive: false,
        }
    }

    pub fn length_incr(mut self, incr: i64) -> Self {
        self.length_incr = incr;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn required_when_positive(mut self) -> Self {
        self.required_when_positive = true;
        self
    }
}

impl Rule for CountMatches {
    fn apply(&self, fields: &mut FieldMap) -> Vec<RuleFailure> {
        // Without a count there is nothing to check; absence of the lists
        // is tolerated exactly when the count is absent or zero.
        let Some(count) = fields.get_i64(&canonical_key(self.count_field)) else {
            return Vec::new();
        };
        let expected = (count + self.length_incr).max(0) as usize;
        let expected = match self.min_length {
            Some(min) => expected.max(min),
            None => expected,
        };
        let mut failures = Vec::new();
        for list_field in self.list_fields {
            match fields.list_len(&canonical_key(list_field)) {
                Some(actual) => {
                    if actual != expected {
                        failures.push(RuleFailure::LengthMismatch {
                            count_field: self.count_field.to_string(),
                            list_field: list_field.to_string(),
                            expected,
                            actual,
                        });
                    }
                }
                None => {
                    if self.required_when_positive && count > 0 {
                        failures.push(RuleFailure::Message(format!(
                            "{list_field} is required when {} > 0",
                            self.count_field
                        )));
                    }
                }
            }
        }
        failures
    }
}

/// Whether [`ConditionalPresence`] demands or forbids its dependents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Required,
    Forbidden,
}

/// Conditional required/forbidden fields: when the controlling field
/// compares true against the target value, each dependent must be present
/// (or absent). An absent controlling field disables the rule.
#[derive(Clone, Debug)]
pub struct ConditionalPresence {
    pub controlling: &'static str,
    pub comparison: Comparison,
    pub target: Value,
    pub dependents: &'static [&'static str],
    pub presence: Presence,
}

impl ConditionalPresence {
    pub fn requires(
        controlling: &'static str,
        comparison: Comparison,
        target: Value,
        dependents: &'static [&'static str],
    ) -> Self {
        Self {
            controlling,
            comparison,
            target,
            dependents,
            presence: Presence::Required,
        }
    }

    pub fn forbids(
        controlling: &'static str,
        comparison: Comparison,
        target: Value,
        dependents: &'static [&'static str],
    ) -> Self {
        Self {
            controlling,
            comparison,
            target,
            dependents,
            presence: Presence::Forbidden,
        }
    }
}

impl Rule for ConditionalPresence {
    fn apply(&self, fields: &mut FieldMap) -> Vec<RuleFailure> {
        let Some(value) = fields.get(&canonical_key(self.controlling)) else {
            return Vec::new();
        };
        if !self.comparison.test(value, &self.target) {
            return Vec::new();
        }
        let mut failures = Vec::new();
        for dependent in self.dependents {
            let is_present = present(fields, dependent);
            match self.presence {
                Presence::Required if !is_present => {
                    failures.push(RuleFailure::Message(format!(
                        "{dependent} is required when {} {} {}",
                        self.controlling,
                        self.comparison.symbol(),
                        self.target
                    )));
                }
                Presence::Forbidden if is_present => {
                    failures.push(RuleFailure::Message(format!(
                        "{dependent} must not be given when {} {} {}",
                        self.controlling,
                        self.comparison.symbol(),
                        self.target
                    )));
                }
                _ => {}
            }
        }
        failures
    }
}

/// Mutually-exclusive alternative specification ("friction specification"):
/// either the named reference or the type+value pair may be set, never
/// both. Both unset is allowed; defaults apply downstream.
#[derive(Clone, Debug)]
pub struct ExclusiveSpec {
    pub reference: &'static str,
    pub kind_field: &'static str,
    pub value_field: &'static str,
}

impl ExclusiveSpec {
    pub fn new(
        reference: &'static str,
        kind_field: &'static str,
        value_field: &'static str,
    ) -> Self {
        Self {
            reference,
            kind_field,
            value_field,
        }
    }
}

impl Rule for ExclusiveSpec {
    fn apply(&self, fields: &mut FieldMap) -> Vec<RuleFailure> {
        let has_reference = present(fields, self.reference);
        let has_pair = present(fields, self.kind_field) || present(fields, self.value_field);
        if has_reference && has_pair {
            vec![RuleFailure::Message(format!(
                "either {} or {}+{} may be given, not both",
                self.reference, self.kind_field, self.value_field
            ))]
        } else {
            Vec::new()
        }
    }
}
