//! Cross-field rules wired into model schemas: alternative location
//! groups, count-vs-list-length, conditional presence and the exclusive
//! friction specification.

use inibind::{
    BoundFields, Comparison, ConditionalPresence, CountMatches, Error, ExclusiveGroups,
    ExclusiveSpec, FieldKind, FieldMap, FieldSpec, Group, Model, Schema, Value, bind_map,
};
use std::sync::LazyLock;

static OBSERVATION_POINT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("ObservationPoint")
        .identifier("name")
        .field(FieldSpec::new("name", FieldKind::Str).required())
        .field(FieldSpec::new("node_id", FieldKind::Str).alias("nodeId"))
        .field(FieldSpec::new("branch_id", FieldKind::Str).alias("branchId"))
        .field(FieldSpec::new("chainage", FieldKind::Float))
        .field(
            FieldSpec::new("x_coordinates", FieldKind::list_of(FieldKind::Float))
                .alias("xCoordinates"),
        )
        .field(
            FieldSpec::new("y_coordinates", FieldKind::list_of(FieldKind::Float))
                .alias("yCoordinates"),
        )
        .field(FieldSpec::new("location_type", FieldKind::Str).alias("locationType"))
        .rule(
            ExclusiveGroups::new(vec![
                Group::new(&["node_id"], "node"),
                Group::new(&["branch_id", "chainage"], "branch"),
                Group::new(&["x_coordinates", "y_coordinates"], "coordinates")
                    .min_len(2)
                    .equal_lengths(),
            ])
            .tag_field("location_type"),
        )
        .build()
});

#[derive(Debug, PartialEq)]
struct ObservationPoint {
    name: String,
    location_type: String,
    branch_id: Option<String>,
    chainage: Option<f64>,
}

impl Model for ObservationPoint {
    fn schema() -> &'static Schema {
        &OBSERVATION_POINT
    }

    fn from_fields(mut fields: BoundFields) -> Result<Self, Error> {
        Ok(ObservationPoint {
            name: fields.need_str("name")?,
            location_type: fields.need_str("location_type")?,
            branch_id: fields.take_str("branch_id"),
            chainage: fields.take_f64("chainage"),
        })
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("name", Value::str(self.name.clone()));
        if let Some(branch) = &self.branch_id {
            fields.insert("branchid", Value::str(branch.clone()));
        }
        if let Some(chainage) = self.chainage {
            fields.insert("chainage", Value::Float(chainage));
        }
        fields.insert("locationtype", Value::str(self.location_type.clone()));
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
fn branch_location_binds_and_backfills_the_tag() {
    let point: ObservationPoint = bind_map(raw(&[
        ("name", "obs1"),
        ("branchId", "channel1"),
        ("chainage", "120.5"),
    ]))
    .unwrap();
    assert_eq!(point.location_type, "branch");
    assert_eq!(point.branch_id.as_deref(), Some("channel1"));
}

#[test]
fn mixing_location_groups_is_rejected_with_alternatives() {
    let err = bind_map::<ObservationPoint>(raw(&[
        ("name", "obs2"),
        ("nodeId", "n1"),
        ("branchId", "channel1"),
        ("chainage", "120.5"),
    ]))
    .unwrap_err();
    match err {
        Error::Validation {
            identifier,
            problems,
            ..
        } => {
            assert_eq!(identifier.as_deref(), Some("obs2"));
            assert_eq!(problems.len(), 1);
            assert!(problems[0].contains("node_id"));
            assert!(problems[0].contains("branch_id + chainage"));
            assert!(problems[0].contains("x_coordinates"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn coordinate_location_checks_lengths() {
    let err = bind_map::<ObservationPoint>(raw(&[
        ("name", "obs3"),
        ("xCoordinates", "0.0 1.0 2.0"),
        ("yCoordinates", "0.0 1.0"),
    ]))
    .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

static TABULATED: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("TabulatedCrsDef")
        .identifier("id")
        .field(FieldSpec::new("id", FieldKind::Str).required())
        .field(FieldSpec::new("count", FieldKind::Int).alias("numLevels"))
        .field(FieldSpec::new("levels", FieldKind::list_of(FieldKind::Float)))
        .field(
            FieldSpec::new("flow_widths", FieldKind::list_of(FieldKind::Float))
                .alias("flowWidths"),
        )
        .rule(CountMatches::new("count", &["levels", "flow_widths"]).required_when_positive())
        .build()
});

#[derive(Debug, PartialEq)]
struct TabulatedCrsDef {
    id: String,
    count: i64,
    levels: Vec<f64>,
    flow_widths: Vec<f64>,
}

impl Model for TabulatedCrsDef {
    fn schema() -> &'static Schema {
        &TABULATED
    }

    fn from_fields(mut fields: BoundFields) -> Result<Self, Error> {
        Ok(TabulatedCrsDef {
            id: fields.need_str("id")?,
            count: fields.take_i64("count").unwrap_or(0),
            levels: fields.take_f64_list("levels").unwrap_or_default(),
            flow_widths: fields.take_f64_list("flow_widths").unwrap_or_default(),
        })
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("id", Value::str(self.id.clone()));
        fields.insert("count", Value::Int(self.count));
        fields.insert(
            "levels",
            Value::List(self.levels.iter().copied().map(Value::Float).collect()),
        );
        fields.insert(
            "flowwidths",
            Value::List(self.flow_widths.iter().copied().map(Value::Float).collect()),
        );
        fields
    }
}

#[test]
fn list_length_must_match_count() {
    let err = bind_map::<TabulatedCrsDef>(raw(&[
        ("id", "t1"),
        ("numLevels", "2"),
        ("levels", "1.0 2.0 3.0"),
        ("flowWidths", "10.0 20.0"),
    ]))
    .unwrap_err();
    match err {
        Error::LengthMismatch {
            count_field,
            list_field,
            expected,
            actual,
            identifier,
        } => {
            assert_eq!(count_field, "count");
            assert_eq!(list_field, "levels");
            assert_eq!(expected, 2);
            assert_eq!(actual, 3);
            assert_eq!(identifier.as_deref(), Some("t1"));
        }
        other => panic!("expected LengthMismatch, got {other:?}"),
    }
}

#[test]
fn matching_lengths_bind() {
    let def: TabulatedCrsDef = bind_map(raw(&[
        ("id", "t2"),
        ("numLevels", "2"),
        ("levels", "1.0 2.0"),
        ("flowWidths", "10.0 20.0"),
    ]))
    .unwrap();
    assert_eq!(def.levels, vec![1.0, 2.0]);
    assert_eq!(def.flow_widths, vec![10.0, 20.0]);
}

#[test]
fn independent_rule_failures_are_aggregated() {
    // Both lists disagree with the count: two independent problems, one
    // error reporting both.
    let err = bind_map::<TabulatedCrsDef>(raw(&[
        ("id", "t3"),
        ("numLevels", "2"),
        ("levels", "1.0"),
        ("flowWidths", "10.0 20.0 30.0"),
    ]))
    .unwrap_err();
    match err {
        Error::Validation { problems, .. } => {
            assert_eq!(problems.len(), 2);
            assert!(problems[0].contains("levels"));
            assert!(problems[1].contains("flow_widths"));
        }
        other => panic!("expected aggregated Validation, got {other:?}"),
    }
}

static PUMP: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder("Pump")
        .identifier("id")
        .field(FieldSpec::new("id", FieldKind::Str).required())
        .field(FieldSpec::new("control_side", FieldKind::Str).alias("controlSide"))
        .field(
            FieldSpec::new("start_level_suction", FieldKind::Float)
                .alias("startLevelSuctionSide"),
        )
        .field(FieldSpec::new("friction_id", FieldKind::Str).alias("frictionId"))
        .field(FieldSpec::new("friction_type", FieldKind::Str).alias("frictionType"))
        .field(FieldSpec::new("friction_value", FieldKind::Float).alias("frictionValue"))
        .rule(ConditionalPresence::requires(
            "control_side",
            Comparison::Eq,
            Value::str("suctionSide"),
            &["start_level_suction"],
        ))
        .rule(ExclusiveSpec::new(
            "friction_id",
            "friction_type",
            "friction_value",
        ))
        .build()
});

#[derive(Debug, PartialEq)]
struct Pump {
    id: String,
    control_side: Option<String>,
    start_level_suction: Option<f64>,
}

impl Model for Pump {
    fn schema() -> &'static Schema {
        &PUMP
    }

    fn from_fields(mut fields: BoundFields) -> Result<Self, Error> {
        Ok(Pump {
            id: fields.need_str("id")?,
            control_side: fields.take_str("control_side"),
            start_level_suction: fields.take_f64("start_level_suction"),
        })
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("id", Value::str(self.id.clone()));
        if let Some(side) = &self.control_side {
            fields.insert("controlside", Value::str(side.clone()));
        }
        if let Some(level) = self.start_level_suction {
            fields.insert("startlevelsuction", Value::Float(level));
        }
        fields
    }
}

#[test]
fn conditional_requirement_names_the_comparison() {
    let err = bind_map::<Pump>(raw(&[("id", "p1"), ("controlSide", "suctionSide")]))
        .unwrap_err();
    match err {
        Error::Validation { problems, .. } => {
            assert_eq!(problems.len(), 1);
            assert!(problems[0].contains("start_level_suction"));
            assert!(problems[0].contains("control_side"));
            assert!(problems[0].contains("=="));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn friction_reference_and_pair_are_mutually_exclusive() {
    let err = bind_map::<Pump>(raw(&[
        ("id", "p2"),
        ("frictionId", "main"),
        ("frictionType", "Manning"),
    ]))
    .unwrap_err();
    assert!(matches!(err, Error::Validation { problems, .. }
        if problems.len() == 1 && problems[0].contains("friction_id")));

    // Both unset is allowed; defaults apply downstream.
    let pump: Pump = bind_map(raw(&[("id", "p3")])).unwrap();
    assert_eq!(pump.control_side, None);
}
