//! Union resolution.
//!
//! The two directions resolve unions differently and must stay that way:
//!
//! - encoding starts from untyped page data, so alternatives are *tried* in
//!   declaration order and the first one that encodes cleanly wins;
//! - decoding starts from a value that already has a runtime type, so the
//!   alternative is picked by a structural match and a miss is not an error.
use tracing::debug;

use crate::error::{Error, Result};
use crate::path::FieldPath;
use crate::record::Value;
use crate::schema::Schema;

pub fn null_allowed(alternatives: &[Schema]) -> bool {
    alternatives.iter().any(|s| matches!(s, Schema::Null))
}

/// Run `attempt` against each alternative in order and keep the first
/// success. Rejections are logged and skipped, except depth errors, which
/// no other alternative could fix.
pub(crate) fn first_success<T>(
    alternatives: &[Schema],
    path: &FieldPath,
    mut attempt: impl FnMut(&Schema) -> Result<T>,
) -> Result<T> {
    for alternative in alternatives {
        match attempt(alternative) {
            Ok(out) => return Ok(out),
            Err(error @ Error::DepthExceeded { .. }) => return Err(error),
            Err(error) => {
                debug!(path = %path, alternative = %alternative.kind(), %error, "union alternative rejected");
            }
        }
    }
    Err(Error::UnresolvableUnion { path: path.clone() })
}

/// First alternative whose shape fits the runtime type of `value`. A record
/// value prefers the record alternative carrying its name and otherwise takes
/// the first record alternative.
pub fn matching_alternative<'s>(alternatives: &'s [Schema], value: &Value) -> Option<&'s Schema> {
    if let Value::Record(record) = value {
        let named = alternatives
            .iter()
            .find(|s| matches!(s, Schema::Record(r) if names_match(record.name(), &r.name)));
        if named.is_some() {
            return named;
        }
    }
    alternatives.iter().find(|s| value_matches_schema(s, value))
}

/// Structural compatibility between a runtime value and one schema node.
pub fn value_matches_schema(schema: &Schema, value: &Value) -> bool {
    match schema {
        Schema::Record(_) => matches!(value, Value::Record(_)),
        Schema::Enum(_) => matches!(value, Value::Enum(_) | Value::String(_)),
        Schema::Array(_) => matches!(value, Value::Array(_)),
        Schema::Map(_) => matches!(value, Value::Map(_)),
        Schema::String => matches!(value, Value::String(_)),
        Schema::Int => matches!(value, Value::Int(_)),
        Schema::Long => match value {
            Value::Long(_) | Value::Int(_) => true,
            Value::String(s) | Value::Enum(s) => s.parse::<i64>().is_ok(),
            _ => false,
        },
        Schema::Float => matches!(value, Value::Float(_)),
        Schema::Double => matches!(value, Value::Double(_)),
        Schema::Boolean => matches!(value, Value::Boolean(_)),
        Schema::Null => value.is_null(),
        Schema::Union(_) | Schema::Fixed { .. } | Schema::Bytes => false,
    }
}

/// Record names agree when equal, when either side is unnamed, or when their
/// unqualified parts agree.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a == b || a.is_empty() || b.is_empty() || a.rsplit('.').next() == b.rsplit('.').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::schema::Field;

    #[test]
    fn null_is_detected_anywhere_in_the_union() {
        assert!(null_allowed(&[Schema::Boolean, Schema::Null]));
        assert!(!null_allowed(&[Schema::Int, Schema::String]));
    }

    #[test]
    fn first_success_keeps_declaration_order() {
        let alts = [Schema::Int, Schema::Long, Schema::String];
        let mut tried = Vec::new();
        let picked = first_success(&alts, &FieldPath::root(), |s| {
            tried.push(s.kind());
            match s {
                Schema::Int => Err(Error::mismatch(&FieldPath::root(), s.kind(), "text")),
                _ => Ok(s.kind()),
            }
        }).unwrap();
        assert_eq!(picked, crate::SchemaKind::Long);
        assert_eq!(tried.len(), 2);
    }

    #[test]
    fn first_success_reports_the_union_path_when_nothing_fits() {
        let path = FieldPath::root().field("age");
        let out: Result<()> = first_success(&[Schema::Int, Schema::Boolean], &path, |s| {
            Err(Error::mismatch(&path, s.kind(), "page"))
        });
        match out {
            Err(Error::UnresolvableUnion { path }) => assert_eq!(path.to_string(), "age"),
            other => panic!("expected unresolvable union, got {other:?}"),
        }
    }

    #[test]
    fn first_success_stops_on_depth_errors() {
        let mut calls = 0;
        let out: Result<()> = first_success(&[Schema::Int, Schema::String], &FieldPath::root(), |_| {
            calls += 1;
            Err(Error::DepthExceeded { path: FieldPath::root(), limit: 1 })
        });
        assert!(matches!(out, Err(Error::DepthExceeded { .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn structural_matching() {
        let city = Schema::record("City", vec![Field::new("name", Schema::String)]);
        let town = Schema::record("Town", vec![Field::new("name", Schema::String)]);
        let value = Value::Record(Record::new("City"));
        assert_eq!(matching_alternative(&[Schema::Null, town.clone(), city.clone()], &value), Some(&city));
        assert_eq!(matching_alternative(&[Schema::Null, city.clone(), town.clone()], &value), Some(&city));

        let unnamed_match = Value::Record(Record::new("Village"));
        assert_eq!(matching_alternative(&[Schema::Null, town.clone(), city.clone()], &unnamed_match), Some(&town));
        assert!(value_matches_schema(&city, &unnamed_match));

        assert!(value_matches_schema(&Schema::Long, &Value::String("53535353535".into())));
        assert!(value_matches_schema(&Schema::Long, &Value::Int(5)));
        assert!(!value_matches_schema(&Schema::Long, &Value::String("five".into())));
        assert!(value_matches_schema(&Schema::enumeration("E", ["A"]), &Value::String("A".into())));
        assert!(!value_matches_schema(&Schema::String, &Value::Enum("A".into())));
        assert!(!value_matches_schema(&Schema::Double, &Value::float(1.0)));
        assert!(value_matches_schema(&Schema::Null, &Value::Null));
        assert!(!value_matches_schema(&Schema::Bytes, &Value::String("x".into())));
        assert_eq!(matching_alternative(&[Schema::Int, Schema::Boolean], &Value::Null), None);
    }
}
