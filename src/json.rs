//! JSON views of pages and records.
//!
//! Pages map onto plain JSON objects (`pxObjClass` carries the class name,
//! `null` means absent). Records are written the way Avro's JSON form would
//! print them minus union tags; reading them back is schema-guided. Floating
//! values JSON cannot hold are written as `"NaN"`, `"Infinity"`, `"-Infinity"`.
use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use crate::error::{Error, Result};
use crate::path::{Cursor, FieldPath};
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, Schema, SchemaKind};
use crate::tree::{format_double, narrow, Page, Property, Scalar, CLASS_KEY};
use crate::unions;
use crate::Limits;

pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn double_to_json(x: f64) -> Json {
    Number::from_f64(x).map(Json::Number).unwrap_or_else(|| Json::String(format_double(x)))
}

fn json_to_double(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PAGES
// ————————————————————————————————————————————————————————————————————————————

pub fn page_to_json(page: &Page) -> Json {
    let mut out = Map::new();
    if !page.class_name().is_empty() {
        out.insert(CLASS_KEY.to_owned(), Json::from(page.class_name()));
    }
    for (key, property) in page.iter() {
        out.insert(key.to_owned(), property_to_json(property));
    }
    Json::Object(out)
}

pub fn property_to_json(property: &Property) -> Json {
    match property {
        Property::Value(Scalar::Text(s)) => Json::from(s.clone()),
        Property::Value(Scalar::Integer(n)) => Json::from(*n),
        Property::Value(Scalar::Double(x)) => double_to_json(x.0),
        Property::Value(Scalar::Boolean(b)) => Json::from(*b),
        Property::Page(page) => page_to_json(page),
        Property::List(xs) => Json::Array(xs.iter().map(property_to_json).collect()),
        Property::Group(group) => Json::Object(
            group.iter().map(|(k, v)| (k.clone(), property_to_json(v))).collect(),
        ),
    }
}

/// Read a page from a JSON object. Nested objects become pages, arrays
/// become lists, and `null` entries are left out.
pub fn page_from_json(json: &Json) -> Result<Page> {
    match json {
        Json::Object(obj) => Ok(page_from_object(obj)),
        other => Err(Error::mismatch(&FieldPath::root(), SchemaKind::Record, json_kind(other))),
    }
}

fn page_from_object(obj: &Map<String, Json>) -> Page {
    let class_name = obj.get(CLASS_KEY).and_then(Json::as_str).unwrap_or_default();
    let mut page = Page::new(class_name);
    for (key, json) in obj.iter().filter(|(key, _)| key.as_str() != CLASS_KEY) {
        if let Some(property) = property_from_json(json) {
            page.insert(key.clone(), property);
        }
    }
    page
}

fn property_from_json(json: &Json) -> Option<Property> {
    Some(match json {
        Json::Null => return None,
        Json::Bool(b) => Property::from(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Property::from(i),
            None => Property::from(n.as_f64()?),
        },
        Json::String(s) => Property::from(s.clone()),
        Json::Array(xs) => Property::List(xs.iter().filter_map(property_from_json).collect()),
        Json::Object(obj) => Property::Page(page_from_object(obj)),
    })
}

// ————————————————————————————————————————————————————————————————————————————
// RECORDS
// ————————————————————————————————————————————————————————————————————————————

pub fn record_to_json(record: &Record) -> Json {
    Json::Object(record.fields().map(|(k, v)| (k.to_owned(), value_to_json(v))).collect())
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::from(*b),
        Value::Int(n) => Json::from(*n),
        Value::Long(n) => Json::from(*n),
        Value::Float(x) => double_to_json(f64::from(x.0)),
        Value::Double(x) => double_to_json(x.0),
        Value::String(s) | Value::Enum(s) => Json::from(s.clone()),
        Value::Array(xs) => Json::Array(xs.iter().map(value_to_json).collect()),
        Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect()),
        Value::Record(r) => record_to_json(r),
    }
}

/// Read a record of `schema` from JSON. Missing fields take the schema
/// default when there is one and stay absent otherwise.
pub fn record_from_json(json: &Json, schema: &Schema) -> Result<Record> {
    let limits = Limits::default();
    let cx = Cursor::new(&limits);
    match (schema, json) {
        (Schema::Record(rs), Json::Object(obj)) => record_from_object(obj, rs, &cx),
        (Schema::Record(_), other) => Err(Error::mismatch(&cx.path, SchemaKind::Record, json_kind(other))),
        (other, _) => Err(Error::mismatch(&cx.path, other.kind(), "object")),
    }
}

pub fn value_from_json(json: &Json, schema: &Schema) -> Result<Value> {
    let limits = Limits::default();
    from_json(json, schema, &Cursor::new(&limits))
}

/// Convert a field default. Union defaults belong to the first alternative.
pub fn default_value(default: &Json, schema: &Schema) -> Result<Value> {
    let limits = Limits::default();
    default_at(default, schema, &Cursor::new(&limits))
}

pub(crate) fn default_at(default: &Json, schema: &Schema, cx: &Cursor) -> Result<Value> {
    match schema {
        Schema::Union(alternatives) => match alternatives.first() {
            Some(first) => from_json(default, first, cx),
            None => Err(Error::mismatch(&cx.path, SchemaKind::Union, json_kind(default))),
        },
        other => from_json(default, other, cx),
    }
}

fn record_from_object(obj: &Map<String, Json>, schema: &RecordSchema, cx: &Cursor) -> Result<Record> {
    let mut record = Record::new(&schema.name);
    for field in &schema.fields {
        let cx = cx.field(&field.name)?;
        let value = match (obj.get(&field.name), &field.default) {
            (Some(json), _) => from_json(json, &field.schema, &cx)?,
            (None, Some(default)) => default_at(default, &field.schema, &cx)?,
            (None, None) => continue,
        };
        record.put(field.name.clone(), value);
    }
    Ok(record)
}

fn from_json(json: &Json, schema: &Schema, cx: &Cursor) -> Result<Value> {
    let scalar = |value: Option<Value>| {
        value.ok_or_else(|| Error::mismatch(&cx.path, schema.kind(), json_kind(json)))
    };
    match schema {
        Schema::Union(alternatives) => {
            if json.is_null() && unions::null_allowed(alternatives) {
                return Ok(Value::Null);
            }
            unions::first_success(alternatives, &cx.path, |alternative| from_json(json, alternative, cx))
        }
        Schema::Null => scalar(json.is_null().then_some(Value::Null)),
        Schema::Boolean => scalar(json.as_bool().map(Value::Boolean)),
        Schema::Int => scalar(json.as_i64().and_then(|n| i32::try_from(n).ok()).map(Value::Int)),
        Schema::Long => scalar(json.as_i64().map(Value::Long)),
        Schema::Float => scalar(json_to_double(json).and_then(narrow).map(Value::float)),
        Schema::Double => scalar(json_to_double(json).map(Value::double)),
        Schema::String => scalar(json.as_str().map(|s| Value::String(s.to_owned()))),
        Schema::Enum(e) => scalar(
            json.as_str()
                .filter(|s| e.symbols.iter().any(|symbol| symbol.as_str() == *s))
                .map(|s| Value::Enum(s.to_owned())),
        ),
        Schema::Array(items) => {
            let Json::Array(xs) = json else { return scalar(None) };
            let mut out = Vec::with_capacity(xs.len());
            for (i, x) in xs.iter().enumerate() {
                out.push(from_json(x, items, &cx.index(i)?)?);
            }
            Ok(Value::Array(out))
        }
        Schema::Map(values) => {
            let Json::Object(obj) = json else { return scalar(None) };
            let mut out = IndexMap::with_capacity(obj.len());
            for (key, x) in obj {
                out.insert(key.clone(), from_json(x, values, &cx.key(key)?)?);
            }
            Ok(Value::Map(out))
        }
        Schema::Record(rs) => {
            let Json::Object(obj) = json else { return scalar(None) };
            record_from_object(obj, rs, cx).map(Value::Record)
        }
        Schema::Fixed { .. } | Schema::Bytes => Err(Error::unsupported(&cx.path, schema.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    #[test]
    fn page_json_round_trip() {
        let src = json!({
            "pxObjClass": "ContainerPage",
            "id": 53535353535_i64,
            "singleEmbeddedPage": {"pxObjClass": "SingleEmbeddedPage", "stringField": "String instance", "doubleField": 4.88},
            "objectArrayField": [{"stringField": "object array, item 1"}, {"stringField": "object array, item 2"}],
            "flag": true
        });
        let page = page_from_json(&src).unwrap();
        assert_eq!(page.class_name(), "ContainerPage");
        assert!(!page.contains_key("pxObjClass"));
        assert_eq!(page.scalar("id"), Some(&Scalar::Integer(53535353535)));
        assert_eq!(page.page("singleEmbeddedPage").unwrap().class_name(), "SingleEmbeddedPage");
        assert_eq!(page.get("objectArrayField").and_then(Property::as_list).map(<[_]>::len), Some(2));
        assert_eq!(page_to_json(&page), src);
    }

    #[test]
    fn nulls_are_absent_and_non_finite_doubles_become_strings() {
        let page = page_from_json(&json!({"a": null, "b": 1.5})).unwrap();
        assert_eq!(page.keys().collect::<Vec<_>>(), ["b"]);

        let page = Page::new("").with("nan", f64::NAN).with("inf", f64::INFINITY);
        assert_eq!(page_to_json(&page), json!({"nan": "NaN", "inf": "Infinity"}));
    }

    #[test]
    fn records_read_back_under_their_schema() {
        let schema = Schema::record("ContainerPage", vec![
            Field::new("id", Schema::Union(vec![Schema::Long, Schema::String])),
            Field::new("ratio", Schema::Double),
            Field::new("category", Schema::enumeration("Category", ["A", "B"])),
            Field::new("note", Schema::nullable(Schema::String)),
            Field::new("iban", Schema::String).with_default(json!("")),
            Field::new("scores", Schema::map(Schema::Float)),
        ]);
        let src = json!({
            "id": 53535353535_i64,
            "ratio": "-Infinity",
            "category": "B",
            "note": null,
            "scores": {"x": 1.5}
        });
        let record = record_from_json(&src, &schema).unwrap();
        assert_eq!(record.get("id"), Some(&Value::Long(53535353535)));
        assert_eq!(record.get("ratio"), Some(&Value::double(f64::NEG_INFINITY)));
        assert_eq!(record.get("category"), Some(&Value::Enum("B".into())));
        assert_eq!(record.get("note"), Some(&Value::Null));
        assert_eq!(record.get("iban"), Some(&Value::String(String::new())));

        let back = record_to_json(&record);
        assert_eq!(back["ratio"], json!("-Infinity"));
        assert_eq!(back["scores"], json!({"x": 1.5}));
    }

    #[test]
    fn unknown_enum_symbols_are_rejected() {
        let schema = Schema::record("R", vec![Field::new("c", Schema::enumeration("C", ["A"]))]);
        match record_from_json(&json!({"c": "Z"}), &schema) {
            Err(Error::TypeMismatch { path, expected: SchemaKind::Enum, found: "string" }) => {
                assert_eq!(path.to_string(), "c")
            }
            other => panic!("expected enum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn union_defaults_use_the_first_alternative() {
        let schema = Schema::nullable(Schema::String);
        assert_eq!(default_value(&Json::Null, &schema).unwrap(), Value::Null);
        assert!(default_value(&json!("x"), &schema).is_err());
        assert_eq!(default_value(&json!(3), &Schema::Long).unwrap(), Value::Long(3));
    }
}
