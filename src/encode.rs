//! Page → record.
//!
//! The page is walked under the target schema. Absent fields are skipped
//! rather than rejected, unions are resolved by ordered trial, and the first
//! hard failure aborts the whole call.
use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::path::Cursor;
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, Schema, SchemaKind};
use crate::tree::{is_reserved_key, Page, Property, Scalar};
use crate::unions;
use crate::Limits;

/// Encode `page` as a record of `schema`, which must be a record schema.
pub fn encode(page: &Page, schema: &Schema) -> Result<Record> {
    encode_with_limits(page, schema, &Limits::default())
}

pub fn encode_with_limits(page: &Page, schema: &Schema, limits: &Limits) -> Result<Record> {
    let cursor = Cursor::new(limits);
    match schema {
        Schema::Record(record) => encode_record(page, record, &cursor),
        other => Err(Error::mismatch(&cursor.path, other.kind(), "page")),
    }
}

fn encode_record(page: &Page, schema: &RecordSchema, cx: &Cursor) -> Result<Record> {
    trace!(record = %schema.name, path = %cx.path, "encoding page");
    let mut record = Record::new(&schema.name);
    for field in &schema.fields {
        let Some(property) = page.get(&field.name) else { continue };
        let cx = cx.field(&field.name)?;
        let value = encode_property(Some(property), &field.schema, &cx)?;
        record.put(field.name.clone(), value);
    }
    Ok(record)
}

/// `None` is an absent source value.
fn encode_property(property: Option<&Property>, schema: &Schema, cx: &Cursor) -> Result<Value> {
    let Some(property) = property else { return encode_absent(schema, cx) };
    match schema {
        Schema::Record(record) => match property {
            Property::Page(page) => encode_record(page, record, cx).map(Value::Record),
            other => Err(Error::mismatch(&cx.path, SchemaKind::Record, other.kind_name())),
        },
        Schema::Array(items) => {
            let Property::List(elements) = property else {
                return Err(Error::mismatch(&cx.path, SchemaKind::Array, property.kind_name()));
            };
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                out.push(encode_property(Some(element), items, &cx.index(i)?)?);
            }
            Ok(Value::Array(out))
        }
        Schema::Map(values) => {
            let entries: Box<dyn Iterator<Item = (&str, &Property)> + '_> = match property {
                Property::Group(group) => Box::new(group.iter().map(|(k, v)| (k.as_str(), v))),
                Property::Page(page) => Box::new(page.iter()),
                other => return Err(Error::mismatch(&cx.path, SchemaKind::Map, other.kind_name())),
            };
            let mut out = IndexMap::new();
            for (key, entry) in entries.filter(|(key, _)| !is_reserved_key(key)) {
                out.insert(key.to_owned(), encode_property(Some(entry), values, &cx.key(key)?)?);
            }
            Ok(Value::Map(out))
        }
        Schema::Enum(_) => scalar(property, cx, SchemaKind::Enum, |s| Some(Value::Enum(s.as_text().into_owned()))),
        Schema::String => scalar(property, cx, SchemaKind::String, |s| Some(Value::String(s.as_text().into_owned()))),
        Schema::Int => scalar(property, cx, SchemaKind::Int, |s| s.to_int().map(Value::Int)),
        Schema::Long => scalar(property, cx, SchemaKind::Long, |s| s.to_long().map(Value::Long)),
        Schema::Float => scalar(property, cx, SchemaKind::Float, |s| s.to_float().map(Value::float)),
        Schema::Double => scalar(property, cx, SchemaKind::Double, |s| s.to_double().map(Value::double)),
        Schema::Boolean => scalar(property, cx, SchemaKind::Boolean, |s| s.to_boolean().map(Value::Boolean)),
        Schema::Null => Err(Error::mismatch(&cx.path, SchemaKind::Null, property.kind_name())),
        Schema::Fixed { .. } | Schema::Bytes => Err(Error::unsupported(&cx.path, schema.kind())),
        Schema::Union(alternatives) => unions::first_success(alternatives, &cx.path, |alternative| {
            encode_property(Some(property), alternative, cx)
        }),
    }
}

/// An absent value under a union with a `null` alternative is null before any
/// other alternative is tried.
fn encode_absent(schema: &Schema, cx: &Cursor) -> Result<Value> {
    match schema {
        Schema::Union(alternatives) if unions::null_allowed(alternatives) => Ok(Value::Null),
        Schema::Union(alternatives) => {
            unions::first_success(alternatives, &cx.path, |alternative| encode_absent(alternative, cx))
        }
        Schema::Null => Ok(Value::Null),
        Schema::Array(_) => Ok(Value::Array(Vec::new())),
        other => Err(Error::mismatch(&cx.path, other.kind(), "absent value")),
    }
}

fn scalar(
    property: &Property,
    cx: &Cursor,
    expected: SchemaKind,
    coerce: impl FnOnce(&Scalar) -> Option<Value>,
) -> Result<Value> {
    match property {
        Property::Value(s) => coerce(s).ok_or_else(|| Error::mismatch(&cx.path, expected, s.kind_name())),
        other => Err(Error::mismatch(&cx.path, expected, other.kind_name())),
    }
}
