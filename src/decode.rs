//! Record → page.
//!
//! The walk is driven by the schema the record was produced with, not by
//! whatever schema the caller will later read the page under. Fields added in
//! a newer schema therefore never appear, and fields dropped from it are still
//! carried over; reconciling the two is the caller's business.
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::path::Cursor;
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, Schema, SchemaKind};
use crate::tree::{Page, PageFactory, Property, Scalar};
use crate::unions;
use crate::Limits;

pub fn decode(record: &Record, schema: &Schema, factory: &dyn PageFactory) -> Result<Page> {
    decode_with_limits(record, schema, factory, &Limits::default())
}

pub fn decode_with_limits(
    record: &Record,
    schema: &Schema,
    factory: &dyn PageFactory,
    limits: &Limits,
) -> Result<Page> {
    let cursor = Cursor::new(limits);
    match schema {
        Schema::Record(rs) => decode_record(record, rs, factory, &cursor),
        other => Err(Error::mismatch(&cursor.path, other.kind(), "record")),
    }
}

fn decode_record(record: &Record, schema: &RecordSchema, factory: &dyn PageFactory, cx: &Cursor) -> Result<Page> {
    trace!(record = %schema.name, path = %cx.path, "decoding record");
    let mut page = factory.create_page(&schema.name);
    for field in &schema.fields {
        let Some(value) = record.get(&field.name) else { continue };
        let cx = cx.field(&field.name)?;
        if let Some(property) = decode_value(value, &field.schema, factory, &cx)? {
            page.insert(field.name.clone(), property);
        }
    }
    Ok(page)
}

/// `Ok(None)` leaves the key absent in the page.
fn decode_value(value: &Value, schema: &Schema, factory: &dyn PageFactory, cx: &Cursor) -> Result<Option<Property>> {
    if value.is_null() {
        return Ok(None);
    }
    let mismatch = |expected: SchemaKind| Error::mismatch(&cx.path, expected, value.kind_name());

    let property = match (schema, value) {
        (Schema::Union(alternatives), value) => {
            return match unions::matching_alternative(alternatives, value) {
                Some(alternative) => decode_value(value, alternative, factory, cx),
                None => {
                    debug!(path = %cx.path, found = value.kind_name(), "no union alternative matches, field omitted");
                    Ok(None)
                }
            };
        }
        (Schema::Record(rs), Value::Record(inner)) => Property::Page(decode_record(inner, rs, factory, cx)?),
        (Schema::Array(items), Value::Array(elements)) => {
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                if let Some(property) = decode_value(element, items, factory, &cx.index(i)?)? {
                    out.push(property);
                }
            }
            Property::List(out)
        }
        (Schema::Map(values), Value::Map(entries)) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                if let Some(property) = decode_value(entry, values, factory, &cx.key(key)?)? {
                    out.insert(key.clone(), property);
                }
            }
            Property::Group(out)
        }
        (Schema::Enum(_), Value::Enum(s) | Value::String(s)) => Scalar::Text(s.clone()).into(),
        (Schema::String, Value::String(s)) => Scalar::Text(s.clone()).into(),
        (Schema::Long, Value::Long(_) | Value::Int(_) | Value::String(_)) => match value.to_text() {
            Some(text) => Scalar::Text(text.into_owned()).into(),
            None => return Err(mismatch(SchemaKind::Long)),
        },
        (Schema::Int, Value::Int(n)) => Scalar::Integer(i64::from(*n)).into(),
        (Schema::Boolean, Value::Boolean(b)) => Scalar::Boolean(*b).into(),
        (Schema::Double, Value::Double(x)) => Property::from(x.0),
        (Schema::Float, Value::Float(x)) => Property::from(f64::from(x.0)),
        (Schema::Fixed { .. } | Schema::Bytes, _) => return Err(Error::unsupported(&cx.path, schema.kind())),
        (Schema::Null, _) => return Ok(None),
        (schema, _) => return Err(mismatch(schema.kind())),
    };
    Ok(Some(property))
}
