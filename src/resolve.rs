//! Writer → reader projection of records.
//!
//! A record produced under one schema is rewritten so it conforms to another:
//! reader fields are looked up by name, missing ones take the reader default,
//! writer-only fields are dropped and numeric kinds are promoted the way Avro
//! schema resolution allows.
use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::json;
use crate::path::Cursor;
use crate::record::{Record, Value};
use crate::schema::{RecordSchema, Schema, SchemaKind};
use crate::unions::{self, names_match};
use crate::Limits;

pub fn project(value: &Value, writer: &Schema, reader: &Schema) -> Result<Value> {
    let limits = Limits::default();
    project_at(value, writer, reader, &Cursor::new(&limits))
}

pub fn project_record(record: &Record, writer: &Schema, reader: &Schema) -> Result<Record> {
    project_record_with_limits(record, writer, reader, &Limits::default())
}

pub fn project_record_with_limits(record: &Record, writer: &Schema, reader: &Schema, limits: &Limits) -> Result<Record> {
    let cx = Cursor::new(limits);
    match (writer, reader) {
        (Schema::Record(w), Schema::Record(r)) => project_fields(record, w, r, &cx),
        (Schema::Record(_), other) | (other, _) => Err(Error::mismatch(&cx.path, other.kind(), "record")),
    }
}

/// Whether data written as `writer` may be read as `reader`.
pub fn promotes(writer: SchemaKind, reader: SchemaKind) -> bool {
    use SchemaKind::*;
    writer == reader
        || matches!((writer, reader), (Int, Long | Float | Double) | (Long, Float | Double) | (Float, Double))
}

fn project_at(value: &Value, writer: &Schema, reader: &Schema, cx: &Cursor) -> Result<Value> {
    if let Schema::Union(branches) = writer {
        let Some(branch) = unions::matching_alternative(branches, value) else {
            return Err(Error::incompatible(
                &cx.path,
                format!("{} value matches no branch of the writer union", value.kind_name()),
            ));
        };
        return project_at(value, branch, reader, cx);
    }
    if let Schema::Union(branches) = reader {
        return unions::first_success(branches, &cx.path, |branch| project_at(value, writer, branch, cx)).map_err(
            |error| match error {
                Error::UnresolvableUnion { path } => Error::Incompatible {
                    path,
                    reason: format!("no branch of the reader union accepts {}", writer.kind()),
                },
                other => other,
            },
        );
    }

    if !promotes(writer.kind(), reader.kind()) {
        return Err(Error::incompatible(&cx.path, format!("cannot read {} as {}", writer.kind(), reader.kind())));
    }
    let mismatch = || Error::mismatch(&cx.path, writer.kind(), value.kind_name());

    Ok(match (reader, value) {
        (Schema::Fixed { .. } | Schema::Bytes, _) => return Err(Error::unsupported(&cx.path, reader.kind())),
        (Schema::Null, _) => Value::Null,
        (Schema::Boolean, Value::Boolean(b)) => Value::Boolean(*b),
        (Schema::Int, Value::Int(n)) => Value::Int(*n),
        (Schema::String, Value::String(s)) => Value::String(s.clone()),
        (Schema::Long, Value::Int(n)) => Value::Long(i64::from(*n)),
        (Schema::Long, Value::Long(n)) => Value::Long(*n),
        (Schema::Long, Value::String(s)) => Value::Long(s.parse().map_err(|_| mismatch())?),
        (Schema::Float, Value::Int(n)) => Value::float(*n as f32),
        (Schema::Float, Value::Long(n)) => Value::float(*n as f32),
        (Schema::Float, Value::Float(x)) => Value::Float(*x),
        (Schema::Double, Value::Int(n)) => Value::double(f64::from(*n)),
        (Schema::Double, Value::Long(n)) => Value::double(*n as f64),
        (Schema::Double, Value::Float(x)) => Value::double(f64::from(x.0)),
        (Schema::Double, Value::Double(x)) => Value::Double(*x),
        (Schema::Enum(r), Value::Enum(symbol) | Value::String(symbol)) => {
            if let Some(w) = writer.name().filter(|w| !names_match(w, &r.name)) {
                return Err(Error::incompatible(&cx.path, format!("enum {w} cannot be read as {}", r.name)));
            }
            if r.symbols.contains(symbol) {
                Value::Enum(symbol.clone())
            } else if let Some(default) = &r.default {
                Value::Enum(default.clone())
            } else {
                return Err(Error::incompatible(&cx.path, format!("symbol {symbol} is not in enum {}", r.name)));
            }
        }
        (Schema::Array(r), Value::Array(elements)) => {
            let Schema::Array(w) = writer else { return Err(mismatch()) };
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                out.push(project_at(element, w, r, &cx.index(i)?)?);
            }
            Value::Array(out)
        }
        (Schema::Map(r), Value::Map(entries)) => {
            let Schema::Map(w) = writer else { return Err(mismatch()) };
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                out.insert(key.clone(), project_at(entry, w, r, &cx.key(key)?)?);
            }
            Value::Map(out)
        }
        (Schema::Record(r), Value::Record(record)) => {
            let Schema::Record(w) = writer else { return Err(mismatch()) };
            Value::Record(project_fields(record, w, r, cx)?)
        }
        _ => return Err(mismatch()),
    })
}

fn reader_accepts_null(reader: &Schema) -> bool {
    match reader {
        Schema::Null => true,
        Schema::Union(branches) => unions::null_allowed(branches),
        _ => false,
    }
}

fn project_fields(record: &Record, writer: &RecordSchema, reader: &RecordSchema, cx: &Cursor) -> Result<Record> {
    if !names_match(&writer.name, &reader.name) {
        return Err(Error::incompatible(
            &cx.path,
            format!("record {} cannot be read as {}", writer.name, reader.name),
        ));
    }
    trace!(writer = %writer.name, reader = %reader.name, path = %cx.path, "projecting record");

    let mut out = Record::new(&reader.name);
    for field in &reader.fields {
        let cx = cx.field(&field.name)?;
        let written = writer.field(&field.name);
        let value = match (written, record.get(&field.name)) {
            (Some(w), Some(value)) => project_at(value, &w.schema, &field.schema, &cx)?,
            _ => match &field.default {
                Some(default) => json::default_at(default, &field.schema, &cx)?,
                None if written.is_some() => continue,
                None if reader_accepts_null(&field.schema) => Value::Null,
                None => {
                    return Err(Error::incompatible(
                        &cx.path,
                        "field is missing from the writer schema and has no default",
                    ));
                }
            },
        };
        out.put(field.name.clone(), value);
    }
    Ok(out)
}
