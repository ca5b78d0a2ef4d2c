//! Avro-style schema model.
//!
//! A [`Schema`] is a closed tree of tagged nodes. Named types referenced more
//! than once in the source text are expanded in place during parsing, so the
//! model never contains references and every walk is a plain recursive match.
pub mod parse;

use std::fmt;

use serde_json::{json, Map, Value as Json};

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    /// Recognised so it can be rejected; never encoded.
    Bytes,
    /// Recognised so it can be rejected; never encoded.
    Fixed { name: String, size: usize },
    Enum(EnumSchema),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(Vec<Schema>),
    Record(RecordSchema),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Default as written in the schema text (`Some(Null)` for `"default": null`).
    pub default: Option<Json>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: String,
    pub symbols: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Fixed,
    Enum,
    Array,
    Map,
    Union,
    Record,
}

impl SchemaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::String => "string",
            SchemaKind::Bytes => "bytes",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Union => "union",
            SchemaKind::Record => "record",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn parse_str(src: &str) -> crate::Result<Self> { parse::parse_str(src) }
    pub fn parse_value(json: &Json) -> crate::Result<Self> { parse::parse_value(json) }
    pub fn parse_str_with_limits(src: &str, limits: &crate::Limits) -> crate::Result<Self> {
        parse::parse_str_with_limits(src, limits)
    }

    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Schema::Record(RecordSchema { name: name.into(), fields })
    }

    pub fn enumeration<S: Into<String>>(name: impl Into<String>, symbols: impl IntoIterator<Item = S>) -> Self {
        Schema::Enum(EnumSchema {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
            default: None,
        })
    }

    pub fn array(items: Schema) -> Self { Schema::Array(Box::new(items)) }
    pub fn map(values: Schema) -> Self { Schema::Map(Box::new(values)) }

    /// `["null", inner]`, the usual optional-field shape.
    pub fn nullable(inner: Schema) -> Self { Schema::Union(vec![Schema::Null, inner]) }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int => SchemaKind::Int,
            Schema::Long => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::String => SchemaKind::String,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::Fixed { .. } => SchemaKind::Fixed,
            Schema::Enum(_) => SchemaKind::Enum,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Union(_) => SchemaKind::Union,
            Schema::Record(_) => SchemaKind::Record,
        }
    }

    /// Full name of a named type (record, enum, fixed).
    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            Schema::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Render back to Avro schema JSON. Named types are written out in full
    /// at every use.
    pub fn to_json(&self) -> Json {
        match self {
            Schema::Null | Schema::Boolean | Schema::Int | Schema::Long
            | Schema::Float | Schema::Double | Schema::String | Schema::Bytes => {
                Json::from(self.kind().as_str())
            }
            Schema::Fixed { name, size } => json!({ "type": "fixed", "name": name, "size": size }),
            Schema::Enum(e) => {
                let mut o = json!({ "type": "enum", "name": e.name, "symbols": e.symbols });
                if let Some(d) = &e.default { o["default"] = Json::from(d.clone()); }
                o
            }
            Schema::Array(items) => json!({ "type": "array", "items": items.to_json() }),
            Schema::Map(values) => json!({ "type": "map", "values": values.to_json() }),
            Schema::Union(alts) => Json::Array(alts.iter().map(Schema::to_json).collect()),
            Schema::Record(r) => {
                let fields = r.fields.iter().map(|f| {
                    let mut o = Map::new();
                    o.insert("name".into(), Json::from(f.name.clone()));
                    o.insert("type".into(), f.schema.to_json());
                    if let Some(d) = &f.default { o.insert("default".into(), d.clone()); }
                    Json::Object(o)
                }).collect::<Vec<_>>();
                json!({ "type": "record", "name": r.name, "fields": fields })
            }
        }
    }
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, default: None }
    }

    pub fn with_default(mut self, default: Json) -> Self {
        self.default = Some(default);
        self
    }
}
