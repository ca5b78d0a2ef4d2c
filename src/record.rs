//! Schema-typed generic record values.
use std::borrow::Cow;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

/// A generic datum. Unions carry no tag: the value is whatever the resolved
/// alternative produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    Enum(String),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    Record(Record),
}

/// Field values of one record, in schema declaration order. A field with no
/// entry is absent; the schema layer decides what that means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    name: String,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: IndexMap::new() }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }
    pub fn contains(&self, field: &str) -> bool { self.fields.contains_key(field) }
    pub fn put(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(field.into(), value)
    }
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(field, value.into());
        self
    }
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl Value {
    pub fn double(x: f64) -> Self { Value::Double(OrderedFloat(x)) }
    pub fn float(x: f32) -> Self { Value::Float(OrderedFloat(x)) }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Enum(_) => "enum symbol",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_record(&self) -> Option<&Record> {
        match self { Value::Record(r) => Some(r), _ => None }
    }

    /// Textual form of scalar values; `None` for containers and null.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        Some(match self {
            Value::String(s) | Value::Enum(s) => Cow::Borrowed(s.as_str()),
            Value::Boolean(b) => Cow::Owned(b.to_string()),
            Value::Int(n) => Cow::Owned(n.to_string()),
            Value::Long(n) => Cow::Owned(n.to_string()),
            Value::Float(x) => Cow::Owned(crate::tree::format_double(f64::from(x.0))),
            Value::Double(x) => Cow::Owned(crate::tree::format_double(x.0)),
            Value::Null | Value::Array(_) | Value::Map(_) | Value::Record(_) => return None,
        })
    }
}

impl From<bool> for Value { fn from(b: bool) -> Self { Value::Boolean(b) } }
impl From<i32> for Value { fn from(n: i32) -> Self { Value::Int(n) } }
impl From<i64> for Value { fn from(n: i64) -> Self { Value::Long(n) } }
impl From<f32> for Value { fn from(x: f32) -> Self { Value::float(x) } }
impl From<f64> for Value { fn from(x: f64) -> Self { Value::double(x) } }
impl From<&str> for Value { fn from(s: &str) -> Self { Value::String(s.to_owned()) } }
impl From<String> for Value { fn from(s: String) -> Self { Value::String(s) } }
impl From<Record> for Value { fn from(r: Record) -> Self { Value::Record(r) } }
impl From<Vec<Value>> for Value { fn from(xs: Vec<Value>) -> Self { Value::Array(xs) } }
impl From<IndexMap<String, Value>> for Value { fn from(m: IndexMap<String, Value>) -> Self { Value::Map(m) } }
