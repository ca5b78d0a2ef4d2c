//! Avro JSON schema text → [`Schema`].
//!
//! Walks the `serde_json::Value` document directly so every error can name
//! the JSON pointer of the node that caused it. Named types are recorded in a
//! per-parse table; a later reference by name clones the definition, so the
//! expanded tree is charged against [`Limits::max_schema_nodes`] as it grows.
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as Json};

use super::{EnumSchema, Field, RecordSchema, Schema, SchemaKind};
use crate::error::{Error, Result};
use crate::json::json_kind;
use crate::Limits;

static NAME_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub fn parse_str(src: &str) -> Result<Schema> {
    parse_str_with_limits(src, &Limits::default())
}

pub fn parse_str_with_limits(src: &str, limits: &Limits) -> Result<Schema> {
    let json = serde_json::from_str::<Json>(src).map_err(|error| Error::Schema {
        path: format!("line {} column {}", error.line(), error.column()),
        message: error.to_string(),
    })?;
    parse_value_with_limits(&json, limits)
}

pub fn parse_value(json: &Json) -> Result<Schema> {
    parse_value_with_limits(json, &Limits::default())
}

pub fn parse_value_with_limits(json: &Json, limits: &Limits) -> Result<Schema> {
    Parser::new(limits.max_schema_nodes).parse(json, None, "#")
}

fn invalid(at: &str, message: impl Into<String>) -> Error {
    Error::Schema { path: at.to_owned(), message: message.into() }
}

fn primitive(name: &str) -> Option<Schema> {
    Some(match name {
        "null" => Schema::Null,
        "boolean" => Schema::Boolean,
        "int" => Schema::Int,
        "long" => Schema::Long,
        "float" => Schema::Float,
        "double" => Schema::Double,
        "string" => Schema::String,
        "bytes" => Schema::Bytes,
        _ => return None,
    })
}

struct Parser {
    /// Named definitions with their expanded node counts.
    named: HashMap<String, (Schema, usize)>,
    defining: HashSet<String>,
    nodes: usize,
    budget: usize,
}

impl Parser {
    fn new(budget: usize) -> Self {
        Self { named: HashMap::new(), defining: HashSet::new(), nodes: 0, budget }
    }

    fn charge(&mut self, nodes: usize, at: &str) -> Result<()> {
        self.nodes = self.nodes.saturating_add(nodes);
        if self.nodes > self.budget {
            return Err(invalid(at, format!("schema expands to more than {} nodes", self.budget)));
        }
        Ok(())
    }

    fn parse(&mut self, json: &Json, namespace: Option<&str>, at: &str) -> Result<Schema> {
        match json {
            Json::String(name) => self.parse_name(name, namespace, at),
            Json::Array(alts) => self.parse_union(alts, namespace, at),
            Json::Object(obj) => self.parse_object(obj, namespace, at),
            other => Err(invalid(at, format!(
                "expected a type name, union or object, found {}", json_kind(other)
            ))),
        }
    }

    fn parse_name(&mut self, name: &str, namespace: Option<&str>, at: &str) -> Result<Schema> {
        if let Some(schema) = primitive(name) {
            self.charge(1, at)?;
            return Ok(schema);
        }
        let full = qualify(name, namespace);
        if self.defining.contains(&full) {
            return Err(invalid(at, format!("recursive reference to `{full}` is not supported")));
        }
        let key = if self.named.contains_key(&full) { full } else { name.to_owned() };
        let Some(&(_, size)) = self.named.get(&key) else {
            return Err(invalid(at, format!("unknown type `{name}`")));
        };
        self.charge(size, at)?;
        Ok(self.named[&key].0.clone())
    }

    fn parse_union(&mut self, alts: &[Json], namespace: Option<&str>, at: &str) -> Result<Schema> {
        self.charge(1, at)?;
        let mut out = Vec::with_capacity(alts.len());
        let mut seen_kinds = HashSet::<SchemaKind>::new();
        let mut seen_names = HashSet::<String>::new();
        for (i, alt) in alts.iter().enumerate() {
            let at = format!("{at}/{i}");
            let schema = self.parse(alt, namespace, &at)?;
            if let Schema::Union(_) = schema {
                return Err(invalid(&at, "unions may not directly contain another union"));
            }
            let duplicate = match schema.name() {
                Some(name) => !seen_names.insert(name.to_owned()),
                None => !seen_kinds.insert(schema.kind()),
            };
            if duplicate {
                return Err(invalid(&at, format!("duplicate `{}` alternative in union", schema.kind())));
            }
            out.push(schema);
        }
        Ok(Schema::Union(out))
    }

    fn parse_object(&mut self, obj: &Map<String, Json>, namespace: Option<&str>, at: &str) -> Result<Schema> {
        let ty = obj.get("type").ok_or_else(|| invalid(at, "missing `type`"))?;
        let ty = match ty {
            Json::String(ty) => ty.as_str(),
            nested => return self.parse(nested, namespace, &format!("{at}/type")),
        };
        match ty {
            "record" | "error" => self.parse_record(obj, namespace, at),
            "enum" => self.parse_enum(obj, namespace, at),
            "fixed" => self.parse_fixed(obj, namespace, at),
            "array" => {
                self.charge(1, at)?;
                let items = obj.get("items").ok_or_else(|| invalid(at, "array without `items`"))?;
                Ok(Schema::array(self.parse(items, namespace, &format!("{at}/items"))?))
            }
            "map" => {
                self.charge(1, at)?;
                let values = obj.get("values").ok_or_else(|| invalid(at, "map without `values`"))?;
                Ok(Schema::map(self.parse(values, namespace, &format!("{at}/values"))?))
            }
            // primitives, possibly annotated with a logical type we read as the base type
            other => self.parse_name(other, namespace, &format!("{at}/type")),
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Json>, namespace: Option<&str>, at: &str) -> Result<Schema> {
        let (full, namespace) = self.declare(obj, namespace, at)?;
        let raw_fields = match obj.get("fields") {
            Some(Json::Array(fields)) => fields,
            Some(other) => return Err(invalid(at, format!("`fields` must be an array, found {}", json_kind(other)))),
            None => return Err(invalid(at, "record without `fields`")),
        };

        let start = self.nodes;
        self.charge(1, at)?;
        self.defining.insert(full.clone());
        let mut fields = Vec::with_capacity(raw_fields.len());
        for (i, raw) in raw_fields.iter().enumerate() {
            let at = format!("{at}/fields/{i}");
            let Json::Object(raw) = raw else {
                return Err(invalid(&at, "field must be an object"));
            };
            let name = match raw.get("name") {
                Some(Json::String(name)) if NAME_RX.is_match(name) => name.clone(),
                Some(Json::String(name)) => return Err(invalid(&at, format!("invalid field name `{name}`"))),
                _ => return Err(invalid(&at, "field without a `name`")),
            };
            if fields.iter().any(|f: &Field| f.name == name) {
                return Err(invalid(&at, format!("duplicate field `{name}`")));
            }
            let ty = raw.get("type").ok_or_else(|| invalid(&at, format!("field `{name}` without `type`")))?;
            let schema = self.parse(ty, namespace.as_deref(), &format!("{at}/type"))?;
            fields.push(Field { name, schema, default: raw.get("default").cloned() });
        }
        self.defining.remove(&full);

        let schema = Schema::Record(RecordSchema { name: full.clone(), fields });
        self.named.insert(full, (schema.clone(), self.nodes - start));
        Ok(schema)
    }

    fn parse_enum(&mut self, obj: &Map<String, Json>, namespace: Option<&str>, at: &str) -> Result<Schema> {
        let (full, _) = self.declare(obj, namespace, at)?;
        let Some(Json::Array(raw)) = obj.get("symbols") else {
            return Err(invalid(at, "enum without a `symbols` array"));
        };
        let mut symbols = Vec::<String>::with_capacity(raw.len());
        for (i, symbol) in raw.iter().enumerate() {
            match symbol {
                Json::String(s) if !NAME_RX.is_match(s) => {
                    return Err(invalid(&format!("{at}/symbols/{i}"), format!("invalid symbol `{s}`")));
                }
                Json::String(s) if symbols.contains(s) => {
                    return Err(invalid(&format!("{at}/symbols/{i}"), format!("duplicate symbol `{s}`")));
                }
                Json::String(s) => symbols.push(s.clone()),
                other => {
                    return Err(invalid(&format!("{at}/symbols/{i}"), format!("symbol must be a string, found {}", json_kind(other))));
                }
            }
        }
        let default = match obj.get("default") {
            None => None,
            Some(Json::String(d)) if symbols.contains(d) => Some(d.clone()),
            Some(_) => return Err(invalid(&format!("{at}/default"), "enum default must be one of its symbols")),
        };
        self.charge(1, at)?;
        let schema = Schema::Enum(EnumSchema { name: full.clone(), symbols, default });
        self.named.insert(full, (schema.clone(), 1));
        Ok(schema)
    }

    fn parse_fixed(&mut self, obj: &Map<String, Json>, namespace: Option<&str>, at: &str) -> Result<Schema> {
        let (full, _) = self.declare(obj, namespace, at)?;
        let size = obj
            .get("size")
            .and_then(Json::as_u64)
            .ok_or_else(|| invalid(at, "fixed without a numeric `size`"))?;
        self.charge(1, at)?;
        let schema = Schema::Fixed { name: full.clone(), size: size as usize };
        self.named.insert(full, (schema.clone(), 1));
        Ok(schema)
    }

    /// Validate the name of a named type and work out its full name and the
    /// namespace its children inherit.
    fn declare(&self, obj: &Map<String, Json>, namespace: Option<&str>, at: &str) -> Result<(String, Option<String>)> {
        let name = match obj.get("name") {
            Some(Json::String(name)) => name.as_str(),
            _ => return Err(invalid(at, "named type without a `name`")),
        };
        let namespace = match obj.get("namespace") {
            Some(Json::String(ns)) if !ns.is_empty() => Some(ns.as_str()),
            Some(Json::String(_)) => None,
            _ => namespace,
        };
        let full = qualify(name, namespace);
        if !full.split('.').all(|part| NAME_RX.is_match(part)) {
            return Err(invalid(at, format!("invalid name `{full}`")));
        }
        if self.named.contains_key(&full) || self.defining.contains(&full) {
            return Err(invalid(at, format!("`{full}` is defined more than once")));
        }
        let inherited = full.rsplit_once('.').map(|(ns, _)| ns.to_owned());
        Ok((full, inherited))
    }
}

fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') => format!("{ns}.{name}"),
        _ => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_error(src: &str) -> (String, String) {
        match parse_str(src) {
            Err(Error::Schema { path, message }) => (path, message),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_record_with_every_supported_kind() {
        let src = r#"{
            "type": "record", "name": "SingleEmbeddedPage",
            "fields": [
                {"name": "stringField", "type": "string"},
                {"name": "enumField", "type": {"type": "enum", "name": "Category", "symbols": ["A", "B", "C"]}},
                {"name": "integerField", "type": "int"},
                {"name": "longField", "type": "long"},
                {"name": "floatField", "type": "float"},
                {"name": "doubleField", "type": "double"},
                {"name": "booleanField", "type": "boolean"},
                {"name": "nullField", "type": "null", "default": null},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "scores", "type": {"type": "map", "values": ["null", "double"]}},
                {"name": "uuid", "type": {"type": "string", "logicalType": "uuid"}}
            ]
        }"#;
        let schema = parse_str(src).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.name, "SingleEmbeddedPage");
        assert_eq!(record.fields.len(), 11);
        assert_eq!(record.field("enumField").unwrap().schema, Schema::enumeration("Category", ["A", "B", "C"]));
        assert_eq!(record.field("nullField").unwrap().default, Some(Json::Null));
        assert_eq!(record.field("stringField").unwrap().default, None);
        assert_eq!(record.field("scores").unwrap().schema, Schema::map(Schema::nullable(Schema::Double)));
        assert_eq!(record.field("uuid").unwrap().schema, Schema::String);
    }

    #[test]
    fn named_types_are_reused_by_reference_and_namespaced() {
        let src = r#"{
            "type": "record", "name": "Country", "namespace": "geo",
            "fields": [
                {"name": "capital", "type": {"type": "record", "name": "City", "fields": [
                    {"name": "name", "type": ["null", "string"]}
                ]}},
                {"name": "largest", "type": "City"},
                {"name": "second", "type": "geo.City"}
            ]
        }"#;
        let schema = parse_str(src).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.name, "geo.Country");
        let capital = &record.field("capital").unwrap().schema;
        assert_eq!(capital.name(), Some("geo.City"));
        assert_eq!(&record.field("largest").unwrap().schema, capital);
        assert_eq!(&record.field("second").unwrap().schema, capital);
    }

    #[test]
    fn rejects_malformed_schemas_with_a_pointer() {
        let (path, message) = schema_error(r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "Nope"}]}"#);
        assert_eq!(path, "#/fields/0/type");
        assert!(message.contains("unknown type"));

        let (path, _) = schema_error(r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": ["null", "int", "null"]}]}"#);
        assert_eq!(path, "#/fields/0/type/2");

        let (_, message) = schema_error(r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}, {"name": "a", "type": "long"}]}"#);
        assert!(message.contains("duplicate field"));

        let (_, message) = schema_error(r#"{"type": "enum", "name": "E", "symbols": ["A", "A"]}"#);
        assert!(message.contains("duplicate symbol"));

        let (_, message) = schema_error(r#"[["null", "int"], "string"]"#);
        assert!(message.contains("another union"));

        let (path, _) = schema_error("{}");
        assert_eq!(path, "#");

        let (path, _) = schema_error("{ not json");
        assert!(path.starts_with("line 1"));
    }

    #[test]
    fn rejects_self_recursive_records() {
        let src = r#"{"type": "record", "name": "Node", "fields": [
            {"name": "next", "type": ["null", "Node"]}
        ]}"#;
        let (path, message) = schema_error(src);
        assert_eq!(path, "#/fields/0/type/1");
        assert!(message.contains("recursive"));
    }

    /// `T0` is a one-field record; every `Ti` holds two references to `Ti-1`.
    fn doubling_chain(n: usize) -> String {
        let mut defs = vec![r#"{"type": "record", "name": "T0", "fields": [{"name": "x", "type": "int"}]}"#.to_owned()];
        for i in 1..=n {
            defs.push(format!(
                r#"{{"type": "record", "name": "T{i}", "fields": [{{"name": "a", "type": "T{p}"}}, {{"name": "b", "type": "T{p}"}}]}}"#,
                p = i - 1
            ));
        }
        format!("[{}]", defs.join(","))
    }

    #[test]
    fn expansion_is_charged_against_the_node_budget() {
        assert!(parse_str(&doubling_chain(4)).is_ok());

        let (path, message) = schema_error(&doubling_chain(40));
        assert!(message.contains("more than 100000 nodes"), "{message}");
        assert!(path.starts_with("#/"), "{path}");

        let limits = Limits { max_schema_nodes: 20, ..Limits::default() };
        match parse_str_with_limits(&doubling_chain(3), &limits) {
            Err(Error::Schema { message, .. }) => assert!(message.contains("more than 20 nodes")),
            other => panic!("expected the budget to be exceeded, got {other:?}"),
        }
    }

    #[test]
    fn fixed_and_bytes_parse_so_they_can_be_rejected_later() {
        let src = r#"{"type": "record", "name": "R", "fields": [
            {"name": "f", "type": {"type": "fixed", "name": "myField", "size": 1}},
            {"name": "b", "type": "bytes"}
        ]}"#;
        let schema = parse_str(src).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.fields[0].schema, Schema::Fixed { name: "myField".into(), size: 1 });
        assert_eq!(record.fields[1].schema, Schema::Bytes);
    }
}
