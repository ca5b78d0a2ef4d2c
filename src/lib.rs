//! Structural transcoding between dynamic property pages and schema-typed
//! generic records.
//!
//! - [`encode`] walks a [`tree::Page`] under a [`schema::Schema`] and yields a [`record::Record`].
//! - [`decode`] walks a record under the schema that produced it and rebuilds a page.
//! - [`resolve`] projects a record written under one schema onto a reader schema.
//!
//! Everything here is synchronous and free of shared mutable state; a parsed
//! schema can be shared across threads and reused for any number of calls.
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod path;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod transcoder;
pub mod tree;
pub mod unions;

pub use decode::decode;
pub use encode::encode;
pub use error::{Error, Result};
pub use path::FieldPath;
pub use record::{Record, Value};
pub use schema::{Field, RecordSchema, Schema, SchemaKind};
pub use transcoder::Transcoder;
pub use tree::{DefaultPageFactory, Page, PageFactory, Property, Scalar};

/// Default bound on nested record/array/map levels a single call may descend.
pub const MAX_DEPTH: usize = 128;

/// Default bound on the nodes a parsed schema may expand to once every named
/// reference is inlined.
pub const MAX_SCHEMA_NODES: usize = 100_000;

/// Limits shared by the schema parser, encoder, decoder and resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
    pub max_schema_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self { Self { max_depth: MAX_DEPTH, max_schema_nodes: MAX_SCHEMA_NODES } }
}
