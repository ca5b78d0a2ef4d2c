//! Field paths for error reporting, plus the depth-checked cursor every
//! recursive walk carries.
use std::fmt;

use crate::error::{Error, Result};
use crate::Limits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a value inside a page or record, e.g. `header.processPath[1].source`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self { Self::default() }
    pub fn is_root(&self) -> bool { self.segments.is_empty() }
    pub fn segments(&self) -> &[Segment] { &self.segments }

    pub fn field(&self, name: &str) -> Self { self.push(Segment::Field(name.to_owned())) }
    pub fn index(&self, index: usize) -> Self { self.push(Segment::Index(index)) }
    pub fn key(&self, key: &str) -> Self { self.push(Segment::Key(key.to_owned())) }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) | Segment::Key(name) => {
                    if i > 0 { f.write_str(".")?; }
                    f.write_str(name)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CURSOR
// ————————————————————————————————————————————————————————————————————————————

/// Current position of a walk. Every step into a field, element or map
/// entry goes through [`Cursor::descend`], which enforces [`Limits::max_depth`].
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    pub path: FieldPath,
    depth: usize,
    limits: &'a Limits,
}

impl<'a> Cursor<'a> {
    pub fn new(limits: &'a Limits) -> Self {
        Self { path: FieldPath::root(), depth: 0, limits }
    }

    pub fn field(&self, name: &str) -> Result<Self> { self.descend(self.path.field(name)) }
    pub fn index(&self, index: usize) -> Result<Self> { self.descend(self.path.index(index)) }
    pub fn key(&self, key: &str) -> Result<Self> { self.descend(self.path.key(key)) }

    fn descend(&self, path: FieldPath) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.limits.max_depth {
            return Err(Error::DepthExceeded { path, limit: self.limits.max_depth });
        }
        Ok(Self { path, depth, limits: self.limits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_fields_indices_and_keys() {
        let path = FieldPath::root().field("header").field("processPath").index(1).field("source");
        assert_eq!(path.to_string(), "header.processPath[1].source");

        let path = FieldPath::root().field("objectMapField").key("first");
        assert_eq!(path.to_string(), "objectMapField.first");

        assert_eq!(FieldPath::root().to_string(), ".");
        assert_eq!(FieldPath::root().index(0).to_string(), "[0]");
    }

    #[test]
    fn cursor_rejects_walks_deeper_than_the_limit() {
        let limits = Limits { max_depth: 2, ..Limits::default() };
        let root = Cursor::new(&limits);
        let one = root.field("a").unwrap();
        let two = one.index(0).unwrap();
        match two.key("k") {
            Err(Error::DepthExceeded { path, limit }) => {
                assert_eq!(limit, 2);
                assert_eq!(path.to_string(), "a[0].k");
            }
            other => panic!("expected depth error, got {other:?}"),
        }
    }
}
