use thiserror::Error;

use crate::path::FieldPath;
use crate::schema::SchemaKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A present value matched none of the union's alternatives.
    #[error("value at `{path}` matches none of the union alternatives")]
    UnresolvableUnion { path: FieldPath },

    #[error("unsupported schema type `{kind}` at `{path}`")]
    UnsupportedType { kind: SchemaKind, path: FieldPath },

    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: SchemaKind,
        found: &'static str,
    },

    #[error("nesting deeper than {limit} levels at `{path}`")]
    DepthExceeded { path: FieldPath, limit: usize },

    /// Writer and reader schemas cannot be reconciled for this value.
    #[error("incompatible schemas at `{path}`: {reason}")]
    Incompatible { path: FieldPath, reason: String },

    /// Schema text is malformed; `path` is a JSON pointer into the schema document.
    #[error("invalid schema at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn mismatch(path: &FieldPath, expected: SchemaKind, found: &'static str) -> Self {
        Error::TypeMismatch { path: path.clone(), expected, found }
    }

    pub(crate) fn unsupported(path: &FieldPath, kind: SchemaKind) -> Self {
        Error::UnsupportedType { kind, path: path.clone() }
    }

    pub(crate) fn incompatible(path: &FieldPath, reason: impl Into<String>) -> Self {
        Error::Incompatible { path: path.clone(), reason: reason.into() }
    }

    /// Path of the offending value, when the error is tied to one.
    pub fn field_path(&self) -> Option<&FieldPath> {
        match self {
            Error::UnresolvableUnion { path }
            | Error::UnsupportedType { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::DepthExceeded { path, .. }
            | Error::Incompatible { path, .. } => Some(path),
            Error::Schema { .. } | Error::Config(_) => None,
        }
    }
}
