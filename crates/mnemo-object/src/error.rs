//! Error types raised by strategies while converting objects to and from
//! field trees.

use thiserror::Error;

/// Errors produced while collapsing or expanding a single object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// A required field was absent.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field held a node of the wrong shape.
    #[error("field {field}: expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    /// A field holds a reference to a shared object that is only bound
    /// once the whole load has been expanded.
    #[error("field {0} refers to a shared object that is not bound yet; read it with take_link")]
    UnboundLink(String),

    /// The strategy was handed an instance of a type it does not handle.
    #[error("expected an instance of {expected}, got class {found}")]
    UnexpectedType {
        expected: &'static str,
        found: String,
    },

    /// The data tree for a class was not a mapping.
    #[error("expected a mapping of fields for class {0}")]
    ExpectedFields(String),

    /// Strategy-specific failure.
    #[error("{0}")]
    Custom(String),
}

/// Convenience alias for object conversions.
pub type ObjectResult<T> = Result<T, ObjectError>;
