//! Error types for strategy resolution.

/// Errors raised while building type maps or resolving classes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeMapError {
    /// Neither an exact nor an ancestor entry covers the class.
    #[error("no strategy registered for class {0}")]
    UnregisteredType(String),

    /// Two maps being merged both register the same class.
    #[error("duplicate {kind} entry for class {class}")]
    DuplicateEntry {
        class: String,
        /// `"exact"` or `"isa"`.
        kind: &'static str,
    },

    /// The declared parents admit no consistent linearization.
    #[error("inconsistent class hierarchy for {0}")]
    InconsistentHierarchy(String),

    /// A class is declared as its own ancestor.
    #[error("cyclic class hierarchy through {0}")]
    CyclicHierarchy(String),
}

/// Convenience alias for resolution results.
pub type TypeMapResult<T> = Result<T, TypeMapError>;
