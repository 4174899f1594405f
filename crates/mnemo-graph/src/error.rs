//! Error types for collapse and expansion.

use mnemo_live::LiveError;
use mnemo_object::ObjectError;
use mnemo_store::StoreError;
use mnemo_typemap::TypeMapError;
use mnemo_types::{EntryId, Reference, TypeError};

/// Errors raised while collapsing or expanding a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Intrinsic objects refer to each other in a cycle, which inlining
    /// cannot represent.
    #[error("unbreakable cycle through intrinsic class {0}")]
    UnbreakableCycle(String),

    /// A stored reference points at an entry that does not exist.
    #[error("dangling reference from {from} to {to}")]
    DanglingReference { from: EntryId, to: Reference },

    /// Stored data cannot hold NaN or an infinity.
    #[error("{owner} holds non-finite float {value}, which cannot be stored")]
    NonFiniteFloat { owner: EntryId, value: f64 },

    /// A requested entry does not exist.
    #[error("entry not found: {0}")]
    NotFound(EntryId),

    /// The object is already bound to another id.
    #[error("object is already stored as {existing}, cannot store it as {requested}")]
    IdConflict { requested: EntryId, existing: EntryId },

    /// A strategy failed to collapse or expand an object.
    #[error("strategy for {class} failed: {source}")]
    Strategy {
        class: String,
        #[source]
        source: ObjectError,
    },

    #[error(transparent)]
    TypeMap(#[from] TypeMapError),

    #[error(transparent)]
    Live(#[from] LiveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Computing an entry digest failed.
    #[error("digest error: {0}")]
    Digest(#[from] TypeError),
}

impl GraphError {
    pub(crate) fn strategy(class: &str, source: ObjectError) -> Self {
        Self::Strategy {
            class: class.to_string(),
            source,
        }
    }
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
