use mnemo_types::{Digest, EntryId};

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Encoding or decoding an entry failed.
    #[error("codec error ({codec}): {reason}")]
    Codec { codec: &'static str, reason: String },

    /// The stored revision is not the one the write was based on.
    #[error("revision conflict for {id}: expected {expected:?}, found {found:?}")]
    Conflict {
        id: EntryId,
        expected: Option<Digest>,
        found: Option<Digest>,
    },

    /// The stored bytes decode to a different id than they are keyed under.
    #[error("corrupt entry {id}: {reason}")]
    CorruptEntry { id: EntryId, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
