use mnemo_types::EntryId;

/// Errors from the live object set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveError {
    /// The operation counts against a scope but none is open.
    #[error("no active scope")]
    NoActiveScope,

    /// A different instance is already live under this id.
    #[error("a different object is already live under id {0}")]
    AlreadyLive(EntryId),

    /// The instance is already live under another id.
    #[error("object is already live under id {existing}, cannot bind it to {id}")]
    IdentityBound { id: EntryId, existing: EntryId },
}

/// Convenience alias for live set results.
pub type LiveResult<T> = Result<T, LiveError>;
