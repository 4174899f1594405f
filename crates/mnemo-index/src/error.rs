/// Errors from search indexes.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A fact value could not be turned into an index key.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
