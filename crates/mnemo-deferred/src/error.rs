use mnemo_graph::GraphError;

/// Errors from deferred collections.
#[derive(Debug, thiserror::Error)]
pub enum DeferredError {
    /// Loading members failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The set has unloaded members but nothing to load them from.
    #[error("deferred set has no source to load members from")]
    NoSource,

    /// A weakly held member is gone and cannot be reloaded.
    #[error("member {0} is no longer available")]
    Missing(String),
}

/// Convenience alias for deferred set results.
pub type DeferredResult<T> = Result<T, DeferredError>;
