use mnemo_types::EntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("object is already stored as {0}")]
    AlreadyStored(EntryId),

    #[error("object has not been stored")]
    NotStored,

    #[error("entry {id} holds a {found}, not a {expected}")]
    TypeMismatch {
        id: EntryId,
        expected: &'static str,
        found: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("graph error: {0}")]
    Graph(#[from] mnemo_graph::GraphError),

    #[error("live set error: {0}")]
    Live(#[from] mnemo_live::LiveError),

    #[error("store error: {0}")]
    Store(#[from] mnemo_store::StoreError),

    #[error("type map error: {0}")]
    TypeMap(#[from] mnemo_typemap::TypeMapError),

    #[error("deferred set error: {0}")]
    Deferred(#[from] mnemo_deferred::DeferredError),

    #[error("index error: {0}")]
    Index(#[from] mnemo_index::IndexError),

    #[error("digest error: {0}")]
    Digest(#[from] mnemo_types::TypeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
