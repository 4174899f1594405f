//! High-level Mnemo API.
//!
//! An [`Engine`] ties the object-graph core together: a [`TypeMap`] of
//! strategies, a storage backend, the live object set and an optional search
//! index. Stores and loads run inside a [`Scope`]; writes are grouped into
//! transactions that reach the backend atomically.
//!
//! ```ignore
//! use mnemo_sdk::{Engine, Native, TypeMap};
//!
//! let engine = Engine::in_memory(TypeMap::new().exact("Note", Native::<Note>::new()));
//! let _scope = engine.new_scope();
//! let id = engine.store(&note)?;
//! let again = engine.lookup(&id)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gc;
pub mod txn;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::{SdkError, SdkResult};
pub use gc::GcReport;
pub use txn::Txn;

// Re-export the types a caller needs to define and register classes.
pub use mnemo_deferred::{DeferredError, DeferredSet, Holding};
pub use mnemo_graph::GraphError;
pub use mnemo_index::{Query, SearchIndex, SimpleIndex};
pub use mnemo_live::{LiveError, Scope};
pub use mnemo_object::{
    downcast, downcast_ref, same_object, Container, Fields, Link, Object, ObjectError,
    ObjectResult, Persist, Tree,
};
pub use mnemo_store::{Backend, CodecKind, InMemoryBackend, StoreError};
pub use mnemo_typemap::{Callbacks, Hierarchy, Native, Persistable, Strategy, TypeMap, TypeMapError};
pub use mnemo_types::{Entry, EntryId, Facts, Value};
