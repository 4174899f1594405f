//! Foundation types for Mnemo.
//!
//! Every other Mnemo crate depends on `mnemo-types`. It defines the flat,
//! serializable side of the object graph: what an object looks like once it
//! has been collapsed into an [`Entry`].
//!
//! # Key Types
//!
//! - [`EntryId`] -- Opaque string identifier of a stored object
//! - [`Entry`] -- Serialized record for one graph node
//! - [`Value`] -- Data tree of scalars, sequences, mappings and references
//! - [`Reference`] -- In-data pointer to another entry by id
//! - [`Digest`] -- Domain-separated BLAKE3 digest of an entry revision
//! - [`Facts`] -- Key/value facts extracted for the search collaborator

pub mod digest;
pub mod entry;
pub mod error;
pub mod id;
pub mod value;

pub use digest::{Digest, DigestHasher};
pub use entry::Entry;
pub use error::TypeError;
pub use id::EntryId;
pub use value::{Facts, Inline, PathSegment, Reference, Value};
