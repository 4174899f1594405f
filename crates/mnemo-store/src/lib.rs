//! Storage collaborator boundary for Mnemo.
//!
//! The persistence core never interprets physical byte layout. It talks to a
//! [`Backend`] in terms of whole [`Entry`](mnemo_types::Entry) records and
//! hands atomic groups of writes over as a [`WriteBatch`]. How entries become
//! bytes is a [`Codec`]'s business.
//!
//! # Backends
//!
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//!
//! # Codecs
//!
//! - [`JsonCodec`] -- human-readable, self-describing
//! - [`BincodeCodec`] -- compact binary
//!
//! # Design Rules
//!
//! 1. Entries are read and written whole; the backend never patches data.
//! 2. A batch is applied completely or not at all.
//! 3. A put carrying a `prev` digest must match the stored revision.
//! 4. All codec and I/O errors are propagated, never silently ignored.

pub mod batch;
pub mod codec;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use batch::{WriteBatch, WriteOp};
pub use codec::{BincodeCodec, Codec, CodecKind, JsonCodec};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBackend;
pub use traits::Backend;
