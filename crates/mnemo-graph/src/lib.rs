//! Bidirectional graph transformation for Mnemo.
//!
//! The [`Collapser`] walks a live object graph breadth-first and flattens
//! it into [`Entry`](mnemo_types::Entry) records: shared objects become
//! entries of their own and are referenced by id, intrinsic objects are
//! inlined into their owner. The [`Expander`] goes the other way, reusing
//! instances that are already live and binding references late so that
//! cycles come back as cycles.

pub mod collapse;
pub mod error;
pub mod expand;

pub use collapse::{Collapsed, Collapser};
pub use error::{GraphError, GraphResult};
pub use expand::Expander;
