//! Deferred collections: sets of graph members that are loaded on demand.
//!
//! A [`DeferredSet`] holds entry ids and only turns them into live objects
//! when its members are actually read. Set algebra works on ids alone, so
//! intersecting two large unloaded sets loads nothing.

pub mod error;
pub mod set;
pub mod source;

pub use error::{DeferredError, DeferredResult};
pub use set::{DeferredSet, Holding, Members};
pub use source::Materializer;
