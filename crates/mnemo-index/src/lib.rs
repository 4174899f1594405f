//! Search collaborator boundary for Mnemo.
//!
//! Indexed strategies publish [`Facts`](mnemo_types::Facts) about every
//! object they store. A [`SearchIndex`] keeps them and answers a [`Query`]
//! with the ids of matching entries; the engine wraps those ids in a
//! deferred set so nothing is loaded until it is read.

pub mod error;
pub mod query;
pub mod simple;
pub mod traits;

pub use error::{IndexError, IndexResult};
pub use query::Query;
pub use simple::SimpleIndex;
pub use traits::{Hits, SearchIndex};
