//! Live object model for Mnemo.
//!
//! Objects taking part in a persisted graph are shared `Arc<dyn Persist>`
//! handles ([`Object`]). Identity is pointer identity. Objects point at each
//! other through [`Link`] slots, which are either strong (owning) or weak,
//! and can be bound late so that the expander can build cyclic graphs.
//!
//! Strategies exchange object state as a [`Tree`]: a data tree whose leaves
//! may be nested objects or links rather than entry references.
//!
//! # Modules
//!
//! - [`object`] -- [`Persist`], [`Object`], identity and downcasting
//! - [`link`] -- [`Link`], the late-bound strong/weak slot
//! - [`tree`] -- [`Tree`] and the [`Fields`] record helper
//! - [`container`] -- [`Container`], the class-less shared tree
//! - [`error`] -- [`ObjectError`]

pub mod container;
pub mod error;
pub mod link;
pub mod object;
pub mod tree;

pub use container::Container;
pub use error::{ObjectError, ObjectResult};
pub use link::Link;
pub use object::{downcast, downcast_ref, identity, same_object, AsAny, Object, Persist};
pub use tree::{Fields, Tree};
