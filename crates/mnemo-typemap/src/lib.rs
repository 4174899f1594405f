//! Strategy resolution for Mnemo.
//!
//! Every class that takes part in a persisted graph is handled by a
//! [`Strategy`]: the pair of functions that turn a live object into a
//! [`Tree`](mnemo_object::Tree) and back. Strategies are registered on a
//! [`TypeMap`], either for one exact class or for a class and everything
//! declared to inherit from it (an *isa* entry). The [`Resolver`] picks the
//! strategy for a concrete class and caches the answer.
//!
//! # Resolution order
//!
//! 1. An exact entry for the class.
//! 2. Isa entries, checked along the class's C3 linearization: the class
//!    itself first, then its ancestors from most to least specific.
//!
//! Rust has no runtime inheritance, so ancestry is declared on a
//! [`Hierarchy`].

pub mod error;
pub mod hierarchy;
pub mod map;
pub mod native;
pub mod resolver;
pub mod strategy;

pub use error::{TypeMapError, TypeMapResult};
pub use hierarchy::Hierarchy;
pub use map::{TypeMap, TypeMapEntry};
pub use native::{Native, Persistable};
pub use resolver::{Resolution, Resolver};
pub use strategy::{Callbacks, ContainerStrategy, Strategy};
