//! The live object set: at most one live instance per entry id.
//!
//! Every object the engine stores or loads is registered here under its
//! entry id. Registrations and lookups are counted against the innermost
//! open [`Scope`]; while an id's count is above zero the set keeps the
//! object alive. Once every scope that touched it has ended, the set only
//! remembers it weakly, and a later lookup after the last outside handle is
//! gone is a miss that forces a reload.

pub mod error;
pub mod scope;
pub mod set;

pub use error::{LiveError, LiveResult};
pub use scope::Scope;
pub use set::LiveObjectSet;
