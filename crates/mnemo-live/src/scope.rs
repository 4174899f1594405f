use std::fmt;

use crate::set::LiveObjectSet;

/// A unit-of-work guard.
///
/// While a scope is open, every object registered or looked up through the
/// set it was opened on is kept alive by the set. Dropping the scope (on
/// any exit path, including unwinding) releases those counts.
#[must_use = "dropping a scope releases it immediately"]
pub struct Scope {
    set: LiveObjectSet,
    frame: u64,
}

impl Scope {
    pub(crate) fn new(set: LiveObjectSet, frame: u64) -> Self {
        Self { set, frame }
    }

    /// The set this scope counts against.
    pub fn set(&self) -> &LiveObjectSet {
        &self.set
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.set.release(self.frame);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("frame", &self.frame).finish()
    }
}
