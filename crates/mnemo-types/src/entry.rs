use serde::{Deserialize, Serialize};

use crate::digest::{Digest, DigestHasher};
use crate::error::TypeError;
use crate::id::EntryId;
use crate::value::{Reference, Value};

/// The serialized representation of one graph node.
///
/// An entry's `data` never embeds another entry: nested shared objects are
/// [`Reference`]s, nested intrinsic objects are inlined without an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Type tag. `None` for class-less containers.
    #[serde(rename = "__CLASS__", default)]
    pub class: Option<String>,
    pub data: Value,
    /// `true` if the object was passed directly to a store call.
    #[serde(default)]
    pub root: bool,
    /// Digest of the revision this entry replaces.
    #[serde(default)]
    pub prev: Option<Digest>,
}

/// The digested part of an entry. `prev` is excluded so that an unchanged
/// object collapses to the same digest it was loaded with.
#[derive(Serialize)]
struct Revision<'a> {
    id: &'a EntryId,
    class: &'a Option<String>,
    data: &'a Value,
    root: bool,
}

impl Entry {
    /// Create a non-root entry with no previous revision.
    pub fn new(id: EntryId, class: Option<String>, data: Value) -> Self {
        Self {
            id,
            class,
            data,
            root: false,
            prev: None,
        }
    }

    /// Builder-style root flag.
    pub fn with_root(mut self, root: bool) -> Self {
        self.root = root;
        self
    }

    /// Digest of this revision of the entry.
    pub fn digest(&self) -> Result<Digest, TypeError> {
        // JSON would hash every NaN and infinity as `null`.
        if let Some(x) = self.data.non_finite() {
            return Err(TypeError::NonFiniteFloat(x.to_string()));
        }
        DigestHasher::ENTRY.hash_json(&Revision {
            id: &self.id,
            class: &self.class,
            data: &self.data,
            root: self.root,
        })
    }

    /// Returns `true` if this entry's digest equals its `prev` digest.
    pub fn is_unchanged(&self) -> bool {
        match (&self.prev, self.digest()) {
            (Some(prev), Ok(digest)) => *prev == digest,
            _ => false,
        }
    }

    /// All references made by this entry's data.
    pub fn references(&self) -> Vec<&Reference> {
        self.data.references()
    }
}
