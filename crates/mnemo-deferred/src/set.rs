use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use mnemo_object::{identity, Object, Persist};
use mnemo_types::EntryId;
use tracing::debug;

use crate::error::{DeferredError, DeferredResult};
use crate::source::Materializer;

/// How a set keeps the members it has loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Holding {
    /// Loaded members stay alive as long as the set.
    #[default]
    Strong,
    /// Loaded members are only remembered; stored ones reload if dropped.
    Weak,
}

/// Member identity: the entry id, or the object address for members that
/// were never stored.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Key {
    Id(EntryId),
    Addr(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Addr(addr) => write!(f, "{addr:#x}"),
        }
    }
}

#[derive(Clone)]
enum Slot {
    Deferred,
    Strong(Object),
    Weak(Weak<dyn Persist>),
}

impl Slot {
    fn hold(object: &Object, holding: Holding) -> Self {
        match holding {
            Holding::Strong => Self::Strong(Arc::clone(object)),
            Holding::Weak => Self::Weak(Arc::downgrade(object)),
        }
    }

    fn get(&self) -> Option<Object> {
        match self {
            Self::Deferred => None,
            Self::Strong(object) => Some(Arc::clone(object)),
            Self::Weak(weak) => weak.upgrade(),
        }
    }

    fn is_loaded(&self) -> bool {
        match self {
            Self::Deferred => false,
            Self::Strong(_) => true,
            Self::Weak(weak) => weak.strong_count() > 0,
        }
    }

    /// Prefer whichever slot already holds an object.
    fn merge(self, other: &Slot) -> Slot {
        if self.is_loaded() {
            self
        } else if other.is_loaded() {
            other.clone()
        } else {
            self
        }
    }
}

/// A set of graph members that loads them only when they are read.
#[derive(Clone, Default)]
pub struct DeferredSet {
    members: BTreeMap<Key, Slot>,
    holding: Holding,
    source: Option<Arc<dyn Materializer>>,
}

impl DeferredSet {
    /// An empty set with no source.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A set of already live objects. Members the source knows an id for
    /// are keyed by it.
    pub fn transient(
        objects: impl IntoIterator<Item = Object>,
        holding: Holding,
        source: Option<Arc<dyn Materializer>>,
    ) -> Self {
        let mut set = Self {
            members: BTreeMap::new(),
            holding,
            source,
        };
        for object in objects {
            set.insert(&object);
        }
        set
    }

    /// A set of stored members, none of them loaded yet.
    pub fn deferred(ids: impl IntoIterator<Item = EntryId>, source: Arc<dyn Materializer>) -> Self {
        Self {
            members: ids.into_iter().map(|id| (Key::Id(id), Slot::Deferred)).collect(),
            holding: Holding::Strong,
            source: Some(source),
        }
    }

    /// Change how members loaded from now on are held.
    pub fn with_holding(mut self, holding: Holding) -> Self {
        self.holding = holding;
        self
    }

    pub fn holding(&self) -> Holding {
        self.holding
    }

    fn key_of(&self, object: &Object) -> Key {
        match self.source.as_ref().and_then(|s| s.object_id(object)) {
            Some(id) => Key::Id(id),
            None => Key::Addr(identity(object)),
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `object` is a member. Never loads anything.
    pub fn contains(&self, object: &Object) -> bool {
        self.members.contains_key(&self.key_of(object))
            || self.members.contains_key(&Key::Addr(identity(object)))
    }

    pub fn contains_id(&self, id: &EntryId) -> bool {
        self.members.contains_key(&Key::Id(id.clone()))
    }

    /// Add a live object. Returns `false` if it was already a member.
    pub fn insert(&mut self, object: &Object) -> bool {
        let slot = Slot::hold(object, self.holding);
        let key = self.key_of(object);
        match self.members.get_mut(&key) {
            Some(existing) => {
                if !existing.is_loaded() {
                    *existing = slot;
                }
                false
            }
            None => {
                self.members.insert(key, slot);
                true
            }
        }
    }

    /// Add a stored member by id. Returns `false` if it was already a member.
    pub fn insert_id(&mut self, id: EntryId) -> bool {
        let key = Key::Id(id);
        if self.members.contains_key(&key) {
            return false;
        }
        self.members.insert(key, Slot::Deferred);
        true
    }

    /// Remove `object`. Returns `true` if it was a member.
    pub fn remove(&mut self, object: &Object) -> bool {
        let key = self.key_of(object);
        self.members.remove(&key).is_some()
            || self.members.remove(&Key::Addr(identity(object))).is_some()
    }

    pub fn remove_id(&mut self, id: &EntryId) -> bool {
        self.members.remove(&Key::Id(id.clone())).is_some()
    }

    /// Ids of the stored members, in id order.
    pub fn ids(&self) -> Vec<EntryId> {
        self.members
            .keys()
            .filter_map(|key| match key {
                Key::Id(id) => Some(id.clone()),
                Key::Addr(_) => None,
            })
            .collect()
    }

    /// Number of members currently held as objects.
    pub fn loaded_count(&self) -> usize {
        self.members.values().filter(|slot| slot.is_loaded()).count()
    }

    /// Whether the member stored under `id` is currently held as an object.
    pub fn is_loaded(&self, id: &EntryId) -> bool {
        self.members
            .get(&Key::Id(id.clone()))
            .is_some_and(Slot::is_loaded)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Iterate over the members, loading each one as it is reached.
    pub fn members(&mut self) -> Members<'_> {
        let keys: Vec<Key> = self.members.keys().cloned().collect();
        Members {
            set: self,
            keys: keys.into_iter(),
        }
    }

    /// Load every member not yet held, in a single call to the source.
    pub fn load_all(&mut self) -> DeferredResult<Vec<Object>> {
        let missing: Vec<EntryId> = self
            .members
            .iter()
            .filter(|(_, slot)| !slot.is_loaded())
            .filter_map(|(key, _)| match key {
                Key::Id(id) => Some(id.clone()),
                Key::Addr(_) => None,
            })
            .collect();

        let mut loaded = BTreeMap::new();
        if !missing.is_empty() {
            let source = self.source.as_ref().ok_or(DeferredError::NoSource)?;
            let objects = source.materialize(&missing)?;
            debug!(count = objects.len(), "loaded deferred members");
            for (id, object) in missing.into_iter().zip(objects) {
                self.members
                    .insert(Key::Id(id.clone()), Slot::hold(&object, self.holding));
                loaded.insert(Key::Id(id), object);
            }
        }

        self.members
            .iter()
            .map(|(key, slot)| {
                loaded
                    .get(key)
                    .cloned()
                    .or_else(|| slot.get())
                    .ok_or_else(|| DeferredError::Missing(key.to_string()))
            })
            .collect()
    }

    /// All members as objects.
    pub fn to_vec(&mut self) -> DeferredResult<Vec<Object>> {
        self.load_all()
    }

    fn load(&mut self, key: &Key) -> DeferredResult<Option<Object>> {
        let Some(slot) = self.members.get(key) else {
            return Ok(None);
        };
        if let Some(object) = slot.get() {
            return Ok(Some(object));
        }
        let Key::Id(id) = key else {
            return Err(DeferredError::Missing(key.to_string()));
        };
        let source = self.source.as_ref().ok_or(DeferredError::NoSource)?;
        let object = source
            .materialize(std::slice::from_ref(id))?
            .into_iter()
            .next()
            .ok_or_else(|| DeferredError::Missing(key.to_string()))?;
        self.members
            .insert(key.clone(), Slot::hold(&object, self.holding));
        Ok(Some(object))
    }

    // -----------------------------------------------------------------------
    // Set algebra
    // -----------------------------------------------------------------------

    /// Members keyed by id wherever an id is now known.
    fn normalized(&self) -> BTreeMap<Key, Slot> {
        let mut out = BTreeMap::new();
        for (key, slot) in &self.members {
            let key = match (key, slot.get()) {
                (Key::Addr(_), Some(object)) => self.key_of(&object),
                _ => key.clone(),
            };
            match out.remove(&key) {
                Some(previous) => out.insert(key, slot.clone().merge(&previous)),
                None => out.insert(key, slot.clone()),
            };
        }
        out
    }

    fn derive(&self, other: &DeferredSet, members: BTreeMap<Key, Slot>) -> DeferredSet {
        DeferredSet {
            members,
            holding: self.holding,
            source: self.source.clone().or_else(|| other.source.clone()),
        }
    }

    /// Members of either set.
    pub fn union(&self, other: &DeferredSet) -> DeferredSet {
        let mut members = self.normalized();
        for (key, slot) in other.normalized() {
            let merged = match members.remove(&key) {
                Some(ours) => ours.merge(&slot),
                None => slot,
            };
            members.insert(key, merged);
        }
        self.derive(other, members)
    }

    /// Members of both sets.
    pub fn intersect(&self, other: &DeferredSet) -> DeferredSet {
        let theirs = other.normalized();
        let members = self
            .normalized()
            .into_iter()
            .filter_map(|(key, ours)| {
                let slot = theirs.get(&key)?;
                Some((key, ours.merge(slot)))
            })
            .collect();
        self.derive(other, members)
    }

    /// Members of this set that are not in `other`.
    pub fn difference(&self, other: &DeferredSet) -> DeferredSet {
        let theirs = other.normalized();
        let members = self
            .normalized()
            .into_iter()
            .filter(|(key, _)| !theirs.contains_key(key))
            .collect();
        self.derive(other, members)
    }
}

impl fmt::Debug for DeferredSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredSet")
            .field("len", &self.len())
            .field("loaded", &self.loaded_count())
            .field("holding", &self.holding)
            .field("source", &self.source.is_some())
            .finish()
    }
}

/// Lazy iterator over a [`DeferredSet`]'s members. See
/// [`DeferredSet::members`].
pub struct Members<'a> {
    set: &'a mut DeferredSet,
    keys: std::vec::IntoIter<Key>,
}

impl Iterator for Members<'_> {
    type Item = DeferredResult<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            // Members removed since iteration started are skipped.
            match self.set.load(&key) {
                Ok(Some(object)) => return Some(Ok(object)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}
