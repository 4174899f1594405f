use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use mnemo_object::{identity, Object, Persist};
use mnemo_types::{Digest, EntryId};
use tracing::{debug, warn};

use crate::error::{LiveError, LiveResult};
use crate::scope::Scope;

struct LiveEntry {
    weak: Weak<dyn Persist>,
    addr: usize,
    /// Held while `strong > 0`.
    pinned: Option<Object>,
    strong: usize,
    revision: Option<Digest>,
}

impl LiveEntry {
    fn upgrade(&self) -> Option<Object> {
        self.weak.upgrade()
    }

    fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }
}

struct Frame {
    id: u64,
    held: HashMap<EntryId, usize>,
}

#[derive(Default)]
struct LiveState {
    entries: HashMap<EntryId, LiveEntry>,
    by_addr: HashMap<usize, EntryId>,
    frames: Vec<Frame>,
    next_frame: u64,
}

impl LiveState {
    fn current_frame(&mut self) -> LiveResult<&mut Frame> {
        self.frames.last_mut().ok_or(LiveError::NoActiveScope)
    }

    /// Check that `object` may be registered under `id`.
    fn check(&self, id: &EntryId, object: &Object) -> LiveResult<()> {
        let addr = identity(object);
        if let Some(entry) = self.entries.get(id) {
            if entry.is_alive() && entry.addr != addr {
                return Err(LiveError::AlreadyLive(id.clone()));
            }
        }
        if let Some(existing) = self.by_addr.get(&addr) {
            let bound = self
                .entries
                .get(existing)
                .is_some_and(|e| e.is_alive() && e.addr == addr);
            if bound && existing != id {
                return Err(LiveError::IdentityBound {
                    id: id.clone(),
                    existing: existing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Bind and count `object` under `id`. Callers have run [`check`] and
    /// made sure a frame is open.
    fn bind(&mut self, id: EntryId, object: &Object, revision: Option<Digest>) {
        let addr = identity(object);
        let entry = self.entries.entry(id.clone()).or_insert_with(|| LiveEntry {
            weak: Arc::downgrade(object),
            addr,
            pinned: None,
            strong: 0,
            revision: None,
        });
        if entry.addr != addr || !entry.is_alive() {
            // A dead binding is replaced by the new instance.
            let stale = entry.addr;
            entry.weak = Arc::downgrade(object);
            entry.addr = addr;
            entry.pinned = None;
            entry.strong = 0;
            if self.by_addr.get(&stale) == Some(&id) {
                self.by_addr.remove(&stale);
            }
        }
        entry.revision = revision;
        self.by_addr.insert(addr, id.clone());
        self.acquire(id, Arc::clone(object));
    }

    fn acquire(&mut self, id: EntryId, object: Object) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.strong += 1;
            entry.pinned = Some(object);
        }
        if let Some(frame) = self.frames.last_mut() {
            *frame.held.entry(id).or_insert(0) += 1;
        }
    }

    fn remove(&mut self, id: &EntryId) -> Option<Object> {
        let entry = self.entries.remove(id)?;
        if self.by_addr.get(&entry.addr) == Some(id) {
            self.by_addr.remove(&entry.addr);
        }
        for frame in &mut self.frames {
            frame.held.remove(id);
        }
        entry.pinned
    }
}

/// The identity-preserving cache of live objects, keyed by entry id.
///
/// Cheap to clone; clones share one set. All methods lock internally.
/// Handles the set lets go of are dropped after its lock is released, so
/// an object's `Drop` may call back into the set.
#[derive(Clone, Default)]
pub struct LiveObjectSet {
    state: Arc<Mutex<LiveState>>,
}

impl LiveObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    /// Open a scope nested inside the current one.
    pub fn new_scope(&self) -> Scope {
        let mut state = self.lock();
        let id = state.next_frame;
        state.next_frame += 1;
        state.frames.push(Frame {
            id,
            held: HashMap::new(),
        });
        drop(state);
        Scope::new(self.clone(), id)
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.lock().frames.len()
    }

    /// Fail with [`LiveError::NoActiveScope`] unless a scope is open.
    pub fn ensure_scope(&self) -> LiveResult<()> {
        if self.lock().frames.is_empty() {
            return Err(LiveError::NoActiveScope);
        }
        Ok(())
    }

    pub(crate) fn release(&self, frame: u64) {
        let mut released = Vec::new();
        {
            let mut state = self.lock();
            let Some(position) = state.frames.iter().position(|f| f.id == frame) else {
                return;
            };
            if position + 1 != state.frames.len() {
                warn!(
                    frame,
                    depth = state.frames.len(),
                    "scope released out of order"
                );
            }
            let Frame { held, .. } = state.frames.remove(position);
            for (id, count) in held {
                if let Some(entry) = state.entries.get_mut(&id) {
                    entry.strong = entry.strong.saturating_sub(count);
                    if entry.strong == 0 {
                        if let Some(object) = entry.pinned.take() {
                            released.push(object);
                        }
                    }
                }
            }
        }
        debug!(frame, unpinned = released.len(), "scope released");
        drop(released);
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register `object` as the live instance for `id`, counting it against
    /// the current scope.
    ///
    /// Registering the instance already live under `id` just counts it
    /// again and updates its revision.
    pub fn register(&self, id: EntryId, object: &Object, revision: Option<Digest>) -> LiveResult<()> {
        let mut state = self.lock();
        state.current_frame()?;
        state.check(&id, object)?;
        state.bind(id, object, revision);
        Ok(())
    }

    /// Register several objects at once. Either all of them are registered
    /// or, on error, none is.
    pub fn register_all(&self, items: &[(EntryId, Object, Option<Digest>)]) -> LiveResult<()> {
        let mut state = self.lock();
        state.current_frame()?;

        let mut batch: HashMap<&EntryId, usize> = HashMap::new();
        let mut batch_addrs: HashMap<usize, &EntryId> = HashMap::new();
        for (id, object, _) in items {
            state.check(id, object)?;
            let addr = identity(object);
            if batch.insert(id, addr).is_some_and(|prior| prior != addr) {
                return Err(LiveError::AlreadyLive(id.clone()));
            }
            if let Some(prior) = batch_addrs.insert(addr, id) {
                if prior != id {
                    return Err(LiveError::IdentityBound {
                        id: id.clone(),
                        existing: prior.clone(),
                    });
                }
            }
        }

        for (id, object, revision) in items {
            state.bind(id.clone(), object, *revision);
        }
        Ok(())
    }

    /// The live instance for `id`, counted against the current scope.
    ///
    /// Every hit counts, so looking the same id up twice in one scope holds
    /// it twice until the scope ends.
    pub fn lookup(&self, id: &EntryId) -> LiveResult<Option<Object>> {
        let mut state = self.lock();
        state.current_frame()?;
        let Some(entry) = state.entries.get(id) else {
            return Ok(None);
        };
        match entry.upgrade() {
            Some(object) => {
                state.acquire(id.clone(), Arc::clone(&object));
                Ok(Some(object))
            }
            None => {
                // Dead: only a weak handle was left.
                let pinned = state.remove(id);
                drop(state);
                drop(pinned);
                Ok(None)
            }
        }
    }

    /// The live instance for `id` without counting it. Needs no scope.
    pub fn peek(&self, id: &EntryId) -> Option<Object> {
        self.lock().entries.get(id).and_then(LiveEntry::upgrade)
    }

    /// The id `object` is live under, if any.
    pub fn id_of(&self, object: &Object) -> Option<EntryId> {
        let addr = identity(object);
        let state = self.lock();
        let id = state.by_addr.get(&addr)?;
        let entry = state.entries.get(id)?;
        (entry.addr == addr && entry.is_alive()).then(|| id.clone())
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    /// Digest of the revision last read or written for `id`.
    pub fn revision(&self, id: &EntryId) -> Option<Digest> {
        self.lock().entries.get(id).and_then(|e| e.revision)
    }

    /// Record the revision for `id`. Ignored if `id` is not bound.
    pub fn set_revision(&self, id: &EntryId, revision: Option<Digest>) {
        if let Some(entry) = self.lock().entries.get_mut(id) {
            entry.revision = revision;
        }
    }

    /// Drop the bindings of `ids`, whatever their counts.
    pub fn forget<'a>(&self, ids: impl IntoIterator<Item = &'a EntryId>) {
        let mut released = Vec::new();
        {
            let mut state = self.lock();
            for id in ids {
                if let Some(object) = state.remove(id) {
                    released.push(object);
                }
            }
        }
        drop(released);
    }

    /// How many times `id` is held by open scopes.
    pub fn strong_count(&self, id: &EntryId) -> usize {
        self.lock().entries.get(id).map_or(0, |e| e.strong)
    }

    /// Whether a live instance exists for `id`.
    pub fn is_live(&self, id: &EntryId) -> bool {
        self.lock().entries.get(id).is_some_and(LiveEntry::is_alive)
    }

    /// Number of bindings, dead or alive.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Remove bindings whose instance is gone. Returns how many were removed.
    pub fn vacuum(&self) -> usize {
        let mut state = self.lock();
        let dead: Vec<EntryId> = state
            .entries
            .iter()
            .filter(|(_, e)| !e.is_alive())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &dead {
            state.remove(id);
        }
        if !dead.is_empty() {
            debug!(removed = dead.len(), "vacuumed live set");
        }
        dead.len()
    }
}

impl fmt::Debug for LiveObjectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("LiveObjectSet")
            .field("entries", &state.entries.len())
            .field("depth", &state.frames.len())
            .finish()
    }
}
