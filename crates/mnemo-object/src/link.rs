//! Late-bound object slots.
//!
//! A [`Link`] is how one live object points at another. Links start out
//! empty, bound, or pending (naming the entry id they will be bound to once
//! the expander has materialized it). Clones of a link share one slot, which
//! is what lets the expander bind a link after the owning object has already
//! been constructed.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use mnemo_types::EntryId;

use crate::object::{downcast, Object, Persist};

enum Slot {
    Empty,
    Pending { target: EntryId, weak: bool },
    Strong(Object),
    Weak(Weak<dyn Persist>),
}

/// A strong or weak pointer from one live object to another.
#[derive(Clone)]
pub struct Link {
    slot: Arc<RwLock<Slot>>,
}

impl Link {
    fn with(slot: Slot) -> Self {
        Self {
            slot: Arc::new(RwLock::new(slot)),
        }
    }

    /// A strong link to `object`.
    pub fn new(object: Object) -> Self {
        Self::with(Slot::Strong(object))
    }

    /// A weak link to `object`. It does not keep the target alive.
    pub fn weak(object: &Object) -> Self {
        Self::with(Slot::Weak(Arc::downgrade(object)))
    }

    /// A link pointing nowhere.
    pub fn empty() -> Self {
        Self::with(Slot::Empty)
    }

    /// A link to be bound to the object stored under `target`.
    pub fn unresolved(target: EntryId) -> Self {
        Self::with(Slot::Pending {
            target,
            weak: false,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The target, if the link is bound and the target is still alive.
    pub fn get(&self) -> Option<Object> {
        match &*self.read() {
            Slot::Strong(object) => Some(Arc::clone(object)),
            Slot::Weak(weak) => weak.upgrade(),
            Slot::Empty | Slot::Pending { .. } => None,
        }
    }

    /// The target downcast to its concrete type.
    pub fn get_as<T: Persist>(&self) -> Option<Arc<T>> {
        self.get().and_then(|object| downcast::<T>(&object))
    }

    /// Point the link strongly at `object`.
    pub fn set(&self, object: Object) {
        *self.write() = Slot::Strong(object);
    }

    /// Point the link weakly at `object`.
    pub fn set_weak(&self, object: &Object) {
        *self.write() = Slot::Weak(Arc::downgrade(object));
    }

    /// Point the link nowhere.
    pub fn clear(&self) {
        *self.write() = Slot::Empty;
    }

    /// Make the link weak. A pending link remembers to bind weakly.
    pub fn weaken(&self) {
        let mut slot = self.write();
        let downgraded = match &mut *slot {
            Slot::Pending { weak, .. } => {
                *weak = true;
                None
            }
            Slot::Strong(object) => Some(Arc::downgrade(object)),
            Slot::Empty | Slot::Weak(_) => None,
        };
        if let Some(weak) = downgraded {
            *slot = Slot::Weak(weak);
        }
    }

    /// Bind the link to `object`, keeping the weakness it was declared with.
    pub fn bind(&self, object: &Object) {
        let mut slot = self.write();
        let weak = matches!(&*slot, Slot::Pending { weak: true, .. } | Slot::Weak(_));
        *slot = if weak {
            Slot::Weak(Arc::downgrade(object))
        } else {
            Slot::Strong(Arc::clone(object))
        };
    }

    /// Returns `true` if the link is (or will be bound) weak.
    pub fn is_weak(&self) -> bool {
        matches!(&*self.read(), Slot::Weak(_) | Slot::Pending { weak: true, .. })
    }

    /// Returns `true` if the link points nowhere.
    pub fn is_empty(&self) -> bool {
        matches!(&*self.read(), Slot::Empty)
    }

    /// The entry id the link is waiting for, if it is still pending.
    pub fn pending_target(&self) -> Option<EntryId> {
        match &*self.read() {
            Slot::Pending { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    /// Returns `true` if both handles share one slot.
    pub fn same_slot(&self, other: &Link) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.read() {
            Slot::Empty => write!(f, "Link(empty)"),
            Slot::Pending { target, weak } => {
                let kind = if *weak { "weak" } else { "strong" };
                write!(f, "Link(pending {kind} {target})")
            }
            Slot::Strong(object) => write!(f, "Link(strong {})", object.class()),
            Slot::Weak(weak) => match weak.upgrade() {
                Some(object) => write!(f, "Link(weak {})", object.class()),
                None => write!(f, "Link(weak, dead)"),
            },
        }
    }
}
