use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::object::{Object, Persist};
use crate::tree::Tree;

/// A class-less shared container: a mutable tree with identity.
///
/// Containers let plain maps and lists be shared between owners. They are
/// stored without a class tag.
pub struct Container {
    tree: RwLock<Tree>,
}

impl Container {
    /// The class name containers resolve under. Never written to storage.
    pub const CLASS: &'static str = "mnemo::Container";

    pub fn new(tree: Tree) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// A new container as a shared object handle.
    pub fn shared(tree: Tree) -> Object {
        Arc::new(Self::new(tree))
    }

    /// A copy of the current contents.
    pub fn get(&self) -> Tree {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the contents.
    pub fn set(&self, tree: Tree) {
        *self.tree.write().unwrap_or_else(PoisonError::into_inner) = tree;
    }

    /// Mutate the contents in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *tree)
    }
}

impl Persist for Container {
    fn class(&self) -> &str {
        Self::CLASS
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .kind();
        f.debug_struct("Container").field("kind", &kind).finish()
    }
}
