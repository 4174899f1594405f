use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{TypeMapError, TypeMapResult};
use crate::strategy::Strategy;

/// A registered strategy and how its objects are stored.
#[derive(Clone)]
pub struct TypeMapEntry {
    pub strategy: Arc<dyn Strategy>,
    /// Stored inline in the owner rather than as an entry of its own.
    pub intrinsic: bool,
}

impl TypeMapEntry {
    pub fn new(strategy: Arc<dyn Strategy>) -> Self {
        let intrinsic = strategy.is_intrinsic();
        Self {
            strategy,
            intrinsic,
        }
    }
}

impl<S: Strategy + 'static> From<S> for TypeMapEntry {
    fn from(strategy: S) -> Self {
        Self::new(Arc::new(strategy))
    }
}

impl fmt::Debug for TypeMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMapEntry")
            .field("intrinsic", &self.intrinsic)
            .finish_non_exhaustive()
    }
}

/// Class → strategy registrations, split into exact and isa entries.
///
/// An exact entry covers one class. An isa entry covers a class and every
/// class declared to descend from it.
#[derive(Clone, Debug, Default)]
pub struct TypeMap {
    exact: HashMap<String, TypeMapEntry>,
    isa: HashMap<String, TypeMapEntry>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for exactly `class`, replacing any previous one.
    pub fn exact(mut self, class: impl Into<String>, strategy: impl Into<TypeMapEntry>) -> Self {
        self.exact.insert(class.into(), strategy.into());
        self
    }

    /// Register `strategy` for `class` and its descendants, replacing any
    /// previous one.
    pub fn isa(mut self, class: impl Into<String>, strategy: impl Into<TypeMapEntry>) -> Self {
        self.isa.insert(class.into(), strategy.into());
        self
    }

    /// Register an exact entry, failing if `class` already has one.
    pub fn add_exact(
        &mut self,
        class: impl Into<String>,
        strategy: impl Into<TypeMapEntry>,
    ) -> TypeMapResult<()> {
        insert_new(&mut self.exact, "exact", class.into(), strategy.into())
    }

    /// Register an isa entry, failing if `class` already has one.
    pub fn add_isa(
        &mut self,
        class: impl Into<String>,
        strategy: impl Into<TypeMapEntry>,
    ) -> TypeMapResult<()> {
        insert_new(&mut self.isa, "isa", class.into(), strategy.into())
    }

    /// Merge every entry of `other` into this map.
    ///
    /// Fails without modifying `self` if any class is registered in both
    /// maps under the same kind.
    pub fn include(&mut self, other: TypeMap) -> TypeMapResult<()> {
        if let Some(class) = other.exact.keys().find(|c| self.exact.contains_key(*c)) {
            return Err(duplicate(class, "exact"));
        }
        if let Some(class) = other.isa.keys().find(|c| self.isa.contains_key(*c)) {
            return Err(duplicate(class, "isa"));
        }
        self.exact.extend(other.exact);
        self.isa.extend(other.isa);
        Ok(())
    }

    pub fn get_exact(&self, class: &str) -> Option<&TypeMapEntry> {
        self.exact.get(class)
    }

    pub fn get_isa(&self, class: &str) -> Option<&TypeMapEntry> {
        self.isa.get(class)
    }

    /// Total number of registrations of both kinds.
    pub fn len(&self) -> usize {
        self.exact.len() + self.isa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.isa.is_empty()
    }
}

fn insert_new(
    entries: &mut HashMap<String, TypeMapEntry>,
    kind: &'static str,
    class: String,
    entry: TypeMapEntry,
) -> TypeMapResult<()> {
    if entries.contains_key(&class) {
        return Err(duplicate(&class, kind));
    }
    entries.insert(class, entry);
    Ok(())
}

fn duplicate(class: &str, kind: &'static str) -> TypeMapError {
    TypeMapError::DuplicateEntry {
        class: class.to_string(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Callbacks, ContainerStrategy};
    use mnemo_object::{Container, Object, Tree};

    fn noop() -> Callbacks {
        Callbacks::new(|_| Ok(Tree::Null), |_, tree| Ok(Container::shared(tree) as Object))
    }

    #[test]
    fn builder_registers_both_kinds() {
        let map = TypeMap::new()
            .exact("Circle", noop())
            .isa("Shape", noop().intrinsic());
        assert_eq!(map.len(), 2);
        assert!(map.get_exact("Circle").is_some());
        assert!(map.get_exact("Shape").is_none());
        assert!(map.get_isa("Shape").unwrap().intrinsic);
        assert!(!map.get_exact("Circle").unwrap().intrinsic);
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut map = TypeMap::new();
        map.add_exact("Circle", noop()).unwrap();
        map.add_isa("Circle", noop()).unwrap();
        assert_eq!(
            map.add_exact("Circle", noop()).unwrap_err(),
            TypeMapError::DuplicateEntry {
                class: "Circle".into(),
                kind: "exact"
            }
        );
    }

    #[test]
    fn include_merges_disjoint_maps() {
        let mut base = TypeMap::new().exact("Circle", noop());
        base.include(TypeMap::new().exact("Square", ContainerStrategy).isa("Shape", noop()))
            .unwrap();
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn include_clash_leaves_map_untouched() {
        let mut base = TypeMap::new().isa("Shape", noop());
        let err = base
            .include(TypeMap::new().exact("Square", noop()).isa("Shape", noop()))
            .unwrap_err();
        assert!(matches!(err, TypeMapError::DuplicateEntry { kind: "isa", .. }));
        assert_eq!(base.len(), 1);
        assert!(base.get_exact("Square").is_none());
    }
}
