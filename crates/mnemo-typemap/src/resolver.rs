//! The caching class → strategy resolver.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use mnemo_object::Container;
use tracing::debug;

use crate::error::{TypeMapError, TypeMapResult};
use crate::hierarchy::Hierarchy;
use crate::map::TypeMap;
use crate::strategy::{ContainerStrategy, Strategy};

/// The outcome of resolving one concrete class.
#[derive(Clone)]
pub struct Resolution {
    /// The class that was asked for.
    pub class: String,
    pub strategy: Arc<dyn Strategy>,
    pub intrinsic: bool,
    /// The class whose registration matched: `class` itself or an ancestor.
    pub matched: String,
    /// Whether an exact entry matched.
    pub exact: bool,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("class", &self.class)
            .field("matched", &self.matched)
            .field("exact", &self.exact)
            .field("intrinsic", &self.intrinsic)
            .finish_non_exhaustive()
    }
}

struct Config {
    map: TypeMap,
    hierarchy: Hierarchy,
}

/// Resolves classes to strategies and caches the answers per class name.
///
/// The built-in [`ContainerStrategy`] is always registered under
/// [`Container::CLASS`]. Any change to the configuration clears the whole
/// cache.
pub struct Resolver {
    config: RwLock<Config>,
    cache: RwLock<HashMap<String, Resolution>>,
}

impl Resolver {
    pub fn new(map: TypeMap) -> Self {
        Self::with_hierarchy(map, Hierarchy::new())
    }

    pub fn with_hierarchy(map: TypeMap, hierarchy: Hierarchy) -> Self {
        Self {
            config: RwLock::new(Config {
                map: with_builtins(map),
                hierarchy,
            }),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The strategy for `class`.
    pub fn resolve(&self, class: &str) -> TypeMapResult<Resolution> {
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(class)
        {
            return Ok(hit.clone());
        }

        // The config guard is held until the answer is cached, so a
        // concurrent reconfigure cannot clear the cache in between.
        // Lock order is config, then cache.
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let resolution = lookup(&config, class)?;
        debug!(
            class,
            matched = %resolution.matched,
            exact = resolution.exact,
            "resolved strategy"
        );
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(class.to_string(), resolution.clone());
        drop(config);
        Ok(resolution)
    }

    /// Replace the type map. Clears the cache.
    pub fn reconfigure(&self, map: TypeMap) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.map = with_builtins(map);
        self.invalidate();
    }

    /// Declare the direct parents of `class`. Clears the cache.
    pub fn declare_class<I, P>(&self, class: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.hierarchy.declare(class, parents);
        self.invalidate();
    }

    /// A copy of the declared hierarchy.
    pub fn hierarchy(&self) -> Hierarchy {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .hierarchy
            .clone()
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        debug!(dropped = cache.len(), "resolver cache cleared");
        cache.clear();
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(TypeMap::new())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Resolver")
            .field("entries", &config.map.len())
            .field("cached", &self.cached())
            .finish()
    }
}

fn with_builtins(mut map: TypeMap) -> TypeMap {
    if map.get_exact(Container::CLASS).is_none() {
        map = map.exact(Container::CLASS, ContainerStrategy);
    }
    map
}

fn lookup(config: &Config, class: &str) -> TypeMapResult<Resolution> {
    if let Some(entry) = config.map.get_exact(class) {
        return Ok(Resolution {
            class: class.to_string(),
            strategy: Arc::clone(&entry.strategy),
            intrinsic: entry.intrinsic,
            matched: class.to_string(),
            exact: true,
        });
    }
    for ancestor in config.hierarchy.linearize(class)? {
        if let Some(entry) = config.map.get_isa(&ancestor) {
            return Ok(Resolution {
                class: class.to_string(),
                strategy: Arc::clone(&entry.strategy),
                intrinsic: entry.intrinsic,
                matched: ancestor,
                exact: false,
            });
        }
    }
    Err(TypeMapError::UnregisteredType(class.to_string()))
}
