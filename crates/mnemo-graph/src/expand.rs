//! Entries → live graph.

use std::collections::VecDeque;

use mnemo_live::LiveObjectSet;
use mnemo_object::{Container, Link, Object, Tree};
use mnemo_store::Backend;
use mnemo_typemap::Resolver;
use mnemo_types::{Entry, EntryId, Reference, Value};
use tracing::{debug, warn};

use crate::error::{GraphError, GraphResult};

/// Rebuilds live objects from stored entries.
///
/// Instances already live are reused. New instances are registered before
/// any of their references are followed, and references are followed
/// breadth-first, so a reference back to an object of the same load binds
/// to that very instance.
pub struct Expander<'a> {
    backend: &'a dyn Backend,
    resolver: &'a Resolver,
    live: &'a LiveObjectSet,
}

/// State of one expansion call. Dropping it before [`Load::commit`]
/// forgets every id it registered, so an error or a panic in a strategy
/// leaves no half-wired instance behind.
struct Load<'a> {
    live: &'a LiveObjectSet,
    /// Ids registered by this call.
    registered: Vec<EntryId>,
    /// Unbound links and the entry that holds them.
    pending: VecDeque<(EntryId, Link, Reference)>,
    committed: bool,
}

impl<'a> Load<'a> {
    fn new(live: &'a LiveObjectSet) -> Self {
        Self {
            live,
            registered: Vec::new(),
            pending: VecDeque::new(),
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for Load<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if std::thread::panicking() {
            warn!(
                rolled_back = self.registered.len(),
                "expansion aborted by a panic"
            );
        }
        self.live.forget(&self.registered);
    }
}

impl<'a> Expander<'a> {
    pub fn new(backend: &'a dyn Backend, resolver: &'a Resolver, live: &'a LiveObjectSet) -> Self {
        Self {
            backend,
            resolver,
            live,
        }
    }

    /// The live objects for `ids`, in order.
    ///
    /// Fails with [`GraphError::NotFound`] if any id is not stored.
    pub fn expand(&self, ids: &[EntryId]) -> GraphResult<Vec<Object>> {
        self.guarded(|load| {
            ids.iter()
                .map(|id| {
                    self.load(id, false, load)?
                        .ok_or_else(|| GraphError::NotFound(id.clone()))
                })
                .collect()
        })
    }

    /// The live objects for already fetched `entries`, in order.
    pub fn expand_entries(&self, entries: Vec<Entry>) -> GraphResult<Vec<Object>> {
        self.guarded(|load| {
            entries
                .into_iter()
                .map(|entry| match self.live.lookup(&entry.id)? {
                    Some(object) => Ok(object),
                    None => self.materialize(entry, load),
                })
                .collect()
        })
    }

    /// Run `f`, bind every link it queued, and roll back its registrations
    /// if anything fails or panics.
    fn guarded(
        &self,
        f: impl FnOnce(&mut Load<'_>) -> GraphResult<Vec<Object>>,
    ) -> GraphResult<Vec<Object>> {
        self.live.ensure_scope()?;
        let mut load = Load::new(self.live);
        let result = f(&mut load).and_then(|objects| {
            self.drain(&mut load)?;
            Ok(objects)
        });
        match &result {
            Ok(objects) => {
                debug!(
                    requested = objects.len(),
                    expanded = load.registered.len(),
                    "expanded entries"
                );
                load.commit();
            }
            Err(e) => {
                debug!(error = %e, rolled_back = load.registered.len(), "expansion failed")
            }
        }
        result
    }

    /// The live object for `id`, expanding it if needed. A weak load does
    /// not count an already live instance.
    fn load(&self, id: &EntryId, weak: bool, load: &mut Load<'_>) -> GraphResult<Option<Object>> {
        let hit = if weak {
            self.live.peek(id)
        } else {
            self.live.lookup(id)?
        };
        if let Some(object) = hit {
            return Ok(Some(object));
        }
        match self.backend.get(id)? {
            Some(entry) => self.materialize(entry, load).map(Some),
            None => Ok(None),
        }
    }

    fn materialize(&self, entry: Entry, load: &mut Load<'_>) -> GraphResult<Object> {
        let digest = entry.digest()?;
        let class = entry.class.as_deref().unwrap_or(Container::CLASS);
        let resolution = self.resolver.resolve(class)?;
        let tree = self.inflate(&entry.id, entry.data, load)?;
        let object = resolution
            .strategy
            .expand(class, tree)
            .map_err(|e| GraphError::strategy(class, e))?;
        self.live.register(entry.id.clone(), &object, Some(digest))?;
        load.registered.push(entry.id);
        Ok(object)
    }

    /// Turn stored data into a tree: references become unbound links,
    /// inlined values are expanded in place.
    fn inflate(&self, owner: &EntryId, value: Value, load: &mut Load<'_>) -> GraphResult<Tree> {
        Ok(match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Int(n) => Tree::Int(n),
            Value::Float(x) => Tree::Float(x),
            Value::Str(s) => Tree::Str(s),
            Value::Bytes(b) => Tree::Bytes(b),
            Value::List(items) => Tree::List(
                items
                    .into_iter()
                    .map(|item| self.inflate(owner, item, load))
                    .collect::<GraphResult<_>>()?,
            ),
            Value::Map(map) => Tree::Map(
                map.into_iter()
                    .map(|(key, item)| self.inflate(owner, item, load).map(|tree| (key, tree)))
                    .collect::<GraphResult<_>>()?,
            ),
            Value::Ref(reference) => {
                let link = Link::unresolved(reference.id.clone());
                load.pending.push_back((owner.clone(), link.clone(), reference));
                Tree::Link(link)
            }
            Value::Inline(inline) => {
                let resolution = self.resolver.resolve(&inline.class)?;
                let tree = self.inflate(owner, inline.data, load)?;
                Tree::Object(
                    resolution
                        .strategy
                        .expand(&inline.class, tree)
                        .map_err(|e| GraphError::strategy(&inline.class, e))?,
                )
            }
        })
    }

    fn drain(&self, load: &mut Load<'_>) -> GraphResult<()> {
        while let Some((owner, link, reference)) = load.pending.pop_front() {
            let target = if reference.is_path() {
                self.inlined(&owner, &reference, load)?
            } else {
                self.load(&reference.id, link.is_weak(), load)?
            };
            match target {
                Some(object) => link.bind(&object),
                None => {
                    return Err(GraphError::DanglingReference {
                        from: owner,
                        to: reference,
                    })
                }
            }
        }
        Ok(())
    }

    /// Expand the inlined value a path reference addresses, as an
    /// independent copy.
    fn inlined(
        &self,
        owner: &EntryId,
        reference: &Reference,
        load: &mut Load<'_>,
    ) -> GraphResult<Option<Object>> {
        let Some(entry) = self.backend.get(&reference.id)? else {
            return Ok(None);
        };
        let Some(Value::Inline(inline)) = entry.data.at_path(&reference.path) else {
            return Ok(None);
        };
        let resolution = self.resolver.resolve(&inline.class)?;
        let tree = self.inflate(owner, inline.data.clone(), load)?;
        resolution
            .strategy
            .expand(&inline.class, tree)
            .map(Some)
            .map_err(|e| GraphError::strategy(&inline.class, e))
    }
}
