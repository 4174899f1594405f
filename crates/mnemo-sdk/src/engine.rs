use std::any::type_name;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use mnemo_deferred::{DeferredSet, Holding, Materializer};
use mnemo_graph::{Expander, GraphError, GraphResult};
use mnemo_index::{Query, SearchIndex, SimpleIndex};
use mnemo_live::{LiveObjectSet, Scope};
use mnemo_object::{downcast, Object, Persist};
use mnemo_store::{Backend, InMemoryBackend, StoreResult, WriteBatch};
use mnemo_typemap::{Hierarchy, Resolver, TypeMap};
use mnemo_types::EntryId;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{SdkError, SdkResult};
use crate::gc::{self, GcReport};
use crate::txn::Txn;

/// State shared by an engine, its transactions and the deferred sets it
/// hands out.
pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) resolver: Resolver,
    pub(crate) live: LiveObjectSet,
    pub(crate) index: Option<Arc<dyn SearchIndex>>,
    /// Shared by commits, held exclusively by garbage collection.
    commit_gate: RwLock<()>,
}

impl EngineInner {
    /// Commit `batch` to the backend. Waits while a collection is running.
    pub(crate) fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let _gate = self.commit_gate.read().unwrap_or_else(PoisonError::into_inner);
        self.backend.commit(batch)
    }

    fn expander(&self) -> Expander<'_> {
        Expander::new(self.backend.as_ref(), &self.resolver, &self.live)
    }

    pub(crate) fn lookup(&self, id: &EntryId) -> SdkResult<Object> {
        let mut objects = self.expander().expand(std::slice::from_ref(id))?;
        objects
            .pop()
            .ok_or_else(|| SdkError::Graph(GraphError::NotFound(id.clone())))
    }
}

impl Materializer for EngineInner {
    fn materialize(&self, ids: &[EntryId]) -> GraphResult<Vec<Object>> {
        self.expander().expand(ids)
    }

    fn object_id(&self, object: &Object) -> Option<EntryId> {
        self.live.id_of(object)
    }
}

/// Builder for an [`Engine`].
pub struct EngineBuilder {
    map: TypeMap,
    hierarchy: Hierarchy,
    config: EngineConfig,
    backend: Option<Arc<dyn Backend>>,
    index: Option<Arc<dyn SearchIndex>>,
}

impl EngineBuilder {
    /// Declared class ancestry for isa resolution.
    pub fn hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Store entries in `backend` instead of a fresh in-memory one.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Publish facts to `index`. Takes precedence over `config.search`.
    pub fn index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Engine {
        let Self {
            map,
            hierarchy,
            config,
            backend,
            index,
        } = self;

        let backend = backend
            .unwrap_or_else(|| Arc::new(InMemoryBackend::with_codec_kind(config.codec)));
        let index = index.or_else(|| {
            config
                .search
                .then(|| Arc::new(SimpleIndex::new()) as Arc<dyn SearchIndex>)
        });
        debug!(
            codec = ?config.codec,
            search = index.is_some(),
            skip_unchanged = config.skip_unchanged,
            "engine built"
        );

        Engine {
            inner: Arc::new(EngineInner {
                config,
                backend,
                resolver: Resolver::with_hierarchy(map, hierarchy),
                live: LiveObjectSet::new(),
                index,
                commit_gate: RwLock::new(()),
            }),
        }
    }
}

/// A configured persistence engine.
///
/// Cheap to clone; clones share the backend, the resolver and the live
/// object set. Storing and loading need an open [`Scope`]:
///
/// ```ignore
/// let engine = Engine::in_memory(types);
/// let _scope = engine.new_scope();
/// let id = engine.store(&object)?;
/// assert!(same_object(&engine.lookup(&id)?, &object));
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn builder(map: TypeMap) -> EngineBuilder {
        EngineBuilder {
            map,
            hierarchy: Hierarchy::new(),
            config: EngineConfig::default(),
            backend: None,
            index: None,
        }
    }

    /// An engine over a fresh in-memory backend with the default config.
    pub fn in_memory(map: TypeMap) -> Self {
        Self::builder(map).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn live(&self) -> &LiveObjectSet {
        &self.inner.live
    }

    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// Declare the direct parents of `class`.
    pub fn declare_class<I, P>(&self, class: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.inner.resolver.declare_class(class, parents);
    }

    /// Replace the type map.
    pub fn reconfigure(&self, map: TypeMap) {
        self.inner.resolver.reconfigure(map);
    }

    /// Open a unit-of-work scope. Objects stored or loaded while it is open
    /// stay live at least until it is dropped.
    pub fn new_scope(&self) -> Scope {
        self.inner.live.new_scope()
    }

    fn materializer(&self) -> Arc<dyn Materializer> {
        Arc::clone(&self.inner) as Arc<dyn Materializer>
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Run `f` as one transaction. Its writes are committed atomically if it
    /// returns `Ok`; otherwise nothing is written and revision bookkeeping
    /// is restored.
    pub fn txn<R>(&self, f: impl FnOnce(&mut Txn<'_>) -> SdkResult<R>) -> SdkResult<R> {
        let mut tx = Txn::new(&self.inner);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "transaction aborted");
                tx.rollback();
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    /// Store `object` and everything it reaches, creating or replacing
    /// entries. Returns the object's id.
    pub fn store(&self, object: &Object) -> SdkResult<EntryId> {
        self.txn(|tx| tx.store(object))
    }

    /// Store several root objects in one transaction.
    pub fn store_all(&self, objects: &[Object]) -> SdkResult<Vec<EntryId>> {
        self.txn(|tx| tx.store_all(objects))
    }

    /// Store `object` under a caller-chosen id.
    pub fn store_as(&self, id: EntryId, object: &Object) -> SdkResult<EntryId> {
        self.txn(|tx| tx.store_as(id, object))
    }

    /// Store several roots under caller-chosen ids in one transaction.
    pub fn store_all_as(&self, roots: &[(EntryId, Object)]) -> SdkResult<Vec<EntryId>> {
        self.txn(|tx| tx.store_all_as(roots))
    }

    /// Store an object that has never been stored.
    pub fn insert(&self, object: &Object) -> SdkResult<EntryId> {
        self.txn(|tx| tx.insert(object))
    }

    /// Store an object that has been stored before.
    pub fn update(&self, object: &Object) -> SdkResult<EntryId> {
        self.txn(|tx| tx.update(object))
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The live object stored under `id`, loading it and whatever it
    /// reaches if it is not live yet.
    pub fn lookup(&self, id: &EntryId) -> SdkResult<Object> {
        self.inner.lookup(id)
    }

    /// The live objects for `ids`, in order, loaded in one pass.
    pub fn lookup_many(&self, ids: &[EntryId]) -> SdkResult<Vec<Object>> {
        Ok(self.inner.expander().expand(ids)?)
    }

    /// [`lookup`](Self::lookup) and downcast to `T`.
    pub fn lookup_as<T: Persist>(&self, id: &EntryId) -> SdkResult<Arc<T>> {
        let object = self.lookup(id)?;
        downcast::<T>(&object).ok_or_else(|| SdkError::TypeMismatch {
            id: id.clone(),
            expected: type_name::<T>(),
            found: object.class().to_string(),
        })
    }

    /// The id `object` is live under, if it has been stored or loaded.
    pub fn object_to_id(&self, object: &Object) -> Option<EntryId> {
        self.inner.live.id_of(object)
    }

    pub fn exists(&self, id: &EntryId) -> SdkResult<bool> {
        Ok(self.inner.backend.exists(id)?)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete the entries stored under `ids`. Returns how many existed.
    pub fn delete(&self, ids: &[EntryId]) -> SdkResult<usize> {
        let mut existing = Vec::with_capacity(ids.len());
        for id in ids {
            if self.inner.backend.exists(id)? {
                existing.push(id.clone());
            }
        }
        self.txn(|tx| {
            tx.delete(&existing);
            Ok(existing.len())
        })
    }

    /// Delete the entries `objects` are stored under. Returns how many of
    /// them were stored.
    pub fn delete_objects(&self, objects: &[Object]) -> SdkResult<usize> {
        self.txn(|tx| Ok(tx.delete_objects(objects)))
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    /// Stored objects whose facts match `query`, none of them loaded yet.
    pub fn search(&self, query: &Query) -> SdkResult<DeferredSet> {
        let index = self
            .inner
            .index
            .as_ref()
            .ok_or_else(|| SdkError::Config("search is disabled".into()))?;
        let hits = index.search(query)?;
        Ok(DeferredSet::deferred(hits, self.materializer()))
    }

    /// A deferred set over stored ids.
    pub fn deferred(&self, ids: impl IntoIterator<Item = EntryId>) -> DeferredSet {
        DeferredSet::deferred(ids, self.materializer())
    }

    /// A set of live objects. Stored members are keyed by their id, so it
    /// combines with deferred sets from the same engine.
    pub fn transient(&self, objects: impl IntoIterator<Item = Object>, holding: Holding) -> DeferredSet {
        DeferredSet::transient(objects, holding, Some(self.materializer()))
    }

    /// Every stored root, unloaded.
    pub fn root_set(&self) -> SdkResult<DeferredSet> {
        let roots = self
            .inner
            .backend
            .scan()?
            .into_iter()
            .filter(|entry| entry.root)
            .map(|entry| entry.id);
        Ok(self.deferred(roots))
    }

    /// Every stored entry, unloaded.
    pub fn all_objects(&self) -> SdkResult<DeferredSet> {
        let ids = self.inner.backend.scan()?.into_iter().map(|entry| entry.id);
        Ok(self.deferred(ids))
    }

    // -----------------------------------------------------------------------
    // Roots and garbage collection
    // -----------------------------------------------------------------------

    /// Mark the entry under `id` as a root. Returns `false` if it already
    /// was one.
    pub fn set_root(&self, id: &EntryId) -> SdkResult<bool> {
        self.mark_root(id, true)
    }

    /// Clear the root flag of the entry under `id`. Returns `false` if it
    /// was not a root.
    pub fn unset_root(&self, id: &EntryId) -> SdkResult<bool> {
        self.mark_root(id, false)
    }

    fn mark_root(&self, id: &EntryId, root: bool) -> SdkResult<bool> {
        let mut entry = self
            .inner
            .backend
            .get(id)?
            .ok_or_else(|| SdkError::Graph(GraphError::NotFound(id.clone())))?;
        if entry.root == root {
            return Ok(false);
        }
        entry.prev = Some(entry.digest()?);
        entry.root = root;
        let revision = entry.digest()?;

        let mut batch = WriteBatch::new();
        batch.put(entry);
        self.inner.commit_batch(batch)?;
        self.inner.live.set_revision(id, Some(revision));
        debug!(id = %id, root, "root flag changed");
        Ok(true)
    }

    /// Delete every entry not reachable from a root.
    ///
    /// Commits made through this engine wait until the pass is over, so
    /// nothing written between the scan and the sweep is lost. Writers
    /// that bypass the engine, such as another engine on the same backend,
    /// are not excluded. A transaction that collapsed a reference to an
    /// unreachable, unchanged entry before the pass began may commit a
    /// dangling reference to it afterwards.
    pub fn collect_garbage(&self) -> SdkResult<GcReport> {
        let _gate = self
            .inner
            .commit_gate
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entries = self.inner.backend.scan()?;
        let reachable = gc::mark(&entries);
        let removed = gc::sweep(&entries, &reachable);

        if !removed.is_empty() {
            let mut batch = WriteBatch::new();
            for id in &removed {
                batch.delete(id.clone());
            }
            self.inner.backend.commit(batch)?;
            self.inner.live.forget(&removed);
            if let Some(index) = &self.inner.index {
                for id in &removed {
                    index.remove(id)?;
                }
            }
        }

        let report = GcReport {
            scanned: entries.len(),
            reachable: reachable.len(),
            removed,
        };
        info!(
            scanned = report.scanned,
            reachable = report.reachable,
            removed = report.removed.len(),
            "garbage collected"
        );
        Ok(report)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("resolver", &self.inner.resolver)
            .field("live", &self.inner.live)
            .field("search", &self.inner.index.is_some())
            .finish_non_exhaustive()
    }
}
