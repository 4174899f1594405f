//! Units of work against the backend.

use std::collections::HashMap;

use mnemo_graph::{Collapsed, Collapser};
use mnemo_object::Object;
use mnemo_store::WriteBatch;
use mnemo_types::{Digest, EntryId, Facts};
use tracing::{debug, warn};

use crate::engine::EngineInner;
use crate::error::{SdkError, SdkResult};

/// A transaction: writes are collected in one batch and committed together
/// when the closure passed to [`Engine::txn`](crate::Engine::txn) returns
/// `Ok`.
///
/// Reads go through the live object set, so objects stored earlier in the
/// same transaction are visible by identity but not yet by id.
pub struct Txn<'e> {
    engine: &'e EngineInner,
    batch: WriteBatch,
    /// Revision each touched id had before the transaction.
    prior: HashMap<EntryId, Option<Digest>>,
    facts: Vec<(EntryId, Facts)>,
    deleted: Vec<EntryId>,
}

impl<'e> Txn<'e> {
    pub(crate) fn new(engine: &'e EngineInner) -> Self {
        Self {
            engine,
            batch: WriteBatch::new(),
            prior: HashMap::new(),
            facts: Vec::new(),
            deleted: Vec::new(),
        }
    }

    fn collapser(&self) -> Collapser<'e> {
        let engine = self.engine;
        Collapser::new(&engine.resolver, &engine.live)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store `object` and everything it reaches. Returns its id.
    pub fn store(&mut self, object: &Object) -> SdkResult<EntryId> {
        let collapsed = self.collapser().collapse(std::slice::from_ref(object))?;
        single(self.absorb(collapsed)?)
    }

    /// Store several objects as roots.
    pub fn store_all(&mut self, objects: &[Object]) -> SdkResult<Vec<EntryId>> {
        let collapsed = self.collapser().collapse(objects)?;
        self.absorb(collapsed)
    }

    /// Store `object` under `id`.
    pub fn store_as(&mut self, id: EntryId, object: &Object) -> SdkResult<EntryId> {
        let collapsed = self
            .collapser()
            .collapse_with_ids(&[(id, Object::clone(object))])?;
        single(self.absorb(collapsed)?)
    }

    /// Store several roots, each under its caller-chosen id. Roots that
    /// reach each other are linked by those ids.
    pub fn store_all_as(&mut self, roots: &[(EntryId, Object)]) -> SdkResult<Vec<EntryId>> {
        let collapsed = self.collapser().collapse_with_ids(roots)?;
        self.absorb(collapsed)
    }

    /// Store an object that has never been stored.
    pub fn insert(&mut self, object: &Object) -> SdkResult<EntryId> {
        if let Some(id) = self.engine.live.id_of(object) {
            return Err(SdkError::AlreadyStored(id));
        }
        self.store(object)
    }

    /// Store an object that has been stored before.
    pub fn update(&mut self, object: &Object) -> SdkResult<EntryId> {
        if self.engine.live.id_of(object).is_none() {
            return Err(SdkError::NotStored);
        }
        self.store(object)
    }

    /// Delete the entries stored under `ids`.
    pub fn delete(&mut self, ids: &[EntryId]) {
        let engine = self.engine;
        for id in ids {
            self.prior
                .entry(id.clone())
                .or_insert_with(|| engine.live.revision(id));
            self.batch.delete(id.clone());
            self.deleted.push(id.clone());
        }
    }

    /// Delete the entries `objects` are stored under. Returns how many of
    /// them were stored.
    pub fn delete_objects(&mut self, objects: &[Object]) -> usize {
        let ids: Vec<EntryId> = objects
            .iter()
            .filter_map(|object| self.engine.live.id_of(object))
            .collect();
        self.delete(&ids);
        ids.len()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn lookup(&self, id: &EntryId) -> SdkResult<Object> {
        self.engine.lookup(id)
    }

    /// Number of writes waiting for commit.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    // -----------------------------------------------------------------------
    // Commit / rollback
    // -----------------------------------------------------------------------

    /// Queue the collapsed entries for writing.
    fn absorb(&mut self, collapsed: Collapsed) -> SdkResult<Vec<EntryId>> {
        let Collapsed {
            mut entries,
            roots,
            facts,
        } = collapsed;

        // A stored root stays a root when it is written again as part of
        // someone else's graph.
        let revisited: Vec<EntryId> = entries
            .iter()
            .filter(|e| !e.root && e.prev.is_some())
            .map(|e| e.id.clone())
            .collect();
        if !revisited.is_empty() {
            let stored = self.engine.backend.get_batch(&revisited)?;
            let stored_roots: Vec<EntryId> = stored
                .into_iter()
                .flatten()
                .filter(|e| e.root)
                .map(|e| e.id)
                .collect();
            for entry in entries.iter_mut().filter(|e| stored_roots.contains(&e.id)) {
                entry.root = true;
                self.engine
                    .live
                    .set_revision(&entry.id, Some(entry.digest()?));
            }
        }

        for entry in entries {
            self.prior.entry(entry.id.clone()).or_insert(entry.prev);
            if self.engine.config.skip_unchanged && entry.is_unchanged() {
                debug!(id = %entry.id, "entry unchanged, skipping write");
                continue;
            }
            self.batch.put(entry);
        }
        self.facts.extend(facts);
        Ok(roots)
    }

    pub(crate) fn commit(mut self) -> SdkResult<()> {
        let ops = self.batch.len();
        if !self.batch.is_empty() {
            let batch = std::mem::take(&mut self.batch);
            if let Err(e) = self.engine.commit_batch(batch) {
                warn!(error = %e, ops, "commit failed, restoring revisions");
                self.rollback();
                return Err(e.into());
            }
        }

        self.engine.live.forget(&self.deleted);
        if let Some(index) = &self.engine.index {
            for id in &self.deleted {
                index.remove(id)?;
            }
            for (id, facts) in &self.facts {
                index.index(id, facts)?;
            }
        }
        debug!(ops, deleted = self.deleted.len(), "transaction committed");
        Ok(())
    }

    /// Put the revision bookkeeping back the way it was. Ids that had no
    /// revision were never stored and lose their binding.
    pub(crate) fn rollback(self) {
        let touched = self.prior.len();
        let mut unbound = Vec::new();
        for (id, revision) in self.prior {
            match revision {
                Some(_) => self.engine.live.set_revision(&id, revision),
                None => unbound.push(id),
            }
        }
        self.engine.live.forget(&unbound);
        debug!(touched, "transaction rolled back");
    }
}

fn single(ids: Vec<EntryId>) -> SdkResult<EntryId> {
    ids.into_iter().next().ok_or(SdkError::NotStored)
}
