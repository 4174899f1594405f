//! In-memory equality index.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock};

use mnemo_types::{EntryId, Facts, Value};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::query::Query;
use crate::traits::{Hits, SearchIndex};

/// `(field, canonical value)` → ids.
type Posting = (String, String);

#[derive(Default)]
struct State {
    postings: HashMap<Posting, BTreeSet<EntryId>>,
    documents: HashMap<EntryId, Vec<Posting>>,
}

impl State {
    fn unindex(&mut self, id: &EntryId) {
        let Some(postings) = self.documents.remove(id) else {
            return;
        };
        for posting in postings {
            if let Some(ids) = self.postings.get_mut(&posting) {
                ids.remove(id);
                if ids.is_empty() {
                    self.postings.remove(&posting);
                }
            }
        }
    }
}

/// Postings-list index answering equality conjunctions.
///
/// Values are compared by their canonical JSON form, so `Int(1)` and
/// `Float(1.0)` are different values.
#[derive(Default)]
pub struct SimpleIndex {
    state: RwLock<State>,
}

impl SimpleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().documents.is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn canonical(value: &Value) -> IndexResult<String> {
    serde_json::to_string(value).map_err(|e| IndexError::Serialization(e.to_string()))
}

impl SearchIndex for SimpleIndex {
    fn index(&self, id: &EntryId, facts: &Facts) -> IndexResult<()> {
        let postings = facts
            .iter()
            .map(|(field, value)| canonical(value).map(|c| (field.clone(), c)))
            .collect::<IndexResult<Vec<Posting>>>()?;

        let mut state = self.write();
        state.unindex(id);
        for posting in &postings {
            state
                .postings
                .entry(posting.clone())
                .or_default()
                .insert(id.clone());
        }
        state.documents.insert(id.clone(), postings);
        debug!(id = %id, facts = facts.len(), "indexed entry");
        Ok(())
    }

    fn remove(&self, id: &EntryId) -> IndexResult<()> {
        self.write().unindex(id);
        Ok(())
    }

    fn search(&self, query: &Query) -> IndexResult<Hits> {
        let wanted = query
            .terms()
            .iter()
            .map(|(field, value)| canonical(value).map(|c| (field.clone(), c)))
            .collect::<IndexResult<Vec<Posting>>>()?;

        let state = self.read();
        if wanted.is_empty() {
            let mut all: Vec<EntryId> = state.documents.keys().cloned().collect();
            all.sort();
            return Ok(Box::new(all.into_iter()));
        }

        let mut lists = Vec::with_capacity(wanted.len());
        for posting in &wanted {
            match state.postings.get(posting) {
                Some(ids) => lists.push(ids),
                None => return Ok(Box::new(std::iter::empty())),
            }
        }
        lists.sort_by_key(|ids| ids.len());
        let (smallest, rest) = lists.split_at(1);
        let hits: Vec<EntryId> = smallest[0]
            .iter()
            .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
            .cloned()
            .collect();
        Ok(Box::new(hits.into_iter()))
    }
}

impl fmt::Debug for SimpleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("SimpleIndex")
            .field("documents", &state.documents.len())
            .field("postings", &state.postings.len())
            .finish()
    }
}
