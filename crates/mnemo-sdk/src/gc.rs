//! Mark-and-sweep over stored entries.

use std::collections::{HashMap, HashSet, VecDeque};

use mnemo_types::{Entry, EntryId};

/// Summary of a garbage collection run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Entries examined.
    pub scanned: usize,
    /// Entries reachable from a root.
    pub reachable: usize,
    /// Entries deleted, in id order.
    pub removed: Vec<EntryId>,
}

/// Ids reachable from the root entries along references, including
/// references held inside inlined values. References to missing entries
/// are ignored.
pub(crate) fn mark(entries: &[Entry]) -> HashSet<EntryId> {
    let by_id: HashMap<&EntryId, &Entry> = entries.iter().map(|e| (&e.id, e)).collect();

    let mut reachable = HashSet::new();
    let mut queue: VecDeque<&EntryId> = entries.iter().filter(|e| e.root).map(|e| &e.id).collect();
    while let Some(id) = queue.pop_front() {
        let Some(entry) = by_id.get(id) else {
            continue;
        };
        if !reachable.insert(id.clone()) {
            continue;
        }
        for reference in entry.references() {
            if !reachable.contains(&reference.id) {
                queue.push_back(&reference.id);
            }
        }
    }
    reachable
}

/// Entries not in `reachable`, in id order.
pub(crate) fn sweep(entries: &[Entry], reachable: &HashSet<EntryId>) -> Vec<EntryId> {
    let mut garbage: Vec<EntryId> = entries
        .iter()
        .filter(|e| !reachable.contains(&e.id))
        .map(|e| e.id.clone())
        .collect();
    garbage.sort();
    garbage
}
