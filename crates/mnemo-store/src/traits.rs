use mnemo_types::{Entry, EntryId};

use crate::batch::{WriteBatch, WriteOp};
use crate::error::StoreResult;

/// Key → entry storage backend.
///
/// All implementations must satisfy these invariants:
/// - Entries are read and written whole, keyed by their id.
/// - A put whose entry carries a `prev` digest is rejected with
///   [`StoreError::Conflict`](crate::StoreError::Conflict) when the stored
///   revision differs.
/// - The backend never interprets entry data beyond its codec.
/// - All I/O errors are propagated, never silently ignored.
pub trait Backend: Send + Sync {
    /// Read an entry by id.
    ///
    /// Returns `Ok(None)` if the entry does not exist.
    fn get(&self, id: &EntryId) -> StoreResult<Option<Entry>>;

    /// Create or replace an entry.
    fn put(&self, entry: &Entry) -> StoreResult<()>;

    /// Delete an entry by id. Returns `true` if the entry existed.
    fn delete(&self, id: &EntryId) -> StoreResult<bool>;

    /// Every stored entry, in id order.
    fn scan(&self) -> StoreResult<Vec<Entry>>;

    /// Check whether an entry exists.
    fn exists(&self, id: &EntryId) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Read multiple entries in a batch.
    ///
    /// Default implementation calls `get()` for each id.
    fn get_batch(&self, ids: &[EntryId]) -> StoreResult<Vec<Option<Entry>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Apply a batch of writes.
    ///
    /// The default implementation applies operations one by one and is not
    /// atomic. Backends with transactional storage must override it so
    /// that a failed batch leaves nothing behind.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(entry) => self.put(&entry)?,
                WriteOp::Delete(id) => {
                    self.delete(&id)?;
                }
            }
        }
        Ok(())
    }
}
