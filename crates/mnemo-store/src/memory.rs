use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mnemo_types::{Entry, EntryId};
use tracing::debug;

use crate::batch::{WriteBatch, WriteOp};
use crate::codec::{Codec, CodecKind, JsonCodec};
use crate::error::{StoreError, StoreResult};
use crate::traits::Backend;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Entries are held encoded by the
/// configured [`Codec`], so every read goes through a real decode. Batches
/// are validated in full before any write is applied.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<EntryId, Vec<u8>>>,
    codec: Box<dyn Codec>,
    read_only: AtomicBool,
}

impl InMemoryBackend {
    /// Create a new empty backend using the JSON codec.
    pub fn new() -> Self {
        Self::with_codec(Box::new(JsonCodec))
    }

    /// Create a new empty backend using `codec`.
    pub fn with_codec(codec: Box<dyn Codec>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            codec,
            read_only: AtomicBool::new(false),
        }
    }

    /// Create a new empty backend using the named codec.
    pub fn with_codec_kind(kind: CodecKind) -> Self {
        Self::with_codec(kind.codec())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EntryId, Vec<u8>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EntryId, Vec<u8>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the codec entries are held in.
    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the backend is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Total encoded bytes across all stored entries.
    pub fn total_bytes(&self) -> u64 {
        self.read().values().map(|bytes| bytes.len() as u64).sum()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Return a sorted list of all entry ids.
    pub fn all_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Reject (or accept again) every write.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    fn decode(&self, id: &EntryId, bytes: &[u8]) -> StoreResult<Entry> {
        let entry = self.codec.decode(bytes)?;
        if &entry.id != id {
            return Err(StoreError::CorruptEntry {
                id: id.clone(),
                reason: format!("stored under {id} but decodes as {}", entry.id),
            });
        }
        Ok(entry)
    }

    /// Encode `entry` after checking its `prev` digest against `current`.
    fn prepare(&self, entry: &Entry, current: Option<&Vec<u8>>) -> StoreResult<Vec<u8>> {
        if let (Some(expected), Some(bytes)) = (entry.prev, current) {
            let stored = self.decode(&entry.id, bytes)?;
            let found = stored.digest().map_err(|e| StoreError::CorruptEntry {
                id: entry.id.clone(),
                reason: e.to_string(),
            })?;
            if found != expected {
                return Err(StoreError::Conflict {
                    id: entry.id.clone(),
                    expected: Some(expected),
                    found: Some(found),
                });
            }
        }
        self.codec.encode(entry)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn get(&self, id: &EntryId) -> StoreResult<Option<Entry>> {
        let map = self.read();
        map.get(id).map(|bytes| self.decode(id, bytes)).transpose()
    }

    fn put(&self, entry: &Entry) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut map = self.write();
        let bytes = self.prepare(entry, map.get(&entry.id))?;
        map.insert(entry.id.clone(), bytes);
        Ok(())
    }

    fn delete(&self, id: &EntryId) -> StoreResult<bool> {
        self.ensure_writable()?;
        Ok(self.write().remove(id).is_some())
    }

    fn scan(&self) -> StoreResult<Vec<Entry>> {
        let map = self.read();
        let mut entries = map
            .iter()
            .map(|(id, bytes)| self.decode(id, bytes))
            .collect::<StoreResult<Vec<_>>>()?;
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    fn exists(&self, id: &EntryId) -> StoreResult<bool> {
        Ok(self.read().contains_key(id))
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.ensure_writable()?;
        let mut map = self.write();

        // Stage every operation against an overlay first so that a
        // conflict or codec failure leaves the map untouched.
        let mut staged: HashMap<EntryId, Option<Vec<u8>>> = HashMap::new();
        let count = batch.len();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(entry) => {
                    let current = match staged.get(&entry.id) {
                        Some(overlay) => overlay.as_ref(),
                        None => map.get(&entry.id),
                    };
                    let bytes = self.prepare(&entry, current)?;
                    staged.insert(entry.id, Some(bytes));
                }
                WriteOp::Delete(id) => {
                    staged.insert(id, None);
                }
            }
        }

        for (id, bytes) in staged {
            match bytes {
                Some(bytes) => {
                    map.insert(id, bytes);
                }
                None => {
                    map.remove(&id);
                }
            }
        }
        debug!(ops = count, codec = self.codec.name(), "committed batch");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("entry_count", &self.len())
            .field("codec", &self.codec.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mnemo_types::{Reference, Value};

    use super::*;
    use crate::codec::BincodeCodec;

    fn make_entry(id: &str, name: &str) -> Entry {
        let mut data = BTreeMap::new();
        data.insert("name".to_string(), Value::from(name));
        Entry::new(id.into(), Some("Person".into()), Value::Map(data))
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let backend = InMemoryBackend::new();
        let entry = make_entry("a1", "alice");
        backend.put(&entry).unwrap();
        assert_eq!(backend.get(&"a1".into()).unwrap(), Some(entry));
    }

    #[test]
    fn get_missing_returns_none() {
        let backend = InMemoryBackend::new();
        assert!(backend.get(&"missing".into()).unwrap().is_none());
        assert!(!backend.exists(&"missing".into()).unwrap());
    }

    #[test]
    fn put_replaces() {
        let backend = InMemoryBackend::new();
        backend.put(&make_entry("a1", "alice")).unwrap();
        backend.put(&make_entry("a1", "alicia")).unwrap();
        let entry = backend.get(&"a1".into()).unwrap().unwrap();
        assert_eq!(entry, make_entry("a1", "alicia"));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn delete_present_and_missing() {
        let backend = InMemoryBackend::new();
        backend.put(&make_entry("a1", "alice")).unwrap();
        assert!(backend.delete(&"a1".into()).unwrap());
        assert!(!backend.exists(&"a1".into()).unwrap());
        assert!(!backend.delete(&"a1".into()).unwrap());
    }

    #[test]
    fn bincode_backend_roundtrips_references() {
        let backend = InMemoryBackend::with_codec(Box::new(BincodeCodec));
        let entry = Entry::new(
            "a1".into(),
            None,
            Value::List(vec![Value::Ref(Reference::to("b1".into()))]),
        )
        .with_root(true);
        backend.put(&entry).unwrap();
        let back = backend.get(&"a1".into()).unwrap().unwrap();
        assert_eq!(back, entry);
        assert_eq!(backend.codec_name(), "bincode");
    }

    // -----------------------------------------------------------------------
    // Revisions
    // -----------------------------------------------------------------------

    #[test]
    fn put_with_matching_prev_succeeds() {
        let backend = InMemoryBackend::new();
        let first = make_entry("a1", "alice");
        backend.put(&first).unwrap();

        let mut second = make_entry("a1", "alicia");
        second.prev = Some(first.digest().unwrap());
        backend.put(&second).unwrap();
    }

    #[test]
    fn put_with_stale_prev_conflicts() {
        let backend = InMemoryBackend::new();
        let first = make_entry("a1", "alice");
        backend.put(&first).unwrap();
        backend.put(&make_entry("a1", "mallory")).unwrap();

        let mut second = make_entry("a1", "alicia");
        second.prev = Some(first.digest().unwrap());
        let err = backend.put(&second).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn put_with_prev_but_nothing_stored_succeeds() {
        let backend = InMemoryBackend::new();
        let mut entry = make_entry("a1", "alice");
        entry.prev = Some(make_entry("a1", "old").digest().unwrap());
        backend.put(&entry).unwrap();
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[test]
    fn commit_applies_all_operations() {
        let backend = InMemoryBackend::new();
        backend.put(&make_entry("old", "gone")).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(make_entry("a1", "alice"));
        batch.put(make_entry("b1", "bob"));
        batch.delete("old".into());
        backend.commit(batch).unwrap();

        assert_eq!(backend.all_ids(), vec![EntryId::from("a1"), EntryId::from("b1")]);
    }

    #[test]
    fn failed_commit_leaves_nothing_behind() {
        let backend = InMemoryBackend::new();
        let first = make_entry("a1", "alice");
        backend.put(&first).unwrap();
        backend.put(&make_entry("a1", "changed")).unwrap();

        let mut stale = make_entry("a1", "alicia");
        stale.prev = Some(first.digest().unwrap());

        let mut batch = WriteBatch::new();
        batch.put(make_entry("b1", "bob"));
        batch.delete("a1".into());
        batch.put(stale);
        assert!(backend.commit(batch).is_err());

        assert!(!backend.exists(&"b1".into()).unwrap());
        assert_eq!(
            backend.get(&"a1".into()).unwrap(),
            Some(make_entry("a1", "changed"))
        );
    }

    #[test]
    fn commit_sees_earlier_puts_in_same_batch() {
        let backend = InMemoryBackend::new();
        let first = make_entry("a1", "alice");
        let mut second = make_entry("a1", "alicia");
        second.prev = Some(first.digest().unwrap());

        let mut batch = WriteBatch::new();
        batch.put(first);
        batch.put(second.clone());
        backend.commit(batch).unwrap();
        let stored = backend.get(&"a1".into()).unwrap().unwrap();
        assert_eq!(stored.data, second.data);
    }

    #[test]
    fn read_only_rejects_writes() {
        let backend = InMemoryBackend::new();
        backend.set_read_only(true);
        assert!(matches!(
            backend.put(&make_entry("a1", "alice")),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            backend.commit(WriteBatch::new()),
            Err(StoreError::ReadOnly)
        ));
        backend.set_read_only(false);
        backend.put(&make_entry("a1", "alice")).unwrap();
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn scan_is_sorted() {
        let backend = InMemoryBackend::new();
        backend.put(&make_entry("c", "c")).unwrap();
        backend.put(&make_entry("a", "a")).unwrap();
        backend.put(&make_entry("b", "b")).unwrap();
        let ids: Vec<String> = backend
            .scan()
            .unwrap()
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn get_batch_with_missing() {
        let backend = InMemoryBackend::new();
        backend.put(&make_entry("a1", "alice")).unwrap();
        let results = backend
            .get_batch(&["a1".into(), "missing".into()])
            .unwrap();
        assert!(results[0].is_some());
        assert!(results[1].is_none());
    }

    #[test]
    fn len_clear_and_bytes() {
        let backend = InMemoryBackend::default();
        assert!(backend.is_empty());
        backend.put(&make_entry("a1", "alice")).unwrap();
        assert_eq!(backend.len(), 1);
        assert!(backend.total_bytes() > 0);
        backend.clear();
        assert!(backend.is_empty());
    }

    #[test]
    fn debug_format() {
        let backend = InMemoryBackend::new();
        let debug = format!("{backend:?}");
        assert!(debug.contains("InMemoryBackend"));
        assert!(debug.contains("entry_count"));
    }
}
