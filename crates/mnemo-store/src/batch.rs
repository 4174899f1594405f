use mnemo_types::{Entry, EntryId};

/// A single write in a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    Put(Entry),
    Delete(EntryId),
}

impl WriteOp {
    /// The id this operation touches.
    pub fn id(&self) -> &EntryId {
        match self {
            Self::Put(entry) => &entry.id,
            Self::Delete(id) => id,
        }
    }
}

/// An ordered group of writes committed atomically.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, entry: Entry) {
        self.ops.push(WriteOp::Put(entry));
    }

    pub fn delete(&mut self, id: EntryId) {
        self.ops.push(WriteOp::Delete(id));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Append every operation of `other`.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }
}
