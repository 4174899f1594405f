use mnemo_types::{EntryId, Facts};

use crate::error::IndexResult;
use crate::query::Query;

/// Ids matching a query, produced lazily.
pub type Hits = Box<dyn Iterator<Item = EntryId> + Send>;

/// Keeps searchable facts per entry.
pub trait SearchIndex: Send + Sync {
    /// Record `facts` for `id`, replacing whatever was recorded before.
    fn index(&self, id: &EntryId, facts: &Facts) -> IndexResult<()>;

    /// Drop everything recorded for `id`.
    fn remove(&self, id: &EntryId) -> IndexResult<()>;

    /// Ids whose facts satisfy `query`.
    fn search(&self, query: &Query) -> IndexResult<Hits>;
}
