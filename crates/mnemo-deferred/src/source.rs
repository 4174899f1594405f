use mnemo_graph::GraphResult;
use mnemo_object::Object;
use mnemo_types::EntryId;

/// Where a deferred set loads its members from.
pub trait Materializer: Send + Sync {
    /// The live objects for `ids`, in order, loaded in one pass.
    fn materialize(&self, ids: &[EntryId]) -> GraphResult<Vec<Object>>;

    /// The id `object` is stored under, if it is stored.
    fn object_id(&self, object: &Object) -> Option<EntryId>;
}
