use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Upcasting support for [`Persist`] trait objects.
///
/// Implemented for every `Send + Sync + 'static` type; never implement it by
/// hand.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type whose instances can take part in a persisted object graph.
///
/// `class` is the runtime class name the resolver looks strategies up by.
/// Several Rust types may share a class family, and one Rust type may
/// report different classes per instance.
pub trait Persist: AsAny + fmt::Debug {
    fn class(&self) -> &str;
}

/// Shared handle to a live object.
pub type Object = Arc<dyn Persist>;

/// Identity of a live object: the address of its allocation.
///
/// Only meaningful while the object is alive.
pub fn identity(object: &Object) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

/// Returns `true` if both handles point at the same instance.
pub fn same_object(a: &Object, b: &Object) -> bool {
    identity(a) == identity(b)
}

/// Recover the concrete type of a live object.
pub fn downcast<T: Persist>(object: &Object) -> Option<Arc<T>> {
    AsAny::into_any(Arc::clone(object)).downcast::<T>().ok()
}

/// Borrow the concrete type of a live object.
pub fn downcast_ref<T: Persist>(object: &Object) -> Option<&T> {
    AsAny::as_any(&**object).downcast_ref::<T>()
}
