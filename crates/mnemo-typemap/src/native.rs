//! Field-list strategies for Rust types.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use mnemo_object::{downcast_ref, Fields, Object, ObjectError, ObjectResult, Persist, Tree};
use mnemo_types::Facts;

use crate::strategy::Strategy;

/// A Rust type that knows how to flatten itself into named fields.
///
/// Nested objects go into the fields as [`Link`](mnemo_object::Link)s or
/// bare objects; the collapser takes care of them. On expansion, links to
/// other entries arrive unbound and are bound once every object of the
/// load exists, so `expand` must keep them as they are rather than read
/// through them.
pub trait Persistable: Persist + Sized {
    fn collapse(&self) -> Fields;

    /// Rebuild an instance. `class` is the stored class name, which lets one
    /// Rust type stand for a whole class family.
    fn expand(class: &str, fields: Fields) -> ObjectResult<Self>;
}

type IndexFn<T> = dyn Fn(&T) -> Facts + Send + Sync;

/// The [`Strategy`] for a [`Persistable`] type.
pub struct Native<T> {
    weak: Vec<String>,
    indexed: Option<Arc<IndexFn<T>>>,
    intrinsic: bool,
    _type: PhantomData<fn() -> T>,
}

impl<T: Persistable> Native<T> {
    pub fn new() -> Self {
        Self {
            weak: Vec::new(),
            indexed: None,
            intrinsic: false,
            _type: PhantomData,
        }
    }

    /// Store instances inline in their owner.
    pub fn intrinsic(mut self) -> Self {
        self.intrinsic = true;
        self
    }

    /// Bind the link in `field` weakly when expanding.
    pub fn weak(mut self, field: impl Into<String>) -> Self {
        self.weak.push(field.into());
        self
    }

    /// Publish search facts for every stored instance.
    pub fn indexed(mut self, facts: impl Fn(&T) -> Facts + Send + Sync + 'static) -> Self {
        self.indexed = Some(Arc::new(facts));
        self
    }

    fn concrete<'a>(&self, object: &'a Object) -> ObjectResult<&'a T> {
        downcast_ref::<T>(object).ok_or_else(|| ObjectError::UnexpectedType {
            expected: type_name::<T>(),
            found: object.class().to_string(),
        })
    }
}

impl<T: Persistable> Default for Native<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Persistable> Strategy for Native<T> {
    fn collapse(&self, object: &Object) -> ObjectResult<Tree> {
        Ok(self.concrete(object)?.collapse().into())
    }

    fn expand(&self, class: &str, tree: Tree) -> ObjectResult<Object> {
        let fields = Fields::from_tree(class, tree)?;
        for field in &self.weak {
            fields.weaken(field);
        }
        let object: Object = Arc::new(T::expand(class, fields)?);
        Ok(object)
    }

    fn facts(&self, object: &Object) -> Option<Facts> {
        let indexed = self.indexed.as_ref()?;
        downcast_ref::<T>(object).map(|concrete| indexed(concrete))
    }

    fn is_intrinsic(&self) -> bool {
        self.intrinsic
    }
}

impl<T> fmt::Debug for Native<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native")
            .field("type", &type_name::<T>())
            .field("weak", &self.weak)
            .field("indexed", &self.indexed.is_some())
            .field("intrinsic", &self.intrinsic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use mnemo_object::Link;
    use mnemo_types::Value;

    use super::*;

    #[derive(Debug)]
    struct Person {
        name: String,
        friend: Link,
    }

    impl Persist for Person {
        fn class(&self) -> &str {
            "Person"
        }
    }

    impl Persistable for Person {
        fn collapse(&self) -> Fields {
            Fields::new()
                .with("name", self.name.as_str())
                .with("friend", self.friend.clone())
        }

        fn expand(_class: &str, mut fields: Fields) -> ObjectResult<Self> {
            Ok(Self {
                name: fields.take_str("name")?,
                friend: fields.take_link("friend")?,
            })
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Persist for Other {
        fn class(&self) -> &str {
            "Other"
        }
    }

    fn person(name: &str) -> Object {
        Arc::new(Person {
            name: name.into(),
            friend: Link::empty(),
        })
    }

    #[test]
    fn collapse_produces_fields() {
        let tree = Native::<Person>::new().collapse(&person("alice")).unwrap();
        let fields = Fields::from_tree("Person", tree).unwrap();
        assert_eq!(fields.get("name").and_then(Tree::as_str), Some("alice"));
    }

    #[test]
    fn collapse_rejects_foreign_type() {
        let err = Native::<Person>::new()
            .collapse(&(Arc::new(Other) as Object))
            .unwrap_err();
        assert!(matches!(err, ObjectError::UnexpectedType { found, .. } if found == "Other"));
    }

    #[test]
    fn expand_weakens_declared_fields() {
        let strategy = Native::<Person>::new().weak("friend");
        let tree = Fields::new()
            .with("name", "bob")
            .with("friend", Link::unresolved("a1".into()))
            .into();
        let object = strategy.expand("Person", tree).unwrap();
        let person = downcast_ref::<Person>(&object).unwrap();
        assert_eq!(person.name, "bob");
        assert!(person.friend.is_weak());
    }

    #[test]
    fn expand_requires_fields() {
        let err = Native::<Person>::new()
            .expand("Person", Tree::Int(1))
            .unwrap_err();
        assert_eq!(err, ObjectError::ExpectedFields("Person".into()));
    }

    #[test]
    fn indexed_publishes_facts() {
        let strategy = Native::<Person>::new().indexed(|p: &Person| {
            let mut facts = Facts::new();
            facts.insert("name".into(), Value::from(p.name.as_str()));
            facts
        });
        let facts = strategy.facts(&person("alice")).unwrap();
        assert_eq!(facts["name"], Value::from("alice"));
        assert!(Native::<Person>::new().facts(&person("alice")).is_none());
    }

    #[test]
    fn builder_flags() {
        assert!(Native::<Person>::new().intrinsic().is_intrinsic());
        assert!(!Native::<Person>::default().is_intrinsic());
    }
}
