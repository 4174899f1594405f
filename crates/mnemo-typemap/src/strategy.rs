use std::fmt;

use mnemo_object::{downcast_ref, Container, Object, ObjectError, ObjectResult, Tree};
use mnemo_types::Facts;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How one class of objects is collapsed into a field tree and expanded back.
///
/// `collapse` must not follow nested objects itself: it returns them as
/// [`Tree::Object`] or [`Tree::Link`] leaves and the collapser decides
/// whether they are referenced or inlined. Likewise `expand` receives
/// unresolved links for references; they are bound after the object has
/// been registered.
pub trait Strategy: Send + Sync {
    /// Produce the data tree for `object`.
    fn collapse(&self, object: &Object) -> ObjectResult<Tree>;

    /// Build a new instance of `class` from its data tree.
    fn expand(&self, class: &str, tree: Tree) -> ObjectResult<Object>;

    /// Searchable facts about `object`, if the class is indexed.
    fn facts(&self, _object: &Object) -> Option<Facts> {
        None
    }

    /// Whether objects handled by this strategy are stored inline in their
    /// owner instead of as entries of their own.
    fn is_intrinsic(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

type CollapseFn = dyn Fn(&Object) -> ObjectResult<Tree> + Send + Sync;
type ExpandFn = dyn Fn(&str, Tree) -> ObjectResult<Object> + Send + Sync;

/// A strategy made of two closures.
pub struct Callbacks {
    collapse: Box<CollapseFn>,
    expand: Box<ExpandFn>,
    intrinsic: bool,
}

impl Callbacks {
    pub fn new<C, E>(collapse: C, expand: E) -> Self
    where
        C: Fn(&Object) -> ObjectResult<Tree> + Send + Sync + 'static,
        E: Fn(&str, Tree) -> ObjectResult<Object> + Send + Sync + 'static,
    {
        Self {
            collapse: Box::new(collapse),
            expand: Box::new(expand),
            intrinsic: false,
        }
    }

    /// Store handled objects inline in their owner.
    pub fn intrinsic(mut self) -> Self {
        self.intrinsic = true;
        self
    }
}

impl Strategy for Callbacks {
    fn collapse(&self, object: &Object) -> ObjectResult<Tree> {
        (self.collapse)(object)
    }

    fn expand(&self, class: &str, tree: Tree) -> ObjectResult<Object> {
        (self.expand)(class, tree)
    }

    fn is_intrinsic(&self) -> bool {
        self.intrinsic
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("intrinsic", &self.intrinsic)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ContainerStrategy
// ---------------------------------------------------------------------------

/// Strategy for class-less [`Container`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainerStrategy;

impl Strategy for ContainerStrategy {
    fn collapse(&self, object: &Object) -> ObjectResult<Tree> {
        downcast_ref::<Container>(object)
            .map(Container::get)
            .ok_or_else(|| ObjectError::UnexpectedType {
                expected: "Container",
                found: object.class().to_string(),
            })
    }

    fn expand(&self, _class: &str, tree: Tree) -> ObjectResult<Object> {
        Ok(Container::shared(tree))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mnemo_object::Persist;

    use super::*;

    #[derive(Debug)]
    struct Tag(String);

    impl Persist for Tag {
        fn class(&self) -> &str {
            "Tag"
        }
    }

    fn tag_callbacks() -> Callbacks {
        Callbacks::new(
            |object| {
                downcast_ref::<Tag>(object)
                    .map(|tag| Tree::from(tag.0.as_str()))
                    .ok_or_else(|| ObjectError::Custom("not a tag".into()))
            },
            |_, tree| match tree {
                Tree::Str(s) => Ok(Arc::new(Tag(s)) as Object),
                other => Err(ObjectError::Custom(format!("bad tag: {}", other.kind()))),
            },
        )
    }

    #[test]
    fn callbacks_delegate_to_closures() {
        let strategy = tag_callbacks();
        let object: Object = Arc::new(Tag("red".into()));
        let tree = strategy.collapse(&object).unwrap();
        assert_eq!(tree.as_str(), Some("red"));

        let back = strategy.expand("Tag", tree).unwrap();
        assert_eq!(downcast_ref::<Tag>(&back).unwrap().0, "red");
        assert!(strategy.facts(&back).is_none());
        assert!(!strategy.is_intrinsic());
        assert!(tag_callbacks().intrinsic().is_intrinsic());
    }

    #[test]
    fn container_strategy_copies_contents() {
        let container = Container::shared(Tree::List(vec![Tree::Int(1)]));
        let tree = ContainerStrategy.collapse(&container).unwrap();
        let back = ContainerStrategy.expand(Container::CLASS, tree).unwrap();
        assert_eq!(back.class(), Container::CLASS);
        assert!(!Arc::ptr_eq(&back, &container));
    }

    #[test]
    fn container_strategy_rejects_other_types() {
        let object: Object = Arc::new(Tag("red".into()));
        assert_eq!(
            ContainerStrategy.collapse(&object).unwrap_err(),
            ObjectError::UnexpectedType {
                expected: "Container",
                found: "Tag".into()
            }
        );
    }
}
