//! Field trees exchanged between strategies and the collapser/expander.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ObjectError, ObjectResult};
use crate::link::Link;
use crate::object::{identity, Object};

/// The live-side counterpart of [`mnemo_types::Value`].
///
/// Where a stored value holds a reference or an inlined record, a tree
/// holds the object itself ([`Tree::Object`]) or a [`Link`] to it.
#[derive(Clone)]
pub enum Tree {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Tree>),
    Map(BTreeMap<String, Tree>),
    Object(Object),
    Link(Link),
}

impl Tree {
    /// The object this node points at, if any.
    pub fn object(&self) -> Option<Object> {
        match self {
            Self::Object(object) => Some(object.clone()),
            Self::Link(link) => link.get(),
            _ => None,
        }
    }

    /// The string payload, if this is a [`Tree::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is a [`Tree::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns `true` for [`Tree::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// A short name for the node's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Link(_) => "link",
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(n) => write!(f, "Int({n})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Map(map) => f.debug_map().entries(map).finish(),
            // Objects may be cyclic; print the class and address only.
            Self::Object(object) => {
                write!(f, "Object({}@{:#x})", object.class(), identity(object))
            }
            Self::Link(link) => write!(f, "{link:?}"),
        }
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Tree {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Tree {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Object> for Tree {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl From<Link> for Tree {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Self::List(items)
    }
}

impl From<Fields> for Tree {
    fn from(fields: Fields) -> Self {
        Self::Map(fields.0)
    }
}

impl<T: Into<Tree>> From<Option<T>> for Tree {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A named-field record, the usual shape of a class's collapsed state.
#[derive(Clone, Debug, Default)]
pub struct Fields(BTreeMap<String, Tree>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Tree>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Tree> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Tree> {
        self.0.iter()
    }

    /// Convert a tree that must be a map into fields. `class` names the
    /// owner in the error.
    pub fn from_tree(class: &str, tree: Tree) -> ObjectResult<Self> {
        match tree {
            Tree::Map(map) => Ok(Self(map)),
            _ => Err(ObjectError::ExpectedFields(class.to_string())),
        }
    }

    /// Remove a field.
    pub fn take(&mut self, name: &str) -> ObjectResult<Tree> {
        self.0
            .remove(name)
            .ok_or_else(|| ObjectError::MissingField(name.to_string()))
    }

    /// Remove a field, treating absence as `None`.
    pub fn take_opt(&mut self, name: &str) -> Option<Tree> {
        self.0.remove(name)
    }

    pub fn take_str(&mut self, name: &str) -> ObjectResult<String> {
        match self.take(name)? {
            Tree::Str(s) => Ok(s),
            _ => Err(mismatch(name, "string")),
        }
    }

    pub fn take_int(&mut self, name: &str) -> ObjectResult<i64> {
        match self.take(name)? {
            Tree::Int(n) => Ok(n),
            _ => Err(mismatch(name, "int")),
        }
    }

    pub fn take_float(&mut self, name: &str) -> ObjectResult<f64> {
        match self.take(name)? {
            Tree::Float(x) => Ok(x),
            Tree::Int(n) => Ok(n as f64),
            _ => Err(mismatch(name, "float")),
        }
    }

    pub fn take_bool(&mut self, name: &str) -> ObjectResult<bool> {
        match self.take(name)? {
            Tree::Bool(b) => Ok(b),
            _ => Err(mismatch(name, "bool")),
        }
    }

    pub fn take_list(&mut self, name: &str) -> ObjectResult<Vec<Tree>> {
        match self.take(name)? {
            Tree::List(items) => Ok(items),
            _ => Err(mismatch(name, "list")),
        }
    }

    /// Remove a field as a link. A bare object becomes a strong link and
    /// null becomes an empty link.
    pub fn take_link(&mut self, name: &str) -> ObjectResult<Link> {
        match self.take(name)? {
            Tree::Link(link) => Ok(link),
            Tree::Object(object) => Ok(Link::new(object)),
            Tree::Null => Ok(Link::empty()),
            _ => Err(mismatch(name, "link")),
        }
    }

    /// Remove a field holding an already available object.
    ///
    /// On expansion only intrinsic values arrive as objects. References to
    /// shared objects arrive as links that are bound after the owner is
    /// built, so reading one here fails with [`ObjectError::UnboundLink`];
    /// such fields need [`Fields::take_link`].
    pub fn take_object(&mut self, name: &str) -> ObjectResult<Object> {
        match self.take(name)? {
            Tree::Object(object) => Ok(object),
            Tree::Link(link) => match link.get() {
                Some(object) => Ok(object),
                None if link.pending_target().is_some() => {
                    Err(ObjectError::UnboundLink(name.to_string()))
                }
                None => Err(mismatch(name, "object")),
            },
            _ => Err(mismatch(name, "object")),
        }
    }

    /// Weaken the link stored under `name`, if there is one.
    pub fn weaken(&self, name: &str) {
        if let Some(Tree::Link(link)) = self.0.get(name) {
            link.weaken();
        }
    }
}

impl IntoIterator for Fields {
    type Item = (String, Tree);
    type IntoIter = btree_map::IntoIter<String, Tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, Tree)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Tree)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn mismatch(field: &str, expected: &'static str) -> ObjectError {
    ObjectError::FieldType {
        field: field.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::object::Persist;

    #[derive(Debug)]
    struct Point;

    impl Persist for Point {
        fn class(&self) -> &str {
            "Point"
        }
    }

    #[test]
    fn typed_takes() {
        let mut fields = Fields::new()
            .with("name", "alice")
            .with("age", 42i64)
            .with("score", 1.5f64)
            .with("admin", true)
            .with("tags", vec![Tree::from("a"), Tree::from("b")]);

        assert_eq!(fields.take_str("name").unwrap(), "alice");
        assert_eq!(fields.take_int("age").unwrap(), 42);
        assert_eq!(fields.take_float("score").unwrap(), 1.5);
        assert!(fields.take_bool("admin").unwrap());
        assert_eq!(fields.take_list("tags").unwrap().len(), 2);
        assert!(fields.is_empty());
    }

    #[test]
    fn missing_and_mistyped_fields() {
        let mut fields = Fields::new().with("age", "old");
        assert_eq!(
            fields.take_int("age").unwrap_err(),
            ObjectError::FieldType {
                field: "age".into(),
                expected: "int"
            }
        );
        assert_eq!(
            fields.take_str("name").unwrap_err(),
            ObjectError::MissingField("name".into())
        );
    }

    #[test]
    fn take_link_accepts_objects_and_null() {
        let point: Object = Arc::new(Point);
        let mut fields = Fields::new()
            .with("a", point.clone())
            .with("b", Tree::Null)
            .with("c", Link::weak(&point));

        assert!(fields.take_link("a").unwrap().get().is_some());
        assert!(fields.take_link("b").unwrap().is_empty());
        assert!(fields.take_link("c").unwrap().is_weak());
    }

    #[test]
    fn take_object_needs_a_bound_value() {
        let point: Object = Arc::new(Point);
        let mut fields = Fields::new()
            .with("inline", Tree::Object(point.clone()))
            .with("bound", Link::new(point.clone()))
            .with("pending", Link::unresolved("b1".into()))
            .with("empty", Link::empty());

        assert!(Arc::ptr_eq(&fields.take_object("inline").unwrap(), &point));
        assert!(Arc::ptr_eq(&fields.take_object("bound").unwrap(), &point));
        assert_eq!(
            fields.take_object("pending").unwrap_err(),
            ObjectError::UnboundLink("pending".into())
        );
        assert!(matches!(
            fields.take_object("empty"),
            Err(ObjectError::FieldType { .. })
        ));
    }

    #[test]
    fn weaken_marks_named_link() {
        let fields = Fields::new().with("friend", Link::unresolved("b1".into()));
        fields.weaken("friend");
        fields.weaken("missing");
        assert!(matches!(fields.get("friend"), Some(Tree::Link(l)) if l.is_weak()));
    }

    #[test]
    fn from_tree_requires_map() {
        assert!(Fields::from_tree("Point", Tree::Map(BTreeMap::new())).is_ok());
        assert_eq!(
            Fields::from_tree("Point", Tree::Int(1)).unwrap_err(),
            ObjectError::ExpectedFields("Point".into())
        );
    }

    #[test]
    fn option_converts_to_null() {
        assert!(Tree::from(None::<i64>).is_null());
        assert_eq!(Tree::from(Some(3i64)).as_int(), Some(3));
    }

    #[test]
    fn debug_prints_objects_shallowly() {
        let point: Object = Arc::new(Point);
        let debug = format!("{:?}", Tree::Object(point));
        assert!(debug.starts_with("Object(Point@0x"));
    }
}
