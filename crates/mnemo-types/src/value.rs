//! The data tree carried by an [`Entry`](crate::Entry).
//!
//! A [`Value`] is what an object looks like after collapsing: scalars,
//! ordered sequences, string-keyed mappings, [`Reference`]s to other entries,
//! and [`Inline`] values for intrinsic objects that have no id of their own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::EntryId;

/// Key/value facts extracted from an object for the search collaborator.
pub type Facts = BTreeMap<String, Value>;

/// A node of an entry's data tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Pointer to another entry.
    Ref(Reference),
    /// An intrinsic object collapsed in place.
    Inline(Box<Inline>),
}

/// An intrinsic object collapsed into its parent's data tree.
///
/// Inline values carry their class so they can be expanded again, but never
/// an id: every occurrence is an independent copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(rename = "__CLASS__")]
    pub class: String,
    pub data: Value,
}

/// One step of a [`Reference`] sub-path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    Key(String),
    Index(u64),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, ".{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Typed pointer to another entry's id.
///
/// An empty `path` addresses the target entry itself; a non-empty path
/// addresses an inlined value inside the target entry's data. Weakness is
/// never recorded here: it is decided by the strategy that expands the
/// owning object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: EntryId,
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

impl Reference {
    /// Reference to a whole entry.
    pub fn to(id: EntryId) -> Self {
        Self {
            id,
            path: Vec::new(),
        }
    }

    /// Reference to a value nested inside an entry's data.
    pub fn at(id: EntryId, path: Vec<PathSegment>) -> Self {
        Self { id, path }
    }

    /// Returns `true` if this reference addresses a sub-path of its target.
    pub fn is_path(&self) -> bool {
        !self.path.is_empty()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string payload, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The reference payload, if this is a [`Value::Ref`].
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// All references in this tree, depth-first, including those nested in
    /// inlined values.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Ref(r) => out.push(r),
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(map) => map.values().for_each(|v| v.collect_references(out)),
            Self::Inline(inline) => inline.data.collect_references(out),
            _ => {}
        }
    }

    /// The first NaN or infinity in this tree, if any.
    pub fn non_finite(&self) -> Option<f64> {
        match self {
            Self::Float(x) if !x.is_finite() => Some(*x),
            Self::List(items) => items.iter().find_map(Value::non_finite),
            Self::Map(map) => map.values().find_map(Value::non_finite),
            Self::Inline(inline) => inline.data.non_finite(),
            _ => None,
        }
    }

    /// Walk `path` from this node. Inlined values are entered transparently.
    pub fn at_path(&self, path: &[PathSegment]) -> Option<&Value> {
        let mut current = self;
        for segment in path {
            if let Self::Inline(inline) = current {
                current = &inline.data;
            }
            current = match (current, segment) {
                (Self::Map(map), PathSegment::Key(key)) => map.get(key)?,
                (Self::List(items), PathSegment::Index(index)) => {
                    items.get(usize::try_from(*index).ok()?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}
