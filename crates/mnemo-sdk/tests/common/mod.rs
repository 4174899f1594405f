//! Classes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mnemo_sdk::{
    downcast_ref, Callbacks, Facts, Fields, Link, Object, ObjectError, ObjectResult, Persist,
    Persistable, Tree, Value,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Peer: one Rust type for classes "A" and "B"
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Peer {
    pub class: String,
    pub name: String,
    pub partner: Link,
}

impl Peer {
    pub fn new(class: &str, name: &str, partner: Link) -> Arc<Self> {
        Arc::new(Self {
            class: class.to_string(),
            name: name.to_string(),
            partner,
        })
    }
}

impl Persist for Peer {
    fn class(&self) -> &str {
        &self.class
    }
}

impl Persistable for Peer {
    fn collapse(&self) -> Fields {
        Fields::new()
            .with("name", self.name.as_str())
            .with("partner", self.partner.clone())
    }

    fn expand(class: &str, mut fields: Fields) -> ObjectResult<Self> {
        Ok(Self {
            class: class.to_string(),
            name: fields.take_str("name")?,
            partner: fields.take_link("partner")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Shape family
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Shape {
    pub class: String,
    pub size: i64,
}

pub fn shape(class: &str, size: i64) -> Object {
    Arc::new(Shape {
        class: class.to_string(),
        size,
    })
}

impl Persist for Shape {
    fn class(&self) -> &str {
        &self.class
    }
}

impl Persistable for Shape {
    fn collapse(&self) -> Fields {
        Fields::new().with("size", self.size)
    }

    fn expand(class: &str, mut fields: Fields) -> ObjectResult<Self> {
        Ok(Self {
            class: class.to_string(),
            size: fields.take_int("size")?,
        })
    }
}

pub fn shape_facts(shape: &Shape) -> Facts {
    let mut facts = Facts::new();
    facts.insert("class".into(), Value::from(shape.class.as_str()));
    facts.insert("size".into(), Value::from(shape.size));
    facts
}

/// Squares store their size as `side`.
pub fn square_strategy() -> Callbacks {
    Callbacks::new(
        |object| {
            let square = downcast_ref::<Shape>(object).ok_or_else(|| ObjectError::UnexpectedType {
                expected: "Shape",
                found: object.class().to_string(),
            })?;
            Ok(Fields::new().with("side", square.size).into())
        },
        |class, tree| {
            let mut fields = Fields::from_tree(class, tree)?;
            let square: Object = Arc::new(Shape {
                class: class.to_string(),
                size: fields.take_int("side")?,
            });
            Ok(square)
        },
    )
}

// ---------------------------------------------------------------------------
// Owner / Point
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Owner {
    pub name: String,
    pub item: Link,
}

pub fn owner(name: &str, item: Link) -> Object {
    Arc::new(Owner {
        name: name.to_string(),
        item,
    })
}

impl Persist for Owner {
    fn class(&self) -> &str {
        "Owner"
    }
}

impl Persistable for Owner {
    fn collapse(&self) -> Fields {
        Fields::new()
            .with("name", self.name.as_str())
            .with("item", self.item.clone())
    }

    fn expand(_class: &str, mut fields: Fields) -> ObjectResult<Self> {
        Ok(Self {
            name: fields.take_str("name")?,
            item: fields.take_link("item")?,
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Persist for Point {
    fn class(&self) -> &str {
        "Point"
    }
}

impl Persistable for Point {
    fn collapse(&self) -> Fields {
        Fields::new().with("x", self.x).with("y", self.y)
    }

    fn expand(_class: &str, mut fields: Fields) -> ObjectResult<Self> {
        Ok(Self {
            x: fields.take_int("x")?,
            y: fields.take_int("y")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Node: a vertex with any number of outgoing edges
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Node {
    pub label: i64,
    pub edges: Vec<Link>,
}

impl Persist for Node {
    fn class(&self) -> &str {
        "Node"
    }
}

impl Persistable for Node {
    fn collapse(&self) -> Fields {
        let edges: Vec<Tree> = self.edges.iter().cloned().map(Tree::Link).collect();
        Fields::new().with("label", self.label).with("edges", edges)
    }

    fn expand(_class: &str, mut fields: Fields) -> ObjectResult<Self> {
        let edges = fields
            .take_list("edges")?
            .into_iter()
            .map(|edge| match edge {
                Tree::Link(link) => Ok(link),
                Tree::Object(object) => Ok(Link::new(object)),
                _ => Err(ObjectError::FieldType {
                    field: "edges".into(),
                    expected: "link",
                }),
            })
            .collect::<ObjectResult<Vec<Link>>>()?;
        Ok(Self {
            label: fields.take_int("label")?,
            edges,
        })
    }
}
