//! Live graph → entries.

use std::collections::{HashMap, HashSet, VecDeque};

use mnemo_live::LiveObjectSet;
use mnemo_object::{identity, Container, Object, Tree};
use mnemo_typemap::{Resolution, Resolver};
use mnemo_types::{Entry, EntryId, Facts, Inline, Reference, Value};
use tracing::{debug, warn};

use crate::error::{GraphError, GraphResult};

/// The result of collapsing a graph.
#[derive(Clone, Debug, Default)]
pub struct Collapsed {
    /// One entry per shared object reached, roots first.
    pub entries: Vec<Entry>,
    /// Ids of the objects passed in, in call order.
    pub roots: Vec<EntryId>,
    /// Search facts published by indexed strategies.
    pub facts: Vec<(EntryId, Facts)>,
}

impl Collapsed {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flattens live object graphs into entries.
pub struct Collapser<'a> {
    resolver: &'a Resolver,
    live: &'a LiveObjectSet,
}

#[derive(Default)]
struct Walk {
    /// Object address → assigned id.
    visited: HashMap<usize, EntryId>,
    queue: VecDeque<(EntryId, Object, Resolution)>,
    roots: HashSet<EntryId>,
}

impl<'a> Collapser<'a> {
    pub fn new(resolver: &'a Resolver, live: &'a LiveObjectSet) -> Self {
        Self { resolver, live }
    }

    /// Collapse the graphs reachable from `roots`.
    pub fn collapse(&self, roots: &[Object]) -> GraphResult<Collapsed> {
        self.run(roots.iter().map(|object| (None, object.clone())).collect())
    }

    /// Collapse with caller-chosen ids for the roots.
    pub fn collapse_with_ids(&self, roots: &[(EntryId, Object)]) -> GraphResult<Collapsed> {
        self.run(
            roots
                .iter()
                .map(|(id, object)| (Some(id.clone()), object.clone()))
                .collect(),
        )
    }

    fn run(&self, roots: Vec<(Option<EntryId>, Object)>) -> GraphResult<Collapsed> {
        self.live.ensure_scope()?;

        let mut walk = Walk::default();
        let mut out = Collapsed::default();
        for (explicit, object) in roots {
            let id = self.assign(explicit, &object, &mut walk)?;
            walk.roots.insert(id.clone());
            out.roots.push(id);
        }

        let mut registrations = Vec::new();
        while let Some((id, object, resolution)) = walk.queue.pop_front() {
            let tree = resolution
                .strategy
                .collapse(&object)
                .map_err(|e| GraphError::strategy(&resolution.class, e))?;

            // An intrinsic root is still its own entry, but it must not
            // contain itself inline.
            let mut inline_stack = Vec::new();
            if resolution.intrinsic {
                inline_stack.push(identity(&object));
            }
            let data = self.flatten(&id, tree, &mut walk, &mut inline_stack)?;

            let class = (resolution.class != Container::CLASS).then(|| resolution.class.clone());
            let mut entry = Entry::new(id.clone(), class, data).with_root(walk.roots.contains(&id));
            entry.prev = self.live.revision(&id);

            if let Some(facts) = resolution.strategy.facts(&object) {
                out.facts.push((id.clone(), facts));
            }
            registrations.push((id, object, Some(entry.digest()?)));
            out.entries.push(entry);
        }

        self.live.register_all(&registrations)?;
        debug!(
            entries = out.entries.len(),
            roots = out.roots.len(),
            "collapsed graph"
        );
        Ok(out)
    }

    /// The id `object` is stored under, queueing it on first sight.
    fn assign(
        &self,
        explicit: Option<EntryId>,
        object: &Object,
        walk: &mut Walk,
    ) -> GraphResult<EntryId> {
        let addr = identity(object);
        if let Some(existing) = walk.visited.get(&addr) {
            return match explicit {
                Some(requested) if &requested != existing => Err(GraphError::IdConflict {
                    requested,
                    existing: existing.clone(),
                }),
                _ => Ok(existing.clone()),
            };
        }

        let resolution = self.resolver.resolve(object.class())?;
        let bound = self.live.id_of(object);
        let id = match (explicit, bound) {
            (Some(requested), Some(existing)) if requested != existing => {
                return Err(GraphError::IdConflict {
                    requested,
                    existing,
                });
            }
            (Some(requested), _) => requested,
            (None, Some(existing)) => existing,
            (None, None) => EntryId::generate(),
        };
        walk.visited.insert(addr, id.clone());
        walk.queue.push_back((id.clone(), object.clone(), resolution));
        Ok(id)
    }

    fn flatten(
        &self,
        owner: &EntryId,
        tree: Tree,
        walk: &mut Walk,
        inline_stack: &mut Vec<usize>,
    ) -> GraphResult<Value> {
        Ok(match tree {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(b),
            Tree::Int(n) => Value::Int(n),
            Tree::Float(x) if !x.is_finite() => {
                return Err(GraphError::NonFiniteFloat {
                    owner: owner.clone(),
                    value: x,
                })
            }
            Tree::Float(x) => Value::Float(x),
            Tree::Str(s) => Value::Str(s),
            Tree::Bytes(b) => Value::Bytes(b),
            Tree::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| self.flatten(owner, item, walk, inline_stack))
                    .collect::<GraphResult<_>>()?,
            ),
            Tree::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(key, item)| {
                        self.flatten(owner, item, walk, inline_stack)
                            .map(|value| (key, value))
                    })
                    .collect::<GraphResult<_>>()?,
            ),
            Tree::Object(object) => self.nested(owner, &object, walk, inline_stack)?,
            Tree::Link(link) => match link.get() {
                Some(object) => self.nested(owner, &object, walk, inline_stack)?,
                None => match link.pending_target() {
                    // Never bound: keep pointing where it pointed.
                    Some(target) => Value::Ref(Reference::to(target)),
                    None => {
                        if link.is_weak() {
                            warn!(owner = %owner, "skipped dead weak link");
                        }
                        Value::Null
                    }
                },
            },
        })
    }

    fn nested(
        &self,
        owner: &EntryId,
        object: &Object,
        walk: &mut Walk,
        inline_stack: &mut Vec<usize>,
    ) -> GraphResult<Value> {
        let addr = identity(object);
        if walk.visited.contains_key(&addr) {
            return Ok(Value::Ref(Reference::to(self.assign(None, object, walk)?)));
        }

        let resolution = self.resolver.resolve(object.class())?;
        if !resolution.intrinsic {
            return Ok(Value::Ref(Reference::to(self.assign(None, object, walk)?)));
        }

        if inline_stack.contains(&addr) {
            return Err(GraphError::UnbreakableCycle(resolution.class));
        }
        let tree = resolution
            .strategy
            .collapse(object)
            .map_err(|e| GraphError::strategy(&resolution.class, e))?;
        inline_stack.push(addr);
        let data = self.flatten(owner, tree, walk, inline_stack);
        inline_stack.pop();
        Ok(Value::Inline(Box::new(Inline {
            class: resolution.class,
            data: data?,
        })))
    }
}
