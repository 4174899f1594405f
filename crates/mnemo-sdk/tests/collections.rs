//! Search, deferred sets and garbage collection through the engine.

mod common;

use std::thread;

use common::{init_tracing, owner, shape, shape_facts, Owner, Shape};
use mnemo_sdk::{
    downcast, Container, Engine, EntryId, Hierarchy, Holding, Link, Native, Object, Query, Tree,
    TypeMap,
};

fn engine() -> Engine {
    Engine::builder(
        TypeMap::new()
            .isa("Shape", Native::<Shape>::new().indexed(shape_facts))
            .exact("Owner", Native::<Owner>::new()),
    )
    .hierarchy(
        Hierarchy::new()
            .with("Circle", ["Shape"])
            .with("Square", ["Shape"]),
    )
    .build()
}

fn sizes(objects: &[Object]) -> Vec<i64> {
    let mut sizes: Vec<i64> = objects
        .iter()
        .map(|o| downcast::<Shape>(o).unwrap().size)
        .collect();
    sizes.sort_unstable();
    sizes
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[test]
fn search_conjunction_is_deferred() {
    init_tracing();
    let engine = engine();
    let ids = {
        let _scope = engine.new_scope();
        engine
            .store_all(&[
                shape("Circle", 1),
                shape("Circle", 2),
                shape("Square", 2),
            ])
            .unwrap()
    };

    let _scope = engine.new_scope();
    let mut circles = engine.search(&Query::all().eq("class", "Circle")).unwrap();
    assert_eq!(circles.len(), 2);
    assert_eq!(circles.loaded_count(), 0);

    let mut both = engine
        .search(&Query::all().eq("class", "Circle").eq("size", 2_i64))
        .unwrap();
    assert_eq!(both.ids(), vec![ids[1].clone()]);
    assert!(!engine.live().is_live(&ids[1]));

    assert_eq!(sizes(&both.to_vec().unwrap()), vec![2]);
    assert!(engine.live().is_live(&ids[1]));
    assert_eq!(sizes(&circles.to_vec().unwrap()), vec![1, 2]);
}

#[test]
fn deleted_entries_leave_the_index() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();
    let id = engine.store(&shape("Square", 9)).unwrap();

    engine.delete(&[id]).unwrap();
    assert!(engine
        .search(&Query::all().eq("size", 9_i64))
        .unwrap()
        .is_empty());
}

#[test]
fn members_load_one_at_a_time() {
    init_tracing();
    let engine = engine();
    let ids = {
        let _scope = engine.new_scope();
        engine
            .store_all(&[shape("Circle", 1), shape("Circle", 2), shape("Circle", 3)])
            .unwrap()
    };

    let _scope = engine.new_scope();
    let mut set = engine.deferred(ids.clone());
    let first = set.members().next().unwrap().unwrap();
    assert!(downcast::<Shape>(&first).is_some());
    assert_eq!(set.loaded_count(), 1);
    assert_eq!(set.members().filter(Result::is_ok).count(), 3);
    assert_eq!(set.loaded_count(), 3);
}

// ---------------------------------------------------------------------------
// Set algebra across sources
// ---------------------------------------------------------------------------

#[test]
fn transient_and_stored_sets_combine_by_id() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();

    let small = shape("Circle", 1);
    let large = shape("Circle", 10);
    engine.store_all(&[small.clone(), large.clone()]).unwrap();
    let unsaved = shape("Square", 5);

    let picked = engine.transient([small.clone(), unsaved.clone()], Holding::Strong);
    let stored = engine.all_objects().unwrap();

    let both = picked.intersect(&stored);
    assert_eq!(both.len(), 1);
    assert!(both.contains(&small));
    assert!(!both.contains(&unsaved));

    let either = picked.union(&stored);
    assert_eq!(either.len(), 3);
    let only_stored = stored.difference(&picked);
    assert_eq!(only_stored.len(), 1);
    assert!(only_stored.contains(&large));
}

#[test]
fn weakly_held_transient_members_can_die() {
    init_tracing();
    let engine = engine();
    let mut set = {
        let object = shape("Circle", 4);
        engine.transient([object], Holding::Weak)
    };
    assert_eq!(set.len(), 1);
    assert!(set.to_vec().is_err());
}

// ---------------------------------------------------------------------------
// Roots and garbage collection
// ---------------------------------------------------------------------------

#[test]
fn root_set_lists_only_roots() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();
    let child = Container::shared(Tree::from("leaf"));
    let root = engine.store(&owner("root", Link::new(child))).unwrap();

    assert_eq!(engine.root_set().unwrap().ids(), vec![root]);
    assert_eq!(engine.all_objects().unwrap().len(), 2);
}

#[test]
fn gc_keeps_reachable_and_drops_the_rest() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();

    let child = Container::shared(Tree::from("leaf"));
    let parent = engine.store(&owner("parent", Link::new(child.clone()))).unwrap();
    let child_id = engine.object_to_id(&child).unwrap();
    let orphan = engine.store(&shape("Circle", 1)).unwrap();
    engine.unset_root(&orphan).unwrap();

    let report = engine.collect_garbage().unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.reachable, 2);
    assert_eq!(report.removed, vec![orphan.clone()]);
    assert!(engine.search(&Query::all().eq("size", 1_i64)).unwrap().is_empty());

    engine.unset_root(&parent).unwrap();
    let report = engine.collect_garbage().unwrap();
    assert_eq!(report.removed.len(), 2);
    assert!(!engine.exists(&child_id).unwrap());
    assert!(engine.all_objects().unwrap().is_empty());
    assert_eq!(engine.object_to_id(&child), None);
}

#[test]
fn gc_with_nothing_to_do_removes_nothing() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();
    engine.store(&shape("Square", 3)).unwrap();

    let report = engine.collect_garbage().unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(report.reachable, 1);
}

#[test]
fn roots_set_during_collection_survive() {
    init_tracing();
    let engine = engine();
    let _scope = engine.new_scope();
    let ids: Vec<EntryId> = (0..40_i64)
        .map(|size| {
            let id = engine.store(&shape("Circle", size)).unwrap();
            engine.unset_root(&id).unwrap();
            id
        })
        .collect();

    let rooted: Vec<EntryId> = thread::scope(|s| {
        let marker = s.spawn(|| {
            ids.iter()
                .filter(|id| matches!(engine.set_root(id), Ok(true)))
                .cloned()
                .collect()
        });
        while !marker.is_finished() {
            engine.collect_garbage().unwrap();
        }
        marker.join().unwrap()
    });

    for id in &rooted {
        assert!(engine.exists(id).unwrap(), "{id} was marked root but swept");
    }
}
