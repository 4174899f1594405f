//! Random graphs survive a store/load round trip with their identity
//! structure intact.

mod common;

use std::sync::Arc;

use common::Node;
use mnemo_sdk::{
    downcast, same_object, Backend, CodecKind, Container, Engine, GraphError, InMemoryBackend,
    Link, Native, Object, SdkError, Tree, TypeMap, Value,
};
use proptest::prelude::*;

/// A graph as node count plus edges `from -> to`, cycles and self loops
/// included.
fn graphs() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..(n * 3))))
}

fn build(n: usize, edges: &[(usize, usize)]) -> Vec<Object> {
    let mut outgoing = vec![Vec::new(); n];
    for &(from, to) in edges {
        outgoing[from].push(to);
    }
    let nodes: Vec<Arc<Node>> = outgoing
        .iter()
        .enumerate()
        .map(|(label, targets)| {
            Arc::new(Node {
                label: label as i64,
                edges: targets.iter().map(|_| Link::empty()).collect(),
            })
        })
        .collect();
    for (node, targets) in nodes.iter().zip(&outgoing) {
        for (link, &to) in node.edges.iter().zip(targets) {
            link.set(nodes[to].clone());
        }
    }
    nodes.into_iter().map(|node| node as Object).collect()
}

/// Break the strong cycles so the test does not leak.
fn unlink(objects: &[Object]) {
    for object in objects {
        if let Some(node) = downcast::<Node>(object) {
            node.edges.iter().for_each(Link::clear);
        }
    }
}

fn types() -> TypeMap {
    TypeMap::new().exact("Node", Native::<Node>::new())
}

fn round_trip(n: usize, edges: &[(usize, usize)], codec: CodecKind) -> Result<(), TestCaseError> {
    let backend = Arc::new(InMemoryBackend::with_codec_kind(codec));
    let writer = Engine::builder(types()).backend(backend.clone()).build();
    // A second engine has its own live set, so every node is expanded.
    let reader = Engine::builder(types()).backend(backend.clone()).build();

    let original = build(n, edges);
    let ids = {
        let _scope = writer.new_scope();
        writer.store_all(&original).unwrap()
    };
    prop_assert_eq!(backend.len(), n);

    let _scope = reader.new_scope();
    let loaded = reader.lookup_many(&ids).unwrap();
    prop_assert_eq!(loaded.len(), n);

    for (i, object) in loaded.iter().enumerate() {
        prop_assert!(!same_object(object, &original[i]));
        let node = downcast::<Node>(object).unwrap();
        let source = downcast::<Node>(&original[i]).unwrap();
        prop_assert_eq!(node.label, source.label);
        prop_assert_eq!(node.edges.len(), source.edges.len());

        for (edge, expected) in node.edges.iter().zip(&source.edges) {
            let target = edge.get().unwrap();
            let expected = expected.get().unwrap();
            let index = original.iter().position(|o| same_object(o, &expected)).unwrap();
            prop_assert!(same_object(&target, &loaded[index]));
        }
    }

    unlink(&original);
    unlink(&loaded);
    Ok(())
}

#[test]
fn non_finite_floats_are_refused_under_both_codecs() {
    for codec in [CodecKind::Json, CodecKind::Bincode] {
        let backend = Arc::new(InMemoryBackend::with_codec_kind(codec));
        let engine = Engine::builder(types()).backend(backend.clone()).build();
        let _scope = engine.new_scope();

        let reading = Container::shared(Tree::Float(1.5));
        let id = engine.store(&reading).unwrap();
        for x in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            downcast::<Container>(&reading).unwrap().set(Tree::Float(x));
            let err = engine.store(&reading).unwrap_err();
            assert!(matches!(err, SdkError::Graph(GraphError::NonFiniteFloat { .. })));
        }
        assert!(engine.store(&Container::shared(Tree::Float(f64::NAN))).is_err());

        assert_eq!(backend.len(), 1);
        let stored = engine.backend().get(&id).unwrap().unwrap();
        assert_eq!(stored.data, Value::Float(1.5));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn json_round_trip_preserves_identity((n, edges) in graphs()) {
        round_trip(n, &edges, CodecKind::Json)?;
    }

    #[test]
    fn bincode_round_trip_preserves_identity((n, edges) in graphs()) {
        round_trip(n, &edges, CodecKind::Bincode)?;
    }
}
