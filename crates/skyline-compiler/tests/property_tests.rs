//! Property tests for dependency ordering and the value cache

use proptest::prelude::*;
use skyline_compiler::{CompilerError, DependencyCollection, ValueCache};
use std::collections::{HashMap, HashSet};

/// Random acyclic graph: node `i` may only depend on nodes with a lower index,
/// registered in a shuffled order
fn acyclic_graph() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
    (1usize..12)
        .prop_flat_map(|n| {
            let deps = (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
                .collect::<Vec<_>>();
            (deps, Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        })
        .prop_map(|(deps, order)| {
            order
                .into_iter()
                .map(|i| {
                    let own: Vec<usize> = deps[i].iter().copied().filter(|&d| d < i).collect();
                    (i, own)
                })
                .collect()
        })
}

fn build(graph: &[(usize, Vec<usize>)]) -> DependencyCollection<usize> {
    let mut collection = DependencyCollection::new();
    for (id, deps) in graph {
        collection
            .add(format!("n{}", id), *id, deps.iter().map(|d| format!("n{}", d)))
            .unwrap();
    }
    collection
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: every node comes after all of its dependencies, exactly once
    #[test]
    fn property_dependencies_precede_dependents(graph in acyclic_graph()) {
        let collection = build(&graph);
        let order = collection.ordered_ids().unwrap();

        prop_assert_eq!(order.len(), graph.len());
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        for (id, deps) in &graph {
            let own = position[format!("n{}", id).as_str()];
            for dep in deps {
                let before = position[format!("n{}", dep).as_str()] < own;
                prop_assert!(before, "dependency n{} not ordered before n{}", dep, id);
            }
        }
    }

    /// PROPERTY: the order is identical across calls and across equal collections
    #[test]
    fn property_order_is_stable(graph in acyclic_graph()) {
        let first = build(&graph);
        let second = build(&graph);

        let a: Vec<String> = first.ordered_ids().unwrap().iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = first.ordered_ids().unwrap().iter().map(|s| s.to_string()).collect();
        let c: Vec<String> = second.ordered_ids().unwrap().iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&a, &c);
    }

    /// PROPERTY: closing any chain into a ring fails with a circular dependency
    #[test]
    fn property_rings_are_rejected(len in 2usize..8, extra in 0usize..4) {
        let mut collection = DependencyCollection::new();
        for i in 0..extra {
            collection.add(format!("free{}", i), (), Vec::<String>::new()).unwrap();
        }
        for i in 0..len {
            collection.add(format!("r{}", i), (), [format!("r{}", (i + 1) % len)]).unwrap();
        }

        let rejected = matches!(collection.ordered_ids(), Err(CompilerError::CircularDependency { .. }));
        prop_assert!(rejected, "ring of {} nodes was not rejected", len);
    }

    /// PROPERTY: last write wins and count tracks distinct (domain, name) keys
    #[test]
    fn property_value_cache_counts_distinct_keys(
        writes in proptest::collection::vec(("[a-c]", "[xyz]{0,1}", any::<i64>()), 0..40)
    ) {
        let mut cache = ValueCache::new();
        let mut expected: HashMap<(String, String), i64> = HashMap::new();
        for (name, domain, value) in &writes {
            cache.post_value(*value, name, domain);
            expected.insert((domain.clone(), name.clone()), *value);
        }

        prop_assert_eq!(cache.count(), expected.len());
        for ((domain, name), value) in &expected {
            let value = serde_json::json!(value);
            prop_assert_eq!(cache.fetch_value(name, domain), Some(&value));
        }

        let labels: HashSet<String> = cache.fetch_all().into_iter().map(|(label, _)| label).collect();
        for (domain, name) in expected.keys() {
            let label = format!("{}.{}", domain, name);
            prop_assert!(labels.contains(&label), "missing label {}", label);
        }
    }
}
