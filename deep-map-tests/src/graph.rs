//! Generators for shared and cyclic values, and helpers for comparing their topology.
use std::ops::Range;

use deep_map::{Key, Kind, Node, Value};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub enum Slot {
    Int(i64),
    Text(String),
    /// index of another node in the blueprint
    Ref(usize),
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub is_array: bool,
    pub members: Vec<Slot>,
}

/// A flat description of a graph of composites. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub nodes: Vec<NodeSpec>,
}

impl Blueprint {
    /// Allocate every node first and wire members second, so any node can refer to any other.
    pub fn build(&self) -> Value {
        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .map(|spec| {
                if spec.is_array {
                    Node::new_array()
                } else {
                    Node::new_object()
                }
            })
            .collect();

        for (spec, node) in self.nodes.iter().zip(&nodes) {
            for (idx, slot) in spec.members.iter().enumerate() {
                let member = match slot {
                    Slot::Int(n) => Value::Int(*n),
                    Slot::Text(s) => Value::from(s.as_str()),
                    Slot::Ref(target) => Value::from(nodes[*target].clone()),
                };
                if spec.is_array {
                    node.push(member);
                } else {
                    node.insert(format!("k{idx}"), member);
                }
            }
        }

        Value::from(nodes[0].clone())
    }
}

fn arb_slot(refs: Range<usize>) -> BoxedStrategy<Slot> {
    let scalar = prop_oneof![
        any::<i32>().prop_map(|n| Slot::Int(n.into())),
        "[a-z]{0,3}".prop_map(Slot::Text),
    ];
    if refs.is_empty() {
        scalar.boxed()
    } else {
        prop_oneof![1 => scalar, 2 => refs.prop_map(Slot::Ref)].boxed()
    }
}

fn arb_node(refs: Range<usize>) -> impl Strategy<Value = NodeSpec> {
    (any::<bool>(), prop::collection::vec(arb_slot(refs), 0..5))
        .prop_map(|(is_array, members)| NodeSpec { is_array, members })
}

/// Graphs where any node may refer to any node: sharing, diamonds, self-loops and longer cycles.
pub fn arb_graph() -> impl Strategy<Value = Blueprint> {
    (1..10usize).prop_flat_map(|count| {
        prop::collection::vec(arb_node(0..count), count).prop_map(|nodes| Blueprint { nodes })
    })
}

/// Acyclic graphs: node `i` only refers to nodes after it. Sharing is still possible.
pub fn arb_dag() -> impl Strategy<Value = Blueprint> {
    (1..10usize).prop_flat_map(|count| {
        (0..count)
            .map(|idx| arb_node(idx + 1..count))
            .collect::<Vec<_>>()
            .prop_map(|nodes| Blueprint { nodes })
    })
}

/// Distinct composites reachable from `root`, in depth-first pre-order of first visit.
pub fn composites(root: &Value) -> Vec<Node> {
    let mut seen = FxHashMap::default();
    let mut order = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(value) = stack.pop() {
        let Value::Composite(node) = value else {
            continue;
        };
        if seen.insert(node.id(), ()).is_some() {
            continue;
        }
        let members = node.borrow().members();
        stack.extend(members.into_iter().rev().map(|(_, member)| member));
        order.push(node);
    }
    order
}

/// One step of a depth-first pre-order walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// first visit of a composite, numbered in visit order
    Open { key: Option<Key>, kind: Kind, len: usize },
    /// a composite already opened earlier in the walk
    Back { key: Option<Key>, number: usize },
    Leaf { key: Option<Key>, kind: Kind },
}

/// The topology of `root`: two values with equal shapes have the same kinds,
/// keys and lengths everywhere, and share (or loop back to) nodes at the same places.
pub fn shape(root: &Value) -> Vec<Step> {
    let mut numbers = FxHashMap::default();
    let mut steps = Vec::new();
    let mut stack: Vec<(Option<Key>, Value)> = vec![(None, root.clone())];

    while let Some((key, value)) = stack.pop() {
        let node = match value {
            Value::Composite(node) => node,
            leaf => {
                steps.push(Step::Leaf {
                    key,
                    kind: leaf.kind(),
                });
                continue;
            }
        };
        if let Some(number) = numbers.get(&node.id()) {
            steps.push(Step::Back {
                key,
                number: *number,
            });
            continue;
        }

        numbers.insert(node.id(), numbers.len());
        let composite = node.borrow();
        steps.push(Step::Open {
            key,
            kind: composite.kind(),
            len: composite.len(),
        });
        stack.extend(
            composite
                .members()
                .into_iter()
                .rev()
                .map(|(key, member)| (Some(key), member)),
        );
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::increment;
    use crate::naive::naive_map;
    use proptest::proptest;
    use rustc_hash::FxHashSet;

    #[test]
    fn shape_distinguishes_sharing_from_copies() {
        let shared = Value::array([1]);
        let with_sharing = Value::array([shared.clone(), shared]);
        let with_copies = Value::array([Value::array([1]), Value::array([1])]);

        assert_eq!(with_sharing, with_copies);
        assert_ne!(shape(&with_sharing), shape(&with_copies));
    }

    #[test]
    fn composites_are_listed_once() {
        let node = Node::new_array();
        node.push(node.clone());
        node.push(Value::array([node.clone()]));

        assert_eq!(composites(&Value::from(node)).len(), 2);
    }

    proptest! {
        #[test]
        fn deep_copy_preserves_topology(blueprint in arb_graph()) {
            let input = blueprint.build();

            let output = deep_map::deep_copy(&input);

            prop_assert_eq!(shape(&output), shape(&input));
            prop_assert_eq!(&output, &input);
            let kinds_consistent = shape(&output).iter().all(|step| match step {
                Step::Open { kind, .. } => kind.is_composite(),
                Step::Leaf { kind, .. } => !kind.is_composite(),
                Step::Back { .. } => true,
            });
            prop_assert!(kinds_consistent);

            let input_ids: FxHashSet<_> = composites(&input).iter().map(Node::id).collect();
            prop_assert!(composites(&output).iter().all(|node| !input_ids.contains(&node.id())));
        }

        #[test]
        fn mapper_sees_each_composite_once(blueprint in arb_graph()) {
            let input = blueprint.build();
            let mut seen = Vec::new();

            deep_map::map(&input, |node| {
                if let Value::Composite(node) = node {
                    seen.push(node.id());
                }
                node.clone()
            });

            let expected: Vec<_> = composites(&input).iter().map(Node::id).collect();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn matches_naive_recursion(blueprint in arb_graph()) {
            let input = blueprint.build();
            let mut stack_calls = Vec::new();
            let mut naive_calls = Vec::new();

            let from_stack = deep_map::map(&input, |node| {
                stack_calls.push(node.clone());
                increment(node)
            });
            let from_naive = naive_map(&input, |node| {
                naive_calls.push(node.clone());
                increment(node)
            });

            prop_assert_eq!(shape(&from_stack), shape(&from_naive));
            prop_assert_eq!(&from_stack, &from_naive);
            prop_assert_eq!(stack_calls.len(), naive_calls.len());
            prop_assert!(stack_calls.iter().zip(&naive_calls).all(|(a, b)| Value::same(a, b)));
        }

        #[test]
        fn increment_keeps_topology(blueprint in arb_graph()) {
            let input = blueprint.build();

            let output = deep_map::map(&input, increment);

            prop_assert_eq!(shape(&output), shape(&input));
            prop_assert_eq!(output.has_cycle(), input.has_cycle());
        }

        #[test]
        fn dags_stay_acyclic(blueprint in arb_dag()) {
            let input = blueprint.build();
            prop_assert!(!input.has_cycle());

            let output = deep_map::deep_copy(&input);

            prop_assert!(!output.has_cycle());
            prop_assert!(output.to_json().is_ok());
        }

        #[test]
        fn replacing_the_root_skips_the_input(blueprint in arb_graph()) {
            let input = blueprint.build();
            let mut calls = 0;

            let output = deep_map::map(&input, |node| {
                calls += 1;
                if Value::same(node, &input) {
                    Value::array([0])
                } else {
                    node.clone()
                }
            });

            prop_assert_eq!(calls, 2);
            prop_assert_eq!(output, Value::array([0]));
        }
    }
}
