//! Recursive reference implementation: the algorithm written the obvious way,
//! with the call stack doing the bookkeeping. Overflows on deep input.
use deep_map::{Key, Kind, Node, NodeId, Value};
use rustc_hash::FxHashMap;

pub fn naive_map(root: &Value, mut mapper: impl FnMut(&Value) -> Value) -> Value {
    let mut cache = FxHashMap::default();
    naive_map_inner(root, &mut mapper, &mut cache)
}

fn naive_map_inner(
    node: &Value,
    mapper: &mut impl FnMut(&Value) -> Value,
    // source node kept alongside so its address stays reserved
    cache: &mut FxHashMap<NodeId, (Node, Value)>,
) -> Value {
    if let Value::Composite(source) = node {
        if let Some((_, mapped)) = cache.get(&source.id()) {
            return mapped.clone();
        }
    }

    let mapped = mapper(node);
    let shape = match mapped {
        Value::Composite(shape) => shape,
        scalar => {
            if let Value::Composite(source) = node {
                cache.insert(source.id(), (source.clone(), scalar.clone()));
            }
            return scalar;
        }
    };

    let target = match shape.kind() {
        Kind::Array => Node::new_array(),
        _ => Node::new_object(),
    };
    if let Value::Composite(source) = node {
        cache.insert(source.id(), (source.clone(), Value::from(target.clone())));
    }

    let members = shape.borrow().members();
    for (key, child) in members {
        let child = naive_map_inner(&child, mapper, cache);
        match key {
            Key::Index(_) => target.push(child),
            Key::Name(name) => {
                target.insert(name, child);
            }
        }
    }
    Value::from(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::increment;

    #[test]
    fn naive_closes_cycles() {
        let node = Node::new_array();
        node.push(node.clone());
        node.push(1);

        let output = naive_map(&Value::from(node), increment);

        assert!(Value::same(&output.get(0usize).unwrap(), &output));
        assert_eq!(output.get(1usize), Some(Value::Int(2)));
    }
}
