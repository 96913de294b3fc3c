//! Pre-order, identity-memoized mapping over shared and cyclic structures.
//!
//! The mapper sees every node before its children, and sees each composite
//! (by identity) at most once per top-level call. The children that get visited
//! are the members of the mapper's *return value*, so a parent can replace or
//! drop its subtree before the traversal ever reaches it.
//!
//! Output is always built fresh: every mapped composite becomes a new node filled
//! with mapped members, and the mapper's return value is only read. Mappers may
//! therefore return the node they were given as-is; the input is never mutated.
use std::convert::Infallible;
use std::vec;

use tracing::{debug, trace};

use crate::identity::IdentityCache;
use crate::value::{Key, Node, Value};

/// The default mapper: returns its argument unchanged.
///
/// Mapping with `identity` yields a structural copy that shares nothing with the
/// input but has the same sharing and cycles.
pub fn identity(value: &Value) -> Value {
    value.clone()
}

/// Map `root` with the [`identity`] mapper.
pub fn deep_copy(root: &Value) -> Value {
    map(root, identity)
}

/// Apply `mapper` to every node reachable from `root`, parent before child,
/// and rebuild the structure from the results.
///
/// Only composites have an identity: `mapper` runs once per distinct composite,
/// but once for every occurrence of a scalar, even when two scalars are equal.
///
/// ```rust
/// use deep_map::Value;
///
/// let shared = Value::array([1, 2, 3]);
/// let root = Value::array([shared.clone(), shared]);
///
/// let mapped = deep_map::map(&root, |node| match node {
///     Value::Int(n) => Value::Int(n + 1),
///     other => other.clone(),
/// });
///
/// let first = mapped.get(0usize).unwrap();
/// let second = mapped.get(1usize).unwrap();
/// assert_eq!(first, Value::array([2, 3, 4]));
/// assert!(Value::same(&first, &second));
/// ```
///
/// # Leaks
///
/// The output of a cyclic input is itself cyclic, and like any cycle of [`Node`]s
/// it is never freed once dropped.
pub fn map(root: &Value, mut mapper: impl FnMut(&Value) -> Value) -> Value {
    match try_map(root, |node| Ok::<_, Infallible>(mapper(node))) {
        Ok(mapped) => mapped,
        Err(never) => match never {},
    }
}

/// Fallible [`map`]. The first error returned by `mapper` aborts the traversal and
/// is returned unchanged; the partially built output is dropped.
pub fn try_map<E>(
    root: &Value,
    mut mapper: impl FnMut(&Value) -> Result<Value, E>,
) -> Result<Value, E> {
    let mut traversal = Traversal {
        mapper: &mut mapper,
        cache: IdentityCache::new(),
        stack: Vec::new(),
        mapper_calls: 0,
        cache_hits: 0,
    };

    let mapped = traversal.visit(root)?;
    traversal.run()?;

    debug!(
        event = "deep_map_done",
        mapper_calls = traversal.mapper_calls,
        cache_hits = traversal.cache_hits,
        composites = traversal.cache.len(),
        "deep map finished"
    );
    Ok(mapped)
}

/// Method forms of [`map`] and [`try_map`].
pub trait DeepMap {
    fn map_deep(&self, mapper: impl FnMut(&Value) -> Value) -> Value;

    fn try_map_deep<E>(&self, mapper: impl FnMut(&Value) -> Result<Value, E>) -> Result<Value, E>;
}

impl DeepMap for Value {
    fn map_deep(&self, mapper: impl FnMut(&Value) -> Value) -> Value {
        map(self, mapper)
    }

    fn try_map_deep<E>(&self, mapper: impl FnMut(&Value) -> Result<Value, E>) -> Result<Value, E> {
        try_map(self, mapper)
    }
}

// An output composite still waiting for some of its members.
struct Fill {
    target: Node,
    pending: vec::IntoIter<(Key, Value)>,
}

struct Traversal<'m, M> {
    mapper: &'m mut M,
    cache: IdentityCache,
    // innermost unfinished composite on top; recursion replaced by this stack
    stack: Vec<Fill>,
    mapper_calls: usize,
    cache_hits: usize,
}

impl<M, E> Traversal<'_, M>
where
    M: FnMut(&Value) -> Result<Value, E>,
{
    /// Resolve one node to its output. A composite result is registered in the
    /// cache and scheduled for filling before any of its members are visited.
    fn visit(&mut self, node: &Value) -> Result<Value, E> {
        if let Value::Composite(source) = node {
            if let Some(mapped) = self.cache.get(source) {
                self.cache_hits += 1;
                trace!(node = %source.id(), "cache hit");
                return Ok(mapped.clone());
            }
        }

        self.mapper_calls += 1;
        let mapped = (self.mapper)(node)?;

        let output = match mapped {
            Value::Composite(shape) => {
                let shape = shape.borrow();
                let target = Node::new(shape.empty_like());
                trace!(
                    node = %target.id(),
                    kind = ?shape.kind(),
                    members = shape.len(),
                    "mapped composite"
                );
                self.stack.push(Fill {
                    target: target.clone(),
                    pending: shape.members().into_iter(),
                });
                Value::Composite(target)
            }
            scalar => scalar,
        };

        if let Value::Composite(source) = node {
            self.cache.insert(source.clone(), output.clone());
        }
        Ok(output)
    }

    /// Fill scheduled composites, always working on the most recently scheduled
    /// one so that mapper calls happen in depth-first pre-order.
    fn run(&mut self) -> Result<(), E> {
        while let Some(mut fill) = self.stack.pop() {
            let Some((key, child)) = fill.pending.next() else {
                continue;
            };
            let target = fill.target.clone();
            self.stack.push(fill);

            let mapped = self.visit(&child)?;
            target.borrow_mut().attach(key, mapped);
        }
        Ok(())
    }
}
