use rustc_hash::FxHashMap;

use crate::value::{Node, NodeId, Value};

/// Memo of already-mapped composites, keyed by the identity of the source node.
///
/// Each entry keeps its source node alive, so an address can't be freed and
/// handed to a new node while the cache still answers for it.
#[derive(Default)]
pub(crate) struct IdentityCache {
    entries: FxHashMap<NodeId, Entry>,
}

struct Entry {
    _source: Node,
    mapped: Value,
}

impl IdentityCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, source: &Node) -> Option<&Value> {
        self.entries.get(&source.id()).map(|entry| &entry.mapped)
    }

    /// Entries are write-once: inserting a source twice is a traversal bug.
    pub(crate) fn insert(&mut self, source: Node, mapped: Value) {
        let previous = self.entries.insert(
            source.id(),
            Entry {
                _source: source,
                mapped,
            },
        );
        debug_assert!(previous.is_none(), "identity cache entry overwritten");
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_by_identity_not_structure() {
        let a = Node::new_array();
        let b = Node::new_array();
        let mut cache = IdentityCache::new();

        cache.insert(a.clone(), Value::Int(1));

        assert_eq!(cache.get(&a), Some(&Value::Int(1)));
        assert_eq!(cache.get(&a.clone()), Some(&Value::Int(1)));
        assert_eq!(cache.get(&b), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keeps_sources_alive() {
        let mut cache = IdentityCache::new();
        let id = {
            let transient = Node::new_object();
            let id = transient.id();
            cache.insert(transient, Value::Null);
            id
        };

        // a new allocation can't land on an address the cache still holds
        let fresh: Vec<Node> = (0..64).map(|_| Node::new_object()).collect();
        assert!(fresh.iter().all(|node| node.id() != id));
        assert_eq!(cache.len(), 1);
    }
}
