use std::collections::HashMap;

use serde::Serialize;

use crate::file_format::event::EventLabel;

/// Wrapped u32 identifier for graph nodes for type safety.  These are what
/// end up as node names in the DOT output, which keeps arbitrary URIs out of
/// identifier position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GraphNodeId(u32);

impl GraphNodeId {
    pub fn get(self) -> u32 {
        self.0
    }
}

/// The scope in which a label names a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeNamespace {
    /// One node per label for the whole run.  Used by the unified graph.
    Global,
    /// One node per event occurrence within a retained story: `ordinal`
    /// counts retained stories and `step` is the event's position in it.
    Story { ordinal: u32, step: u32 },
}

/// Hands out node ids for `(namespace, label)` pairs, returning the same id
/// when asked again for the same pair.  One allocator is created per run and
/// passed to every graph builder that needs ids.
#[derive(Debug, Default)]
pub struct IdAllocator {
    ids: HashMap<(NodeNamespace, EventLabel), GraphNodeId>,
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::default()
    }

    pub fn id_for(&mut self, namespace: NodeNamespace, label: &EventLabel) -> GraphNodeId {
        let next = &mut self.next;
        *self
            .ids
            .entry((namespace, label.clone()))
            .or_insert_with(|| {
                let id = GraphNodeId(*next);
                *next += 1;
                id
            })
    }

    /// Number of ids handed out so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable_per_namespace() {
        let mut ids = IdAllocator::new();
        let x = EventLabel::new("GET", "/x");
        let y = EventLabel::new("GET", "/y");

        let gx = ids.id_for(NodeNamespace::Global, &x);
        let gy = ids.id_for(NodeNamespace::Global, &y);
        assert_eq!(gx.get(), 0);
        assert_eq!(gy.get(), 1);
        assert_eq!(ids.id_for(NodeNamespace::Global, &x), gx);

        let s0 = ids.id_for(NodeNamespace::Story { ordinal: 0, step: 0 }, &x);
        let s1 = ids.id_for(NodeNamespace::Story { ordinal: 1, step: 0 }, &x);
        let s0_repeat = ids.id_for(NodeNamespace::Story { ordinal: 0, step: 2 }, &x);
        assert_ne!(s0, gx);
        assert_ne!(s0, s1);
        assert_ne!(s0, s0_repeat);
        assert_eq!(ids.len(), 5);
    }
}
