use hashbrown::HashMap;
use itertools::Itertools;

use crate::symbol::Symbol;

/// Opaque handle to a node in a [`NodeArena`].
///
/// Node identity is handle equality; two structurally identical nodes at
/// different handles are distinct. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug)]
struct MutNode<E: Symbol, P> {
    transitions: HashMap<E, NodeId>,
    attached: Option<P>,
}

impl<E: Symbol, P> MutNode<E, P> {
    fn empty() -> MutNode<E, P> {
        MutNode {
            transitions: HashMap::new(),
            attached: None,
        }
    }
}

/// Arena holding the in-construction node graph.
///
/// Ordinary transitions and the fallback relation are kept as two separate
/// edge relations over the same handle set: the transition subgraph must
/// stay acyclic (the compiler's post-order pass depends on it), while
/// fallback edges may cycle through the root.
#[derive(Debug)]
pub struct NodeArena<E: Symbol, P> {
    nodes: Vec<MutNode<E, P>>,
    fallback: HashMap<NodeId, NodeId>,
}

impl<E: Symbol, P> NodeArena<E, P> {
    /// Creates an empty arena.
    pub fn new() -> NodeArena<E, P> {
        NodeArena {
            nodes: Vec::new(),
            fallback: HashMap::new(),
        }
    }

    /// Allocates a fresh node with no transitions and no attachment.
    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MutNode::empty());
        id
    }

    /// Number of nodes ever allocated, including ones no longer reachable.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Target of the transition on `symbol`, if present.
    #[inline(always)]
    pub fn next(&self, node: NodeId, symbol: E) -> Option<NodeId> {
        self.nodes[node.0 as usize].transitions.get(&symbol).copied()
    }

    /// Installs or replaces the transition on `symbol`.
    #[inline(always)]
    pub fn set_next(&mut self, node: NodeId, symbol: E, target: NodeId) {
        self.nodes[node.0 as usize].transitions.insert(symbol, target);
    }

    /// Outgoing symbols of `node`, sorted.
    pub fn alternatives(&self, node: NodeId) -> Vec<E> {
        self.nodes[node.0 as usize]
            .transitions
            .keys()
            .copied()
            .sorted()
            .collect()
    }

    /// Number of outgoing transitions of `node`.
    #[inline(always)]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.nodes[node.0 as usize].transitions.len()
    }

    /// Payload attached at `node`.
    #[inline(always)]
    pub fn attached(&self, node: NodeId) -> Option<&P> {
        self.nodes[node.0 as usize].attached.as_ref()
    }

    /// Attaches a payload at `node`, replacing any prior one.
    #[inline(always)]
    pub fn set_attached(&mut self, node: NodeId, payload: P) {
        self.nodes[node.0 as usize].attached = Some(payload);
    }

    #[inline(always)]
    pub(crate) fn take_attached(&mut self, node: NodeId) -> Option<P> {
        self.nodes[node.0 as usize].attached.take()
    }

    /// Fallback target of `node`, if one was installed.
    #[inline(always)]
    pub fn fallback(&self, node: NodeId) -> Option<NodeId> {
        self.fallback.get(&node).copied()
    }

    /// Installs a fallback edge from `node` to `target`.
    #[inline(always)]
    pub fn set_fallback(&mut self, node: NodeId, target: NodeId) {
        self.fallback.insert(node, target);
    }

    /// Removes the fallback edge of `node`, if any.
    #[inline(always)]
    pub fn clear_fallback(&mut self, node: NodeId) {
        self.fallback.remove(&node);
    }
}

impl<E: Symbol, P> Default for NodeArena<E, P> {
    fn default() -> Self {
        NodeArena::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_nodes_are_empty() {
        let mut arena: NodeArena<u8, u32> = NodeArena::new();
        let n = arena.alloc();
        assert_eq!(arena.out_degree(n), 0);
        assert!(arena.attached(n).is_none());
        assert!(arena.fallback(n).is_none());
    }

    #[test]
    fn alternatives_are_sorted() {
        let mut arena: NodeArena<u8, u32> = NodeArena::new();
        let n = arena.alloc();
        for sym in [b'z', b'a', b'm'] {
            let child = arena.alloc();
            arena.set_next(n, sym, child);
        }
        assert_eq!(arena.alternatives(n), vec![b'a', b'm', b'z']);
    }

    #[test]
    fn fallback_is_a_separate_relation() {
        let mut arena: NodeArena<u8, u32> = NodeArena::new();
        let root = arena.alloc();
        let child = arena.alloc();
        arena.set_next(root, b'x', child);
        arena.set_fallback(child, root);
        // the transition subgraph is untouched by fallback edges
        assert_eq!(arena.out_degree(child), 0);
        assert_eq!(arena.fallback(child), Some(root));
    }
}
