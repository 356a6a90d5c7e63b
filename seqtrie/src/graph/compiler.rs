use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use super::compiled::{CompiledAutomaton, CompiledId, CompiledNode, Repr};
use super::node::{NodeArena, NodeId};
use crate::symbol::Symbol;

/// Transforms a finished mutable graph into an immutable compiled automaton.
///
/// Two fixed passes, both from the root:
///
/// 1. a compile pass in strict post-order, so every node is compiled only
///    after all of its successors, choosing each node's representation in
///    fixed priority (terminal, array, map);
/// 2. a link pass in plain root-first visitation order, patching the
///    fallback back-references, which may point at nodes that are not
///    successors of their referrer and so could not be resolved during the
///    compile pass.
pub(crate) fn compile<E: Symbol, P>(
    mut graph: NodeArena<E, P>,
    root: NodeId,
) -> CompiledAutomaton<E, P> {
    let order = post_order(&graph, root);

    let mut nodes: Vec<CompiledNode<E, P>> = Vec::with_capacity(order.len());
    let mut memo: HashMap<NodeId, CompiledId> = HashMap::with_capacity(order.len());
    let mut terminals = 0usize;
    let mut arrays = 0usize;
    let mut maps = 0usize;

    for node in order {
        let repr = compile_node(&graph, node, &memo);
        match repr {
            Repr::Terminal => terminals += 1,
            Repr::Array { .. } => arrays += 1,
            Repr::Map(_) => maps += 1,
        }
        let id = CompiledId(nodes.len() as u32);
        nodes.push(CompiledNode {
            repr,
            attached: graph.take_attached(node),
            fallback: None,
        });
        memo.insert(node, id);
    }

    log::debug!(
        "compiled {} nodes ({} terminal, {} array, {} map)",
        nodes.len(),
        terminals,
        arrays,
        maps
    );

    link(&graph, root, &memo, &mut nodes);

    let root = resolve(&memo, root);
    CompiledAutomaton { nodes, root }
}

/// Strict post-order over the transition subgraph.
///
/// Breadth-first from the root, counting for every node its distinct
/// unreleased predecessors; nodes whose count reaches zero are released
/// onto a pending stack. Popping the stack yields successors before their
/// predecessors.
///
/// # Panics
///
/// Panics when the release frontier empties while reachable nodes remain
/// unreleased: the graph then contains a cycle through ordinary
/// transitions, which violates the construction precondition.
fn post_order<E: Symbol, P>(graph: &NodeArena<E, P>, root: NodeId) -> Vec<NodeId> {
    let mut predecessors: HashMap<NodeId, usize> = HashMap::new();
    let mut reachable: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    reachable.insert(root);
    queue.push_back(root);
    while let Some(node) = queue.pop_front() {
        for target in successors(graph, node) {
            *predecessors.entry(target).or_insert(0) += 1;
            if reachable.insert(target) {
                queue.push_back(target);
            }
        }
    }

    let mut frontier: VecDeque<NodeId> = VecDeque::new();
    frontier.push_back(root);
    let mut stack: Vec<NodeId> = Vec::with_capacity(reachable.len());

    while let Some(node) = frontier.pop_front() {
        stack.push(node);
        for target in successors(graph, node) {
            let count = predecessors
                .get_mut(&target)
                .expect("predecessor count missing for reachable node");
            *count -= 1;
            if *count == 0 {
                frontier.push_back(target);
            }
        }
    }

    if stack.len() != reachable.len() {
        panic!(
            "node graph contains a cycle through ordinary transitions \
             ({} of {} reachable nodes released)",
            stack.len(),
            reachable.len()
        );
    }

    stack.reverse();
    stack
}

/// Distinct successor set of a node. Transitions on different symbols may
/// in principle share a target; predecessor counting needs each edge pair
/// only once.
fn successors<E: Symbol, P>(graph: &NodeArena<E, P>, node: NodeId) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    graph
        .alternatives(node)
        .into_iter()
        .filter_map(|sym| graph.next(node, sym))
        .filter(|target| seen.insert(*target))
        .collect()
}

/// Chooses the first fitting representation in fixed priority.
fn compile_node<E: Symbol, P>(
    graph: &NodeArena<E, P>,
    node: NodeId,
    memo: &HashMap<NodeId, CompiledId>,
) -> Repr<E> {
    let alternatives = graph.alternatives(node);
    if alternatives.is_empty() {
        return Repr::Terminal;
    }

    let targets: Vec<(E, CompiledId)> = alternatives
        .iter()
        .map(|&sym| {
            let target = graph
                .next(node, sym)
                .expect("alternative without transition");
            (sym, resolve(memo, target))
        })
        .collect();

    if let Some(repr) = try_array(&targets) {
        return repr;
    }

    Repr::Map(targets.into_iter().collect())
}

/// Attempts the masked-array representation, growing the power-of-two slot
/// count until no two symbols collide under the mask, and rejecting once
/// the symbol domain's size limit is exceeded.
fn try_array<E: Symbol>(targets: &[(E, CompiledId)]) -> Option<Repr<E>> {
    let mut size = targets.len().next_power_of_two().max(1);
    while size <= E::ARRAY_NODE_LIMIT {
        let mask = (size - 1) as u32;
        let mut slots: Box<[Option<(E, CompiledId)>]> =
            std::iter::repeat_with(|| None).take(size).collect();
        let mut collided = false;
        for &(sym, target) in targets {
            let slot = (sym.index() & mask) as usize;
            if slots[slot].is_some() {
                collided = true;
                break;
            }
            slots[slot] = Some((sym, target));
        }
        if !collided {
            return Some(Repr::Array { mask, slots });
        }
        size <<= 1;
    }
    None
}

/// Patches relations that could not be expressed through already-compiled
/// successors: the fallback back-reference, whose target may have been
/// compiled after its referrer.
fn link<E: Symbol, P>(
    graph: &NodeArena<E, P>,
    root: NodeId,
    memo: &HashMap<NodeId, CompiledId>,
    nodes: &mut [CompiledNode<E, P>],
) {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    visited.insert(root);
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        if let Some(target) = graph.fallback(node) {
            let id = resolve(memo, node);
            nodes[id.0 as usize].fallback = Some(resolve(memo, target));
        }
        for target in successors(graph, node) {
            if visited.insert(target) {
                queue.push_back(target);
            }
        }
    }
}

/// Looks up the compiled replacement of an original node. Every node
/// reachable from the root has one; the panic guards the invariant against
/// tasks wiring fallback edges at unreachable nodes.
fn resolve(memo: &HashMap<NodeId, CompiledId>, node: NodeId) -> CompiledId {
    *memo
        .get(&node)
        .expect("node was never compiled; is it reachable from the root?")
}

#[cfg(test)]
mod tests {
    use super::super::{Builder, NodeArena, NodeId, Task};
    use crate::automaton::Automaton;

    #[test]
    fn leaves_compile_before_their_parents() {
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(b"abc", Some(1)).extend(b"abd", Some(2));
        let order = super::post_order(builder.graph(), builder.root());
        // parents appear after all of their children
        let position = |n: NodeId| order.iter().position(|&x| x == n).unwrap();
        let root = builder.root();
        let a = builder.graph().next(root, b'a').unwrap();
        let ab = builder.graph().next(a, b'b').unwrap();
        assert!(position(ab) < position(a));
        assert!(position(a) < position(root));
    }

    struct CycleTask;

    impl Task<u8, u32> for CycleTask {
        fn init(&mut self, graph: &mut NodeArena<u8, u32>, root: NodeId) -> Vec<NodeId> {
            let child = graph.next(root, b'a').unwrap();
            graph.set_next(child, b'z', root);
            vec![]
        }

        fn process(&mut self, _: &mut NodeArena<u8, u32>, _: NodeId) -> Vec<NodeId> {
            vec![]
        }
    }

    #[test]
    #[should_panic(expected = "cycle through ordinary transitions")]
    fn cyclic_transition_graph_is_rejected() {
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(b"a", Some(1));
        builder.work(&mut CycleTask);
        let _ = builder.build();
    }

    #[test]
    fn deep_single_chain_compiles() {
        let key: Vec<u8> = std::iter::repeat(b'x').take(2000).collect();
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(&key, Some(9));
        let automaton = builder.build();
        assert_eq!(automaton.find(&key), Some(&9));
        assert_eq!(automaton.find(&key[..1999]), None);
    }
}
