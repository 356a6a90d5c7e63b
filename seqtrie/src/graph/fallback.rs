use super::node::{NodeArena, NodeId};
use super::Task;
use crate::symbol::Symbol;

/// Breadth-first failure-link construction over a finished trie.
///
/// For every transition `node --s--> next`, the task walks `node`'s own
/// fallback chain to the first ancestor that also has a transition on `s`;
/// `next`'s fallback then points at that ancestor's target, and `next`
/// inherits that target's attachment when it has none of its own. A chain
/// that exhausts without a hit falls back to the root. This is the
/// classical Aho-Corasick construction generalized to an arbitrary
/// (non-minimized) trie.
///
/// Run through [`Builder::work`](super::Builder::work) on a trie whose root
/// has no fallback set. Each trie node has exactly one parent, so the task
/// enqueues every node exactly once and needs no visited tracking.
pub struct FallbackLinkTask {
    root: Option<NodeId>,
}

impl FallbackLinkTask {
    /// Creates the task; the root is captured from `init`.
    pub fn new() -> FallbackLinkTask {
        FallbackLinkTask { root: None }
    }
}

impl Default for FallbackLinkTask {
    fn default() -> Self {
        FallbackLinkTask::new()
    }
}

impl<E: Symbol, P: Clone> Task<E, P> for FallbackLinkTask {
    fn init(&mut self, graph: &mut NodeArena<E, P>, root: NodeId) -> Vec<NodeId> {
        graph.clear_fallback(root);
        self.root = Some(root);
        vec![root]
    }

    fn process(&mut self, graph: &mut NodeArena<E, P>, node: NodeId) -> Vec<NodeId> {
        let root = self.root.expect("task not initialized");
        let mut children = Vec::new();

        for symbol in graph.alternatives(node) {
            let next = match graph.next(node, symbol) {
                Some(next) => next,
                None => continue,
            };

            let mut down = graph.fallback(node);
            loop {
                match down {
                    Some(ancestor) => match graph.next(ancestor, symbol) {
                        Some(target) => {
                            graph.set_fallback(next, target);
                            if graph.attached(next).is_none() {
                                if let Some(payload) = graph.attached(target).cloned() {
                                    graph.set_attached(next, payload);
                                }
                            }
                            break;
                        }
                        None => down = graph.fallback(ancestor),
                    },
                    None => {
                        graph.set_fallback(next, root);
                        break;
                    }
                }
            }

            children.push(next);
        }

        children
    }
}

#[cfg(test)]
mod tests {
    use super::super::Builder;
    use crate::automaton::Cursor;

    #[test]
    fn scanning_reports_matches_through_fallback_links() {
        let mut builder: Builder<u8, char> = Builder::new();
        builder.extend(b"gat", Some('G')).extend(b"cgatggg", Some('C'));
        let automaton = builder.build_with_fallback();

        let mut cursor = automaton.cursor();
        let mut seen: Vec<(usize, Vec<char>)> = Vec::new();
        for (i, &sym) in b"cgatggg".iter().enumerate() {
            assert!(cursor.accept(sym));
            if cursor.has_attachments() {
                seen.push((i, cursor.attachments().copied().collect()));
            }
        }

        // 'G' reported right after consuming ...gat, 'C' at the end
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 3);
        assert!(seen[0].1.contains(&'G'));
        assert!(!seen[0].1.contains(&'C'));
        assert_eq!(seen[1].0, 6);
        assert!(seen[1].1.contains(&'C'));
        assert!(!seen[1].1.contains(&'G'));
    }

    #[test]
    fn failure_links_restart_partial_matches() {
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(b"abab", Some(1)).extend(b"bab", Some(2));
        let automaton = builder.build_with_fallback();

        let mut cursor = automaton.cursor();
        for &sym in b"aabab" {
            cursor.accept(sym);
        }
        let reached: Vec<u32> = cursor.attachments().copied().collect();
        assert!(reached.contains(&1));
        assert!(reached.contains(&2));
    }

    #[test]
    fn root_children_fall_back_to_root() {
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(b"xy", Some(1));
        let automaton = builder.build_with_fallback();
        let mut cursor = automaton.cursor();
        assert!(cursor.accept(b'x'));
        // a miss mid-path walks the chain to the root and resets
        assert!(!cursor.accept(b'q'));
        assert!(cursor.accept(b'x'));
        assert!(cursor.accept(b'y'));
        assert!(cursor.has_attachments());
    }

    #[test]
    fn attachment_inheritance_is_shallow() {
        // "aa" has no payload of its own and inherits the payload of its
        // fallback target "a"
        let mut builder: Builder<u8, u32> = Builder::new();
        builder.extend(b"a", Some(7)).extend(b"aab", Some(8));
        let automaton = builder.build_with_fallback();
        let mut cursor = automaton.cursor();
        assert!(cursor.accept(b'a'));
        assert!(cursor.accept(b'a'));
        let seen: Vec<u32> = cursor.attachments().copied().collect();
        assert!(seen.contains(&7));
    }
}
