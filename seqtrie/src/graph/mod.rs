/*! Incremental construction of sequence automata.

Sequences are inserted one at a time into a mutable node graph held in a
[`NodeArena`]; [`Builder::build`] then runs the two-pass compiler and
returns an immutable [`CompiledAutomaton`]. Failure links for
Aho-Corasick-style scanning are added by running [`FallbackLinkTask`]
through [`Builder::work`] before building.
*/

pub mod compiled;
mod compiler;
pub mod fallback;
mod node;

use std::collections::VecDeque;

pub use self::compiled::{CompiledAutomaton, CompiledCursor, CompiledNavigator};
pub use self::fallback::FallbackLinkTask;
pub use self::node::{NodeArena, NodeId};

use crate::symbol::Symbol;

/// Merge strategy applied when an inserted sequence's terminal node already
/// carries an attachment.
///
/// Returning `None` keeps the existing attachment untouched; the builder
/// will not write back into the node, so payload identity is preserved for
/// idempotent joins.
pub trait Join<P> {
    /// Combines an existing attachment with an incoming payload.
    fn join(&self, existing: &P, incoming: P) -> Option<P>;
}

impl<P, F> Join<P> for F
where
    F: Fn(&P, P) -> Option<P>,
{
    #[inline(always)]
    fn join(&self, existing: &P, incoming: P) -> Option<P> {
        self(existing, incoming)
    }
}

/// Default join strategy: the incoming payload replaces the existing one.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overwrite;

impl<P> Join<P> for Overwrite {
    #[inline(always)]
    fn join(&self, _existing: &P, incoming: P) -> Option<P> {
        Some(incoming)
    }
}

/// A worklist-driven graph rewrite run by [`Builder::work`].
///
/// `process` is invoked in FIFO order over the enqueued nodes. The builder
/// provides no revisit guard: a task must either be idempotent or track
/// visited nodes itself. The shipped [`FallbackLinkTask`] enqueues every
/// trie node exactly once and needs neither.
pub trait Task<E: Symbol, P> {
    /// Seeds the worklist. Called once with the graph root.
    fn init(&mut self, graph: &mut NodeArena<E, P>, root: NodeId) -> Vec<NodeId>;

    /// Processes one node and returns further nodes to enqueue.
    fn process(&mut self, graph: &mut NodeArena<E, P>, node: NodeId) -> Vec<NodeId>;
}

/// Incremental builder for the mutable node graph.
pub struct Builder<E: Symbol, P, J = Overwrite> {
    graph: NodeArena<E, P>,
    root: NodeId,
    join: J,
}

impl<E: Symbol, P> Builder<E, P, Overwrite> {
    /// Creates a builder whose join strategy overwrites prior attachments.
    pub fn new() -> Builder<E, P, Overwrite> {
        Builder::with_join(Overwrite)
    }
}

impl<E: Symbol, P> Default for Builder<E, P, Overwrite> {
    fn default() -> Self {
        Builder::new()
    }
}

impl<E: Symbol, P, J: Join<P>> Builder<E, P, J> {
    /// Creates a builder with an explicit join strategy.
    pub fn with_join(join: J) -> Builder<E, P, J> {
        let mut graph = NodeArena::new();
        let root = graph.alloc();
        Builder { graph, root, join }
    }

    /// Inserts one sequence, creating empty nodes for missing transitions.
    ///
    /// A `None` payload performs a purely structural insertion and is a
    /// no-op at the final node. The empty sequence attaches directly to the
    /// root.
    pub fn extend(&mut self, sequence: &[E], payload: Option<P>) -> &mut Self {
        let mut node = self.root;
        for &symbol in sequence {
            node = match self.graph.next(node, symbol) {
                Some(next) => next,
                None => {
                    let child = self.graph.alloc();
                    self.graph.set_next(node, symbol, child);
                    child
                }
            };
        }

        if let Some(incoming) = payload {
            match self.graph.attached(node) {
                Some(existing) => {
                    if let Some(joined) = self.join.join(existing, incoming) {
                        self.graph.set_attached(node, joined);
                    }
                }
                None => self.graph.set_attached(node, incoming),
            }
        }

        self
    }

    /// Runs a worklist-driven graph rewrite over the current graph.
    pub fn work(&mut self, task: &mut dyn Task<E, P>) -> &mut Self {
        let mut queue: VecDeque<NodeId> = task.init(&mut self.graph, self.root).into();
        while let Some(node) = queue.pop_front() {
            queue.extend(task.process(&mut self.graph, node));
        }
        self
    }

    /// Finalizes the graph into an immutable compiled automaton.
    ///
    /// # Panics
    ///
    /// Panics if a task has introduced a cycle through ordinary transitions;
    /// such a graph violates the construction precondition and cannot be
    /// compiled.
    pub fn build(self) -> CompiledAutomaton<E, P> {
        compiler::compile(self.graph, self.root)
    }

    /// Root handle of the graph under construction.
    #[inline(always)]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to the graph under construction.
    #[inline(always)]
    pub fn graph(&self) -> &NodeArena<E, P> {
        &self.graph
    }

    /// Consumes the builder, yielding the finished mutable graph. This is
    /// the input format of the compact double-array trie.
    pub fn into_parts(self) -> (NodeArena<E, P>, NodeId) {
        (self.graph, self.root)
    }
}

impl<E: Symbol, P: Clone, J: Join<P>> Builder<E, P, J> {
    /// Computes Aho-Corasick failure links over the current trie, then
    /// builds. Equivalent to running [`FallbackLinkTask`] through
    /// [`Builder::work`] followed by [`Builder::build`].
    pub fn build_with_fallback(mut self) -> CompiledAutomaton<E, P> {
        let mut task = FallbackLinkTask::new();
        self.work(&mut task);
        self.build()
    }
}
