use hashbrown::HashMap;

use crate::automaton::{Automaton, Cursor, NavigationError};
use crate::symbol::Symbol;

/// Opaque handle to a node of a [`CompiledAutomaton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompiledId(pub(crate) u32);

/// Transition representation of one compiled node, chosen per node by the
/// compiler in fixed priority: terminal, then masked array, then map.
#[derive(Debug)]
pub(crate) enum Repr<E: Symbol> {
    /// No transitions at all.
    Terminal,
    /// Power-of-two slot array addressed by `symbol.index() & mask`. Each
    /// slot records its owning symbol so mask collisions from symbols never
    /// inserted are detected as misses.
    Array {
        mask: u32,
        slots: Box<[Option<(E, CompiledId)>]>,
    },
    /// Sparse adjacency for fan-outs the array representation rejected.
    Map(HashMap<E, CompiledId>),
}

#[derive(Debug)]
pub(crate) struct CompiledNode<E: Symbol, P> {
    pub(crate) repr: Repr<E>,
    pub(crate) attached: Option<P>,
    pub(crate) fallback: Option<CompiledId>,
}

impl<E: Symbol, P> CompiledNode<E, P> {
    #[inline(always)]
    fn next(&self, symbol: E) -> Option<CompiledId> {
        match &self.repr {
            Repr::Terminal => None,
            Repr::Array { mask, slots } => {
                let slot = (symbol.index() & mask) as usize;
                match slots[slot] {
                    Some((owner, target)) if owner == symbol => Some(target),
                    _ => None,
                }
            }
            Repr::Map(map) => map.get(&symbol).copied(),
        }
    }
}

/// Immutable automaton produced by [`Builder::build`](super::Builder::build).
///
/// Never mutated after construction; any number of cursors may be created
/// from it, including from multiple threads.
#[derive(Debug)]
pub struct CompiledAutomaton<E: Symbol, P> {
    pub(crate) nodes: Vec<CompiledNode<E, P>>,
    pub(crate) root: CompiledId,
}

impl<E: Symbol, P> CompiledAutomaton<E, P> {
    #[inline(always)]
    fn node(&self, id: CompiledId) -> &CompiledNode<E, P> {
        &self.nodes[id.0 as usize]
    }

    /// Number of compiled nodes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates an independent query cursor positioned at the root.
    pub fn cursor(&self) -> CompiledCursor<'_, E, P> {
        CompiledCursor {
            automaton: self,
            state: self.root,
        }
    }

    /// Creates a strict cursor that raises [`NavigationError`] on missing
    /// transitions instead of silently resetting.
    pub fn navigator(&self) -> CompiledNavigator<'_, E, P> {
        CompiledNavigator {
            automaton: self,
            state: self.root,
            depth: 0,
        }
    }

    fn walk(&self, sequence: &[E]) -> Option<CompiledId> {
        let mut state = self.root;
        for &symbol in sequence {
            state = self.node(state).next(symbol)?;
        }
        Some(state)
    }
}

impl<E: Symbol, P> Automaton<E, P> for CompiledAutomaton<E, P> {
    fn find(&self, sequence: &[E]) -> Option<&P> {
        self.walk(sequence)
            .and_then(|state| self.node(state).attached.as_ref())
    }
}

/// Relaxed query cursor over a [`CompiledAutomaton`].
pub struct CompiledCursor<'a, E: Symbol, P> {
    automaton: &'a CompiledAutomaton<E, P>,
    state: CompiledId,
}

/// Byte-domain compiled cursor.
pub type ByteAutomaton<'a, P> = CompiledCursor<'a, u8, P>;
/// Char-domain compiled cursor.
pub type CharAutomaton<'a, P> = CompiledCursor<'a, char, P>;

impl<'a, E: Symbol, P> CompiledCursor<'a, E, P> {
    fn probe(&self, symbol: E) -> Option<CompiledId> {
        let mut state = self.state;
        loop {
            if let Some(next) = self.automaton.node(state).next(symbol) {
                return Some(next);
            }
            state = self.automaton.node(state).fallback?;
        }
    }

    /// Iterates over all payloads reachable at the current position via the
    /// fallback chain. A fresh iterator must be obtained per query.
    pub fn attachments(&self) -> Attachments<'a, E, P> {
        Attachments {
            automaton: self.automaton,
            state: Some(self.state),
        }
    }
}

impl<'a, E: Symbol, P> Cursor<E> for CompiledCursor<'a, E, P> {
    #[inline(always)]
    fn reset(&mut self) {
        self.state = self.automaton.root;
    }

    #[inline(always)]
    fn lookahead(&self, symbol: E) -> bool {
        self.probe(symbol).is_some()
    }

    fn accept(&mut self, symbol: E) -> bool {
        match self.probe(symbol) {
            Some(next) => {
                self.state = next;
                true
            }
            None => {
                self.state = self.automaton.root;
                false
            }
        }
    }

    fn has_attachments(&self) -> bool {
        self.attachments().next().is_some()
    }
}

/// Single-pass iterator over the payloads on a cursor's fallback chain.
pub struct Attachments<'a, E: Symbol, P> {
    automaton: &'a CompiledAutomaton<E, P>,
    state: Option<CompiledId>,
}

impl<'a, E: Symbol, P> Iterator for Attachments<'a, E, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<&'a P> {
        while let Some(state) = self.state {
            let node = self.automaton.node(state);
            self.state = node.fallback;
            if let Some(payload) = node.attached.as_ref() {
                return Some(payload);
            }
        }
        None
    }
}

/// Strict cursor over a [`CompiledAutomaton`]: following a nonexistent
/// transition is an error, not a silent reset.
pub struct CompiledNavigator<'a, E: Symbol, P> {
    automaton: &'a CompiledAutomaton<E, P>,
    state: CompiledId,
    depth: usize,
}

impl<'a, E: Symbol, P> CompiledNavigator<'a, E, P> {
    /// Follows the transition on `symbol` from the current state.
    pub fn step(&mut self, symbol: E) -> Result<(), NavigationError> {
        match self.automaton.node(self.state).next(symbol) {
            Some(next) => {
                self.state = next;
                self.depth += 1;
                Ok(())
            }
            None => Err(NavigationError::no_transition(symbol, self.depth)),
        }
    }

    /// Payload attached at the current state, ignoring the fallback chain.
    #[inline(always)]
    pub fn attached(&self) -> Option<&'a P> {
        self.automaton.node(self.state).attached.as_ref()
    }

    /// Number of symbols followed so far.
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }
}
