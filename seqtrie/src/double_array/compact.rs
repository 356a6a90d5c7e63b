use std::collections::VecDeque;

use super::{fits, ROOT_STATE};
use crate::automaton::{Automaton, Cursor, NavigationError};
use crate::constants::{BLOCKED_RATIO_LIMIT, FAST_FORWARD_WINDOW, INITIAL_STATE_CAPACITY};
use crate::graph::{NodeArena, NodeId};
use crate::symbol::Symbol;
use crate::types::{BaseValue, StateIndex};

/// Static, tail-compressed double-array trie.
///
/// Built from a finished mutable node graph (its only input format). Long
/// unbranching runs are stored as flat `tail` arrays on a single state
/// instead of one state per symbol, so a suffix unique in the key set costs
/// O(1) states. The structure is immutable through the query surface;
/// [`CompactDoubleArray::navigator`] permits one post-build mutation,
/// re-attaching a payload, which re-explodes a compressed tail when the
/// target position sits inside one.
#[derive(Debug)]
pub struct CompactDoubleArray<E: Symbol, P> {
    base: Vec<BaseValue>,
    check: Vec<u32>,
    tails: Vec<Option<Box<[E]>>>,
    attachments: Vec<Option<P>>,
    alts: Vec<Vec<E>>,
    next_check: usize,
}

impl<E: Symbol, P> CompactDoubleArray<E, P> {
    fn empty() -> CompactDoubleArray<E, P> {
        let mut da = CompactDoubleArray {
            base: Vec::new(),
            check: Vec::new(),
            tails: Vec::new(),
            attachments: Vec::new(),
            alts: Vec::new(),
            next_check: 1,
        };
        da.ensure(ROOT_STATE);
        // the root owns itself so its slot is never handed out
        da.check[ROOT_STATE] = ROOT_STATE as u32;
        da
    }

    /// Builds the trie from a finished node graph.
    pub fn from_graph(mut graph: NodeArena<E, P>, root: NodeId) -> CompactDoubleArray<E, P> {
        let mut da = CompactDoubleArray::empty();
        let mut queue: VecDeque<(NodeId, StateIndex)> = VecDeque::new();
        queue.push_back((root, ROOT_STATE));
        while let Some((node, state)) = queue.pop_front() {
            da.expand_state(&mut graph, node, state, &mut queue);
        }
        da
    }

    fn expand_state(
        &mut self,
        graph: &mut NodeArena<E, P>,
        node: NodeId,
        state: StateIndex,
        queue: &mut VecDeque<(NodeId, StateIndex)>,
    ) {
        assert!(
            self.alts[state].is_empty() && self.base[state] == 0,
            "state {} already initialized",
            state
        );

        let attached = graph.take_attached(node);
        let alternatives = graph.alternatives(node);

        if alternatives.is_empty() {
            self.base[state] = -1;
            self.attachments[state] = attached;
            return;
        }

        if alternatives.len() == 1 && attached.is_none() {
            if let Some((tail, leaf)) = chase_tail(graph, node) {
                self.base[state] = -1;
                self.tails[state] = Some(tail.into_boxed_slice());
                self.attachments[state] = leaf;
                return;
            }
        }

        self.attachments[state] = attached;
        self.allocate_children(state, &alternatives);
        for &symbol in &alternatives {
            let child = graph
                .next(node, symbol)
                .expect("alternative without transition");
            let slot = self.base[state] as usize + symbol.key();
            queue.push_back((child, slot));
        }
    }

    /// Claims one child slot per alternative symbol under a freshly found
    /// collision-free base.
    fn allocate_children(&mut self, state: StateIndex, alternatives: &[E]) {
        let keys: Vec<usize> = alternatives.iter().map(|s| s.key()).collect();
        let base = self.find_base(&keys);
        let top = base + keys.iter().max().copied().unwrap_or(0);
        self.ensure(top);
        self.base[state] = base as BaseValue;
        for &key in &keys {
            self.check[base + key] = state as u32;
        }
        self.alts[state] = alternatives.to_vec();
    }

    /// Materializes a single child edge on a state with no children yet.
    fn sprout(&mut self, state: StateIndex, symbol: E) -> StateIndex {
        debug_assert!(self.alts[state].is_empty());
        let keys = [symbol.key()];
        let base = self.find_base(&keys);
        let slot = base + keys[0];
        self.ensure(slot);
        self.base[state] = base as BaseValue;
        self.check[slot] = state as u32;
        self.alts[state] = vec![symbol];
        self.base[slot] = -1;
        slot
    }

    /// Free-base search with a monotone cursor. The cursor fast-forwards
    /// past the scanned range once the blocked-to-scanned ratio crosses the
    /// configured threshold, bounding amortized search cost as the array
    /// fills.
    fn find_base(&mut self, keys: &[usize]) -> usize {
        let start = self.next_check.max(1);
        let mut base = start;
        while !fits(&self.check, base, keys) {
            base += 1;
        }
        let scanned = base - start + 1;
        let blocked = base - start;
        if scanned >= FAST_FORWARD_WINDOW && blocked as f32 / scanned as f32 >= BLOCKED_RATIO_LIMIT
        {
            log::trace!("free-base cursor fast-forward {} -> {}", self.next_check, base);
            self.next_check = base;
        }
        base
    }

    /// Grows all parallel arrays (doubling, never shrinking) so `slot` is
    /// addressable.
    fn ensure(&mut self, slot: usize) {
        if slot < self.base.len() {
            return;
        }
        let mut len = self.base.len().max(INITIAL_STATE_CAPACITY);
        while len <= slot {
            len *= 2;
        }
        self.base.resize(len, 0);
        self.check.resize(len, super::FREE);
        self.tails.resize_with(len, || None);
        self.attachments.resize_with(len, || None);
        self.alts.resize_with(len, Vec::new);
    }

    #[inline(always)]
    fn next_state(&self, state: StateIndex, symbol: E) -> Option<StateIndex> {
        if self.base[state] < 0 {
            return None;
        }
        let slot = self.base[state] as usize + symbol.key();
        if self.check.get(slot).copied() == Some(state as u32) {
            Some(slot)
        } else {
            None
        }
    }

    /// Creates an independent query cursor positioned at the root.
    pub fn cursor(&self) -> CompactCursor<'_, E, P> {
        CompactCursor {
            automaton: self,
            state: ROOT_STATE,
            tail_pos: 0,
        }
    }

    /// Creates a strict cursor over `&mut self`. Besides raising
    /// [`NavigationError`] on missing transitions, it can re-attach a
    /// payload at its current position, exploding a compressed tail when
    /// the position sits inside one.
    pub fn navigator(&mut self) -> CompactNavigator<'_, E, P> {
        CompactNavigator {
            automaton: self,
            state: ROOT_STATE,
            tail_pos: 0,
            depth: 0,
        }
    }
}

impl<E: Symbol, P> Automaton<E, P> for CompactDoubleArray<E, P> {
    fn find(&self, sequence: &[E]) -> Option<&P> {
        let mut state = ROOT_STATE;
        let mut i = 0;
        while i < sequence.len() {
            if self.base[state] < 0 {
                return match &self.tails[state] {
                    Some(tail) if tail[..] == sequence[i..] => self.attachments[state].as_ref(),
                    _ => None,
                };
            }
            match self.next_state(state, sequence[i]) {
                Some(next) => {
                    state = next;
                    i += 1;
                }
                None => return None,
            }
        }
        if let Some(tail) = &self.tails[state] {
            // the attachment of a tail-bearing state sits at the tail's end
            if !tail.is_empty() {
                return None;
            }
        }
        self.attachments[state].as_ref()
    }
}

/// Chases a single-child chain to its end. Succeeds only when the chain
/// terminates in a leaf with no intermediate attachments or branches; such
/// runs are the ones tail compression may collapse.
fn chase_tail<E: Symbol, P>(
    graph: &mut NodeArena<E, P>,
    node: NodeId,
) -> Option<(Vec<E>, Option<P>)> {
    let mut symbols = Vec::new();
    let mut current = node;
    loop {
        let symbol = graph.alternatives(current)[0];
        let next = graph.next(current, symbol)?;
        symbols.push(symbol);
        current = next;
        match (graph.out_degree(current), graph.attached(current).is_some()) {
            (0, _) => return Some((symbols, graph.take_attached(current))),
            (1, false) => continue,
            _ => return None,
        }
    }
}

/// Relaxed query cursor over a [`CompactDoubleArray`].
///
/// Positions inside a compressed tail are tracked with an offset, so the
/// cursor sees the same state space as an uncompressed trie would expose.
pub struct CompactCursor<'a, E: Symbol, P> {
    automaton: &'a CompactDoubleArray<E, P>,
    state: StateIndex,
    tail_pos: usize,
}

impl<'a, E: Symbol, P> CompactCursor<'a, E, P> {
    fn probe(&self, symbol: E) -> Option<(StateIndex, usize)> {
        if self.automaton.base[self.state] < 0 {
            let tail = self.automaton.tails[self.state].as_deref()?;
            if self.tail_pos < tail.len() && tail[self.tail_pos] == symbol {
                return Some((self.state, self.tail_pos + 1));
            }
            return None;
        }
        self.automaton
            .next_state(self.state, symbol)
            .map(|next| (next, 0))
    }

    fn current_attachment(&self) -> Option<&'a P> {
        if let Some(tail) = &self.automaton.tails[self.state] {
            if self.tail_pos != tail.len() {
                return None;
            }
        }
        self.automaton.attachments[self.state].as_ref()
    }

    /// Iterates the payloads at the current position. The compact trie has
    /// no fallback chain, so at most one payload is yielded.
    pub fn attachments(&self) -> std::option::IntoIter<&'a P> {
        self.current_attachment().into_iter()
    }
}

impl<'a, E: Symbol, P> Cursor<E> for CompactCursor<'a, E, P> {
    fn reset(&mut self) {
        self.state = ROOT_STATE;
        self.tail_pos = 0;
    }

    #[inline(always)]
    fn lookahead(&self, symbol: E) -> bool {
        self.probe(symbol).is_some()
    }

    fn accept(&mut self, symbol: E) -> bool {
        match self.probe(symbol) {
            Some((state, tail_pos)) => {
                self.state = state;
                self.tail_pos = tail_pos;
                true
            }
            None => {
                self.reset();
                false
            }
        }
    }

    fn has_attachments(&self) -> bool {
        self.current_attachment().is_some()
    }
}

/// Strict cursor over a [`CompactDoubleArray`], with re-attachment.
pub struct CompactNavigator<'a, E: Symbol, P> {
    automaton: &'a mut CompactDoubleArray<E, P>,
    state: StateIndex,
    tail_pos: usize,
    depth: usize,
}

impl<'a, E: Symbol, P> CompactNavigator<'a, E, P> {
    /// Follows the transition on `symbol`, descending into a compressed
    /// tail where one is stored.
    pub fn step(&mut self, symbol: E) -> Result<(), NavigationError> {
        if self.automaton.base[self.state] < 0 {
            let tail = self.automaton.tails[self.state].as_deref();
            match tail {
                Some(tail) if self.tail_pos < tail.len() && tail[self.tail_pos] == symbol => {
                    self.tail_pos += 1;
                    self.depth += 1;
                    return Ok(());
                }
                _ => return Err(NavigationError::no_transition(symbol, self.depth)),
            }
        }
        match self.automaton.next_state(self.state, symbol) {
            Some(next) => {
                self.state = next;
                self.tail_pos = 0;
                self.depth += 1;
                Ok(())
            }
            None => Err(NavigationError::no_transition(symbol, self.depth)),
        }
    }

    /// Number of symbols followed so far.
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Re-attaches a payload at the current position.
    ///
    /// When the position sits inside a stored tail, the tail is exploded:
    /// one state is materialized per consumed tail symbol, the remaining
    /// suffix re-hangs as a fresh tail on a new terminal state, and the
    /// original attachment keeps its original depth.
    pub fn attach(&mut self, payload: P) {
        if self.automaton.base[self.state] >= 0 {
            self.automaton.attachments[self.state] = Some(payload);
            return;
        }
        let tail_len = self.automaton.tails[self.state]
            .as_deref()
            .map_or(0, |t| t.len());
        if self.tail_pos == tail_len {
            // terminal state, or position exactly at the tail's end
            self.automaton.attachments[self.state] = Some(payload);
            return;
        }
        self.explode(payload);
    }

    fn explode(&mut self, payload: P) {
        let state = self.state;
        let divergence = self.tail_pos;
        let tail = self.automaton.tails[state]
            .take()
            .expect("tail explosion on a state without a tail");
        let original = self.automaton.attachments[state].take();

        let mut current = state;
        for &symbol in &tail[..divergence] {
            current = self.automaton.sprout(current, symbol);
        }
        self.automaton.attachments[current] = Some(payload);

        // divergence < tail.len() here; the exact-end case never explodes
        let slot = self.automaton.sprout(current, tail[divergence]);
        let rest: Box<[E]> = tail[divergence + 1..].into();
        if !rest.is_empty() {
            self.automaton.tails[slot] = Some(rest);
        }
        self.automaton.attachments[slot] = original;

        self.state = current;
        self.tail_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Builder;

    fn compact(entries: &[(&[u8], u32)]) -> CompactDoubleArray<u8, u32> {
        let mut builder: Builder<u8, u32> = Builder::new();
        for &(key, value) in entries {
            builder.extend(key, Some(value));
        }
        let (graph, root) = builder.into_parts();
        CompactDoubleArray::from_graph(graph, root)
    }

    #[test]
    fn round_trip_and_negative_lookup() {
        let da = compact(&[(b"bachelor", 1), (b"bac", 2), (b"jar", 3), (b"badge", 4)]);
        assert_eq!(da.find(b"bachelor"), Some(&1));
        assert_eq!(da.find(b"bac"), Some(&2));
        assert_eq!(da.find(b"jar"), Some(&3));
        assert_eq!(da.find(b"badge"), Some(&4));
        assert_eq!(da.find(b"bach"), None);
        assert_eq!(da.find(b"bachelors"), None);
        assert_eq!(da.find(b"j"), None);
        assert!(!da.contains(b"zzz"));
    }

    #[test]
    fn unique_suffixes_are_tail_compressed() {
        let da = compact(&[(b"bachelor", 1), (b"bad", 2)]);
        // "helor" and the singleton "d" end in tails; only the shared
        // prefix states are materialized
        let live_states = da.check.iter().filter(|&&c| c != 0).count();
        assert!(live_states <= 6, "expected few live states, got {}", live_states);
        assert_eq!(da.find(b"bachelor"), Some(&1));
        assert_eq!(da.find(b"bad"), Some(&2));
    }

    #[test]
    fn empty_sequence_attaches_to_root() {
        let da = compact(&[(b"", 9), (b"a", 1)]);
        assert_eq!(da.find(b""), Some(&9));
        assert_eq!(da.find(b"a"), Some(&1));
    }

    #[test]
    fn cursor_walks_into_tails() {
        let da = compact(&[(b"bachelor", 1)]);
        let mut cursor = da.cursor();
        for &sym in b"bachelor" {
            assert!(cursor.lookahead(sym));
            assert!(cursor.accept(sym));
        }
        assert!(cursor.has_attachments());
        assert_eq!(cursor.attachments().collect::<Vec<_>>(), vec![&1]);
        assert!(!cursor.accept(b'x'));
        // failure reset the cursor to the root
        assert!(cursor.accept(b'b'));
    }

    #[test]
    fn tail_explosion_preserves_all_keys() {
        let mut builder: Builder<u8, char> = Builder::new();
        builder.extend(b"bac", Some('C')).extend(b"bachelor", Some('A'));
        let (graph, root) = builder.into_parts();
        let mut da = CompactDoubleArray::from_graph(graph, root);

        let mut nav = da.navigator();
        for &sym in b"bache" {
            nav.step(sym).unwrap();
        }
        assert_eq!(nav.depth(), 5);
        nav.attach('B');
        drop(nav);

        assert_eq!(da.find(b"bachelor"), Some(&'A'));
        assert_eq!(da.find(b"bache"), Some(&'B'));
        assert_eq!(da.find(b"bac"), Some(&'C'));
        assert_eq!(da.find(b"bach"), None);
        assert_eq!(da.find(b"bachel"), None);
    }

    #[test]
    fn explosion_at_tail_start_and_end() {
        let mut da = compact(&[(b"abc", 1)]);
        // root's chain is one tail; attach at depth 0 of the tail's owner
        {
            let mut nav = da.navigator();
            nav.step(b'a').unwrap();
            nav.attach(7);
        }
        assert_eq!(da.find(b"a"), Some(&7));
        assert_eq!(da.find(b"abc"), Some(&1));
        // attaching at the full depth overwrites in place
        {
            let mut nav = da.navigator();
            for &sym in b"abc" {
                nav.step(sym).unwrap();
            }
            nav.attach(2);
        }
        assert_eq!(da.find(b"abc"), Some(&2));
        assert_eq!(da.find(b"a"), Some(&7));
    }

    #[test]
    fn navigator_is_strict() {
        let mut da = compact(&[(b"abc", 1)]);
        let mut nav = da.navigator();
        nav.step(b'a').unwrap();
        let err = nav.step(b'x').unwrap_err();
        assert!(matches!(
            err,
            NavigationError::NoTransition { depth: 1, .. }
        ));
    }

    #[test]
    fn growth_preserves_inserted_keys() {
        let mut builder: Builder<u8, u32> = Builder::new();
        let mut keys: Vec<Vec<u8>> = Vec::new();
        let mut value = 0u32;
        for a in b'a'..=b'z' {
            for b in b'a'..=b'z' {
                let key = vec![a, b, a, b'!'];
                builder.extend(&key, Some(value));
                keys.push(key);
                value += 1;
            }
        }
        let (graph, root) = builder.into_parts();
        let da = CompactDoubleArray::from_graph(graph, root);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(da.find(key), Some(&(i as u32)), "key {:?} lost", key);
        }
    }

    #[test]
    fn char_domain_round_trip() {
        let mut builder: Builder<char, u32> = Builder::new();
        let word: Vec<char> = "smörgås".chars().collect();
        builder.extend(&word, Some(1));
        let (graph, root) = builder.into_parts();
        let da = CompactDoubleArray::from_graph(graph, root);
        assert_eq!(da.find(&word), Some(&1));
        assert_eq!(da.find(&word[..4]), None);
    }
}
