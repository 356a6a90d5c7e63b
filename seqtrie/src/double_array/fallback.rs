use std::collections::VecDeque;

use super::{linear_find_base, ROOT_STATE};
use crate::automaton::{Automaton, Cursor, NavigationError};
use crate::constants::INITIAL_STATE_CAPACITY;
use crate::symbol::Symbol;
use crate::types::{BaseValue, StateIndex};

/// Incremental double-array trie with failure links, capable of
/// Aho-Corasick-style multi-match scanning.
///
/// Sequences are inserted directly into the array structure, no separate
/// builder graph exists. A colliding transition slot is resolved by
/// relocating the side with the smaller edge cardinality to a fresh
/// collision-free base.
///
/// Failure edges are caller-driven: install them with
/// [`set_fallback`](FallbackDoubleArray::set_fallback) (or the shipped
/// breadth-first [`link_fallbacks`](FallbackDoubleArray::link_fallbacks))
/// once all insertions are done. Relocation does not re-point incoming
/// failure edges, so inserting after linking leaves stale links.
#[derive(Debug)]
pub struct FallbackDoubleArray<E: Symbol, P> {
    base: Vec<BaseValue>,
    check: Vec<u32>,
    fallback: Vec<u32>,
    attachments: Vec<Option<P>>,
    alts: Vec<Vec<E>>,
}

impl<E: Symbol, P> FallbackDoubleArray<E, P> {
    /// Creates an empty trie holding only the root state.
    pub fn new() -> FallbackDoubleArray<E, P> {
        let mut da = FallbackDoubleArray {
            base: Vec::new(),
            check: Vec::new(),
            fallback: Vec::new(),
            attachments: Vec::new(),
            alts: Vec::new(),
        };
        da.ensure(ROOT_STATE);
        da.check[ROOT_STATE] = ROOT_STATE as u32;
        da.base[ROOT_STATE] = -1;
        da
    }

    /// The root state.
    #[inline(always)]
    pub fn root(&self) -> StateIndex {
        ROOT_STATE
    }

    /// Inserts one sequence, creating states on demand, and attaches the
    /// payload at its terminal state (replacing any prior attachment).
    pub fn insert(&mut self, sequence: &[E], payload: P) {
        let mut state = ROOT_STATE;
        for &symbol in sequence {
            state = self.transition_or_insert(state, symbol);
        }
        self.attachments[state] = Some(payload);
    }

    /// Target of the live transition on `symbol`, if any.
    #[inline(always)]
    pub fn next_state(&self, state: StateIndex, symbol: E) -> Option<StateIndex> {
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

    /// Sorted outgoing symbols of `state`.
    #[inline(always)]
    pub fn children(&self, state: StateIndex) -> &[E] {
        &self.alts[state]
    }

    /// Installs a failure edge from `state` to `target`.
    #[inline(always)]
    pub fn set_fallback(&mut self, state: StateIndex, target: StateIndex) {
        self.fallback[state] = target as u32;
    }

    /// Failure-edge target of `state`, if one was installed.
    #[inline(always)]
    pub fn fallback_of(&self, state: StateIndex) -> Option<StateIndex> {
        match self.fallback[state] {
            0 => None,
            target => Some(target as StateIndex),
        }
    }

    /// Payload attached at `state`.
    #[inline(always)]
    pub fn attachment(&self, state: StateIndex) -> Option<&P> {
        self.attachments[state].as_ref()
    }

    /// Computes failure edges for the whole trie, breadth-first from the
    /// root: each state falls back to the deepest proper suffix-state of
    /// its path that is also a prefix in the trie, or to the root.
    pub fn link_fallbacks(&mut self) {
        self.fallback[ROOT_STATE] = 0;
        let mut queue: VecDeque<StateIndex> = VecDeque::new();
        queue.push_back(ROOT_STATE);
        while let Some(state) = queue.pop_front() {
            for symbol in self.alts[state].clone() {
                let next = self
                    .next_state(state, symbol)
                    .expect("alternative without live slot");
                let mut down = self.fallback_of(state);
                loop {
                    match down {
                        Some(ancestor) => match self.next_state(ancestor, symbol) {
                            Some(target) => {
                                self.fallback[next] = target as u32;
                                break;
                            }
                            None => down = self.fallback_of(ancestor),
                        },
                        None => {
                            self.fallback[next] = ROOT_STATE as u32;
                            break;
                        }
                    }
                }
                queue.push_back(next);
            }
        }
    }

    /// Creates an independent scanning cursor positioned at the root.
    pub fn cursor(&self) -> FallbackCursor<'_, E, P> {
        FallbackCursor {
            automaton: self,
            state: ROOT_STATE,
            depth: 0,
        }
    }

    fn transition_or_insert(&mut self, state: StateIndex, symbol: E) -> StateIndex {
        if let Some(next) = self.next_state(state, symbol) {
            return next;
        }

        if self.base[state] < 0 {
            // first child of this state
            let base = linear_find_base(&self.check, &[symbol.key()]);
            self.base[state] = base as BaseValue;
            return self.claim(state, symbol);
        }

        let slot = self.base[state] as usize + symbol.key();
        self.ensure(slot);
        if self.check[slot] == super::FREE {
            return self.claim(state, symbol);
        }

        // collision: the slot belongs to a child of another state. Relocate
        // the side with fewer edges; the current state must be relocated
        // whenever it is itself a child of the colliding owner, since
        // moving the owner's children would move the current state's own
        // index out from under us.
        let owner = self.check[slot] as usize;
        let current_edges = self.alts[state].len() + 1;
        let owner_edges = self.alts[owner].len();
        if self.check[state] as usize == owner || current_edges <= owner_edges {
            self.relocate(state, Some(symbol));
        } else {
            self.relocate(owner, None);
        }
        self.claim(state, symbol)
    }

    /// Claims the slot `base[state] + key(symbol)` as a fresh child state.
    fn claim(&mut self, state: StateIndex, symbol: E) -> StateIndex {
        let slot = self.base[state] as usize + symbol.key();
        self.ensure(slot);
        debug_assert_eq!(self.check[slot], super::FREE);
        self.check[slot] = state as u32;
        self.base[slot] = -1;
        let position = self.alts[state]
            .binary_search(&symbol)
            .expect_err("symbol already present among alternatives");
        self.alts[state].insert(position, symbol);
        slot
    }

    /// Moves every child of `state` to a fresh collision-free base,
    /// carrying `base`/`check`/`alts`/fallback/attachment and re-pointing
    /// grandchildren. `extra` reserves room for a symbol about to be
    /// inserted.
    ///
    /// Invariant preserved: every live `check[slot]` equals its owning
    /// state, and every state's `alts` is exactly the set of symbols for
    /// which that holds.
    fn relocate(&mut self, state: StateIndex, extra: Option<E>) {
        let mut keys: Vec<usize> = self.alts[state].iter().map(|s| s.key()).collect();
        if let Some(symbol) = extra {
            keys.push(symbol.key());
        }
        let old_base = self.base[state] as usize;
        let new_base = linear_find_base(&self.check, &keys);
        log::trace!(
            "relocating state {} base {} -> {} ({} edges)",
            state,
            old_base,
            new_base,
            keys.len()
        );
        if let Some(&top) = keys.iter().max() {
            self.ensure(new_base + top);
        }

        for symbol in self.alts[state].clone() {
            let old_slot = old_base + symbol.key();
            let new_slot = new_base + symbol.key();
            self.check[new_slot] = state as u32;
            self.base[new_slot] = self.base[old_slot];
            self.fallback[new_slot] = self.fallback[old_slot];
            self.attachments[new_slot] = self.attachments[old_slot].take();
            self.alts[new_slot] = std::mem::take(&mut self.alts[old_slot]);

            // grandchildren keep their slots; only their parent pointer moves
            if self.base[new_slot] >= 0 {
                let grand_base = self.base[new_slot] as usize;
                for grand_symbol in self.alts[new_slot].clone() {
                    self.check[grand_base + grand_symbol.key()] = new_slot as u32;
                }
            }

            self.check[old_slot] = super::FREE;
            self.base[old_slot] = -1;
            self.fallback[old_slot] = 0;
        }

        self.base[state] = new_base as BaseValue;
    }

    fn ensure(&mut self, slot: usize) {
        if slot < self.base.len() {
            return;
        }
        let mut len = self.base.len().max(INITIAL_STATE_CAPACITY);
        while len <= slot {
            len *= 2;
        }
        self.base.resize(len, -1);
        self.check.resize(len, super::FREE);
        self.fallback.resize(len, 0);
        self.attachments.resize_with(len, || None);
        self.alts.resize_with(len, Vec::new);
    }
}

impl<E: Symbol, P> Default for FallbackDoubleArray<E, P> {
    fn default() -> Self {
        FallbackDoubleArray::new()
    }
}

impl<E: Symbol, P> Automaton<E, P> for FallbackDoubleArray<E, P> {
    fn find(&self, sequence: &[E]) -> Option<&P> {
        let mut state = ROOT_STATE;
        for &symbol in sequence {
            state = self.next_state(state, symbol)?;
        }
        self.attachments[state].as_ref()
    }
}

/// Scanning cursor over a [`FallbackDoubleArray`].
///
/// `accept` follows the failure chain on a miss, so feeding a haystack
/// symbol by symbol reports every pattern occurrence Aho-Corasick style.
pub struct FallbackCursor<'a, E: Symbol, P> {
    automaton: &'a FallbackDoubleArray<E, P>,
    state: StateIndex,
    depth: usize,
}

impl<'a, E: Symbol, P> FallbackCursor<'a, E, P> {
    fn probe(&self, symbol: E) -> Option<StateIndex> {
        let mut state = self.state;
        loop {
            if let Some(next) = self.automaton.next_state(state, symbol) {
                return Some(next);
            }
            state = self.automaton.fallback_of(state)?;
        }
    }

    /// Follows the transition on `symbol` or raises; the strict counterpart
    /// of [`Cursor::accept`], without fallback resolution.
    pub fn step(&mut self, symbol: E) -> Result<(), NavigationError> {
        match self.automaton.next_state(self.state, symbol) {
            Some(next) => {
                self.state = next;
                self.depth += 1;
                Ok(())
            }
            None => Err(NavigationError::no_transition(symbol, self.depth)),
        }
    }

    /// Iterates all payloads reachable at the current position via the
    /// failure chain, nearest first.
    pub fn attachments(&self) -> FallbackAttachments<'a, E, P> {
        FallbackAttachments {
            automaton: self.automaton,
            state: Some(self.state),
        }
    }
}

impl<'a, E: Symbol, P> Cursor<E> for FallbackCursor<'a, E, P> {
    #[inline(always)]
    fn reset(&mut self) {
        self.state = ROOT_STATE;
        self.depth = 0;
    }

    #[inline(always)]
    fn lookahead(&self, symbol: E) -> bool {
        self.probe(symbol).is_some()
    }

    fn accept(&mut self, symbol: E) -> bool {
        match self.probe(symbol) {
            Some(next) => {
                self.state = next;
                self.depth += 1;
                true
            }
            None => {
                self.state = ROOT_STATE;
                self.depth = 0;
                false
            }
        }
    }

    fn has_attachments(&self) -> bool {
        self.attachments().next().is_some()
    }
}

/// Single-pass iterator over the payloads on a cursor's failure chain.
pub struct FallbackAttachments<'a, E: Symbol, P> {
    automaton: &'a FallbackDoubleArray<E, P>,
    state: Option<StateIndex>,
}

impl<'a, E: Symbol, P> Iterator for FallbackAttachments<'a, E, P> {
    type Item = &'a P;

    fn next(&mut self) -> Option<&'a P> {
        while let Some(state) = self.state {
            self.state = self.automaton.fallback_of(state);
            if let Some(payload) = self.automaton.attachments[state].as_ref() {
                return Some(payload);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(entries: &[(&[u8], u32)]) -> FallbackDoubleArray<u8, u32> {
        let mut da = FallbackDoubleArray::new();
        for &(key, value) in entries {
            da.insert(key, value);
        }
        da
    }

    #[test]
    fn round_trip_and_negative_lookup() {
        let da = trie(&[(b"bachelor", 1), (b"bac", 2), (b"jar", 3), (b"badge", 4)]);
        assert_eq!(da.find(b"bachelor"), Some(&1));
        assert_eq!(da.find(b"bac"), Some(&2));
        assert_eq!(da.find(b"jar"), Some(&3));
        assert_eq!(da.find(b"badge"), Some(&4));
        assert_eq!(da.find(b"bach"), None);
        assert!(!da.contains(b"bachelors"));
        assert!(!da.contains(b"q"));
    }

    #[test]
    fn insertion_order_independence() {
        let a = trie(&[(b"bachelor", 1), (b"bac", 2)]);
        let b = trie(&[(b"bac", 2), (b"bachelor", 1)]);
        for key in [&b"bachelor"[..], b"bac", b"ba", b"bache", b""] {
            assert_eq!(a.find(key), b.find(key));
        }
    }

    #[test]
    fn collisions_relocate_without_losing_keys() {
        // dense sibling sets force base collisions and relocations
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        let mut keys: Vec<Vec<u8>> = Vec::new();
        let mut value = 0u32;
        for a in b'a'..=b'p' {
            for b in b'a'..=b'p' {
                let key = vec![a, b];
                da.insert(&key, value);
                keys.push(key);
                value += 1;
            }
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(da.find(key), Some(&(i as u32)), "key {:?} lost", key);
        }
        // interleave another round through the same states
        for a in b'a'..=b'p' {
            da.insert(&[a], 1000 + a as u32);
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(da.find(key), Some(&(i as u32)));
        }
    }

    #[test]
    fn growth_preserves_inserted_keys() {
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        let mut keys: Vec<Vec<u8>> = Vec::new();
        for i in 0u32..3000 {
            let key = i.to_be_bytes().to_vec();
            da.insert(&key, i);
            keys.push(key);
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(da.find(key), Some(&(i as u32)));
        }
    }

    #[test]
    fn aho_corasick_scan() {
        let mut da: FallbackDoubleArray<u8, char> = FallbackDoubleArray::new();
        da.insert(b"gat", 'G');
        da.insert(b"cgatggg", 'C');
        da.link_fallbacks();

        let mut cursor = da.cursor();
        let mut seen: Vec<(usize, Vec<char>)> = Vec::new();
        for (i, &sym) in b"cgatggg".iter().enumerate() {
            assert!(cursor.accept(sym));
            if cursor.has_attachments() {
                seen.push((i, cursor.attachments().copied().collect()));
            }
        }
        assert_eq!(seen, vec![(3, vec!['G']), (6, vec!['C'])]);
    }

    #[test]
    fn scan_resets_to_root_when_chain_exhausts() {
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        da.insert(b"ab", 1);
        da.link_fallbacks();
        let mut cursor = da.cursor();
        assert!(cursor.accept(b'a'));
        assert!(!cursor.accept(b'q'));
        // cursor is back at the root and scanning continues
        assert!(cursor.accept(b'a'));
        assert!(cursor.accept(b'b'));
        assert_eq!(cursor.attachments().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn overlapping_patterns_report_through_chain() {
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        da.insert(b"he", 1);
        da.insert(b"she", 2);
        da.insert(b"hers", 3);
        da.link_fallbacks();

        let mut cursor = da.cursor();
        let mut matches: Vec<u32> = Vec::new();
        for &sym in b"ushers" {
            cursor.accept(sym);
            matches.extend(cursor.attachments().copied());
        }
        assert_eq!(matches, vec![2, 1, 3]);
    }

    #[test]
    fn caller_driven_fallback_installation() {
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        da.insert(b"ab", 1);
        da.insert(b"b", 2);
        let a = da.next_state(da.root(), b'a').unwrap();
        let ab = da.next_state(a, b'b').unwrap();
        let b = da.next_state(da.root(), b'b').unwrap();
        da.set_fallback(a, da.root());
        da.set_fallback(ab, b);
        da.set_fallback(b, da.root());
        assert_eq!(da.fallback_of(ab), Some(b));

        let mut cursor = da.cursor();
        assert!(cursor.accept(b'a'));
        assert!(cursor.accept(b'b'));
        let seen: Vec<u32> = cursor.attachments().copied().collect();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn strict_step_raises_on_missing_transition() {
        let mut da: FallbackDoubleArray<u8, u32> = FallbackDoubleArray::new();
        da.insert(b"ab", 1);
        let mut cursor = da.cursor();
        cursor.step(b'a').unwrap();
        assert!(cursor.step(b'z').is_err());
    }
}
