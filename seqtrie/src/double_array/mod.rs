/*! Double-array encodings of sequence automata.

An automaton state is an index into parallel `base`/`check` arrays giving
O(1) transition lookup: the child of `state` on `symbol` sits at slot
`base[state] + symbol.key()`, valid iff `check[slot] == state`. State `0`
is never valid (a `check` of `0` marks a free slot); state `1` is the
root. A negative `base` marks a terminal or tail-bearing state.

Two variants share this layout: [`CompactDoubleArray`], built statically
from a finished node graph with tail compression, and
[`FallbackDoubleArray`], built by direct incremental insertion with live
collision remapping and Aho-Corasick failure links.
*/

pub mod compact;
pub mod fallback;

pub use self::compact::{CompactCursor, CompactDoubleArray, CompactNavigator};
pub use self::fallback::{FallbackCursor, FallbackDoubleArray};

use crate::types::StateIndex;

/// The root state of every double-array automaton.
pub(crate) const ROOT_STATE: StateIndex = 1;

/// `check` value marking a free slot.
pub(crate) const FREE: u32 = 0;

/// Whether every slot `base + key` is currently free. Slots beyond the end
/// of `check` count as free; the caller grows the arrays before claiming.
#[inline(always)]
pub(crate) fn fits(check: &[u32], base: usize, keys: &[usize]) -> bool {
    keys.iter()
        .all(|&key| check.get(base + key).map_or(true, |&c| c == FREE))
}

/// Unbounded linear free-base scan from the low end of the array. Worst
/// case O(n), acceptable for the incremental variant because collisions
/// trigger relocation rather than repeated full rescans.
pub(crate) fn linear_find_base(check: &[u32], keys: &[usize]) -> usize {
    debug_assert!(!keys.is_empty());
    let mut base = 1;
    while !fits(check, base, keys) {
        base += 1;
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_treats_out_of_range_as_free() {
        let check = vec![0u32, 1, 0, 2];
        assert!(fits(&check, 0, &[2]));
        assert!(!fits(&check, 0, &[1]));
        assert!(fits(&check, 2, &[5, 9]));
    }

    #[test]
    fn linear_scan_finds_smallest_base() {
        // slots 1, 2 and 4 taken
        let check = vec![0u32, 7, 7, 0, 7, 0, 0];
        assert_eq!(linear_find_base(&check, &[1]), 2); // 2+1 = 3 free
        assert_eq!(linear_find_base(&check, &[1, 2]), 4); // 5 and 6 free
    }
}
