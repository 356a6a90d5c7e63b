use std::fmt;
use std::hash::Hash;

use crate::constants::{BYTE_ARRAY_NODE_LIMIT, CHAR_ARRAY_NODE_LIMIT};

/// One element of the sequence alphabet: a raw byte or a fixed-width
/// character.
///
/// Every symbol has a small injective `key` into a dense integer range
/// starting at 1. Key `0` is reserved: in the double-array encoding a
/// `check` of `0` marks a free slot, and a key of `0` would alias a state's
/// own base slot.
pub trait Symbol: Copy + Ord + Hash + fmt::Debug {
    /// Maximum slot count an array-representation compiled node may grow to
    /// before the map representation is used instead.
    const ARRAY_NODE_LIMIT: usize;

    /// Dense array-indexing key, always `>= 1`.
    fn key(self) -> usize;

    /// Raw value used for masked array-node addressing.
    fn index(self) -> u32;
}

impl Symbol for u8 {
    const ARRAY_NODE_LIMIT: usize = BYTE_ARRAY_NODE_LIMIT;

    #[inline(always)]
    fn key(self) -> usize {
        self as usize + 1
    }

    #[inline(always)]
    fn index(self) -> u32 {
        self as u32
    }
}

impl Symbol for char {
    const ARRAY_NODE_LIMIT: usize = CHAR_ARRAY_NODE_LIMIT;

    #[inline(always)]
    fn key(self) -> usize {
        self as usize + 1
    }

    #[inline(always)]
    fn index(self) -> u32 {
        self as u32
    }
}
