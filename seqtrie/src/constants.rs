/// Largest slot count an array-representation node may use for byte symbols.
pub const BYTE_ARRAY_NODE_LIMIT: usize = 256;

/// Largest slot count an array-representation node may use for char symbols.
pub const CHAR_ARRAY_NODE_LIMIT: usize = 128;

/// Initial length of the parallel arrays in a double-array automaton.
pub const INITIAL_STATE_CAPACITY: usize = 1024;

/// Minimum number of rejected base candidates before the free-base search
/// cursor of the compact trie is considered for fast-forwarding.
pub const FAST_FORWARD_WINDOW: usize = 64;

/// Blocked-to-scanned ratio above which the free-base search cursor of the
/// compact trie fast-forwards past the scanned range.
pub const BLOCKED_RATIO_LIMIT: f32 = 0.95;
