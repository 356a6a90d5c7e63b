/// Index of a state in a double-array automaton. State `0` is never a valid
/// state (a `check` of `0` marks a free slot); state `1` is the root.
pub(crate) type StateIndex = usize;

/// Value stored in a `base` array. Negative values mark terminal or
/// tail-bearing states.
pub(crate) type BaseValue = i32;
