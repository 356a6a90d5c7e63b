use thiserror::Error;

use crate::symbol::Symbol;

/// Error raised by the strict `navigator()` surface when asked to follow a
/// transition that does not exist at the current state.
///
/// The relaxed cursor surface never raises this; `accept` returning `false`
/// is the normal way to express "no match from here".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The current state has no transition on the requested symbol.
    #[error("no transition on {symbol} at depth {depth}")]
    NoTransition {
        /// Debug rendering of the symbol that could not be followed.
        symbol: String,
        /// Number of symbols successfully followed before the failure.
        depth: usize,
    },
}

impl NavigationError {
    pub(crate) fn no_transition<E: Symbol>(symbol: E, depth: usize) -> NavigationError {
        NavigationError::NoTransition {
            symbol: format!("{:?}", symbol),
            depth,
        }
    }
}

/// Whole-sequence query surface shared by every automaton variant.
pub trait Automaton<E: Symbol, P> {
    /// Looks up the payload attached to exactly `sequence`, walking from the
    /// root.
    fn find(&self, sequence: &[E]) -> Option<&P>;

    /// Whether `sequence` was inserted with a payload. Strict prefixes of
    /// inserted sequences that were not themselves inserted report `false`.
    #[inline(always)]
    fn contains(&self, sequence: &[E]) -> bool {
        self.find(sequence).is_some()
    }
}

/// Stateful symbol-by-symbol query cursor.
///
/// Cursors are independent of one another; any number may be created from
/// the same automaton. A cursor borrows its automaton, so the automaton
/// cannot be structurally modified while the cursor is live.
pub trait Cursor<E: Symbol> {
    /// Returns the cursor to the root state.
    fn reset(&mut self);

    /// Peeks whether `accept(symbol)` would succeed, without consuming.
    fn lookahead(&self, symbol: E) -> bool;

    /// Consumes one symbol. Follows the fallback chain where one exists;
    /// when no transition can be found at all, resets to the root and
    /// reports `false`.
    fn accept(&mut self, symbol: E) -> bool;

    /// Whether any payload is reachable at the current position via the
    /// fallback chain.
    fn has_attachments(&self) -> bool;
}
