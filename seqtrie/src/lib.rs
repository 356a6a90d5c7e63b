/*! Finite-state automata over sequences of bytes or characters.

Each path through an automaton ends at a state that may carry an attached
payload, the substrate for dictionary and multi-pattern matching: prefix
lookup, whole-sequence lookup, and Aho-Corasick-style scanning through
failure ("fallback") links.

Two cooperating families are provided:

- a generic construction pipeline: sequences are inserted into a mutable
  node graph through a [`Builder`](graph::Builder), optionally rewritten by
  worklist [`Task`](graph::Task)s such as the failure-link pass, and
  compiled in two passes into an immutable
  [`CompiledAutomaton`](graph::CompiledAutomaton) whose nodes each use the
  cheapest fitting representation;
- double-array encodings of the same automata: a static, tail-compressed
  [`CompactDoubleArray`](double_array::CompactDoubleArray) built from a
  finished node graph, and an incrementally built
  [`FallbackDoubleArray`](double_array::FallbackDoubleArray) with live
  collision remapping and failure links.

Both families answer the same query surface: [`Automaton`] for
whole-sequence lookup, [`Cursor`] for symbol-by-symbol probing, and a
strict navigator that raises [`NavigationError`] instead of silently
resetting.

All structures are single-threaded during construction; compiled automata
are never mutated after construction and may be queried from any number of
cursors concurrently.

# Usage example

```
use seqtrie::graph::Builder;
use seqtrie::{Automaton, Cursor};

let mut builder: Builder<u8, u32> = Builder::new();
builder.extend(b"gat", Some(1)).extend(b"cgatggg", Some(2));
let automaton = builder.build_with_fallback();

assert!(automaton.contains(b"gat"));

let mut cursor = automaton.cursor();
for &sym in b"cgat" {
    cursor.accept(sym);
}
assert!(cursor.has_attachments());
```
*/

#![warn(missing_docs)]

pub mod automaton;
pub mod double_array;
pub mod graph;
pub mod symbol;

pub(crate) mod constants;
pub(crate) mod types;

pub use automaton::{Automaton, Cursor, NavigationError};
pub use symbol::Symbol;
