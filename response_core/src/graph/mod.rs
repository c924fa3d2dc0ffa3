//! Graphmaster module - the pattern-matching index.
//!
//! The graphmaster is an ordered trie keyed by canonical match-key tokens:
//! - **PathBuilder**: combines pattern, that-context, and topic into one key
//! - **Node / Graphmaster**: the trie itself, with ordered wildcard matching
//! - **MatchCapture**: the substrings consumed by wildcards during a lookup

mod node;
mod path;

pub use node::*;
pub use path::*;
