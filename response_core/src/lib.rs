//! # Response Core (The Graphmaster)
//!
//! The decision core of a rule-based conversational agent. Given a user
//! utterance plus conversational context (previous bot utterance, active
//! topic), the core retrieves the single best-matching response template
//! from an ordered trie and recursively evaluates it into literal output
//! text, consulting per-user history and possibly re-entering the matcher
//! through symbolic reduction.
//!
//! ## Core Components
//!
//! - **normalize**: canonical token form shared by authored rules and live
//!   utterances
//! - **graph**: the graphmaster trie - path building, insertion, and
//!   ordered wildcard matching
//! - **template**: the markup tree and the tag-dispatching evaluator
//! - **engine**: the top-level `respond` pipeline and rule loading
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: literal > one-word wildcard > many-word wildcard at
//!   every trie node; the first terminal found under that order is *the*
//!   match, with no candidate scoring
//! - **Recoverable**: evaluation-time problems are diagnostics, never
//!   failures - a malformed tag contributes empty text and the rest of the
//!   template still renders
//! - **Swap, don't mutate**: the active trie is read-only; reloads build a
//!   fresh trie and swap it in atomically under in-flight queries

pub mod engine;
pub mod error;
pub mod graph;
pub mod history;
pub mod normalize;
pub mod template;

pub use engine::*;
pub use error::*;
pub use graph::*;
pub use history::*;
pub use normalize::*;
pub use template::*;
