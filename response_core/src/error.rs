//! Error and diagnostic types for the response core.
//!
//! Load-time problems are real errors: the offending rule is skipped and
//! the caller decides whether to keep going. Evaluation-time problems are
//! diagnostics: they are reported, the offending tag contributes empty
//! text, and the rest of the template carries on. No evaluation-time
//! condition ever aborts a `respond` call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::MarkupError;

/// A rule that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("rule from {provenance} is missing a pattern")]
    MissingPattern { provenance: String },

    #[error("rule from {provenance} is missing a template")]
    MissingTemplate { provenance: String },

    #[error("rule from {provenance} has an empty pattern after normalization")]
    EmptyPattern { provenance: String },

    #[error("rule from {provenance} has malformed template markup: {source}")]
    MalformedTemplate {
        provenance: String,
        #[source]
        source: MarkupError,
    },
}

/// A recoverable problem reported during template evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A tag carried a malformed attribute value.
    #[error("tag <{tag}> has a malformed `{attribute}` attribute: `{value}`")]
    TagError {
        tag: String,
        attribute: String,
        value: String,
    },

    /// A tag referenced a wildcard capture that was never made.
    #[error("tag <{tag}> referenced capture {ordinal} but the match produced {available}")]
    CaptureRange {
        tag: String,
        ordinal: usize,
        available: usize,
    },

    /// A tag referenced a turn or sentence beyond recorded history.
    #[error("tag <{tag}> referenced history out of range (turn {turn}, sentence {sentence})")]
    HistoryRange {
        tag: String,
        turn: usize,
        sentence: usize,
    },

    /// Symbolic reduction recursed past the configured depth limit.
    #[error("symbolic reduction exceeded the depth limit of {limit}")]
    RecursionLimit { limit: u32 },

    /// The per-evaluation deadline expired; output is partial.
    #[error("evaluation deadline expired after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
