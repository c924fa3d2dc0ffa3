//! Normalization - mapping raw text to the canonical token form used on
//! both sides of the graphmaster.
//!
//! Normalization runs in a fixed order:
//! 1. **Substitution**: one-pass longest-match phrase substitution over a
//!    configurable dictionary
//! 2. **Splitting**: whitespace tokenization
//! 3. **Cleanup**: per-word punctuation stripping and case folding
//!
//! Authored rules and live utterances go through the same pipeline, which
//! is what makes matching case- and punctuation-insensitive by
//! construction. The only difference is the mode: authoring-time
//! normalization lets the two reserved wildcard words through untouched.

mod stripper;
mod substitutions;

pub use stripper::*;
pub use substitutions::*;

/// The one-word wildcard token.
pub const ONE_WORD_WILDCARD: &str = "_";

/// The many-word wildcard token.
pub const MANY_WORD_WILDCARD: &str = "*";

/// Whether a word is one of the two reserved wildcard tokens.
pub fn is_wildcard(word: &str) -> bool {
    word == ONE_WORD_WILDCARD || word == MANY_WORD_WILDCARD
}

/// Distinguishes authoring-time canonicalization from run-time
/// canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Canonicalizing an authored rule: `*` and `_` pass through unchanged.
    Authoring,
    /// Canonicalizing a live utterance: everything is stripped.
    Runtime,
}

/// Pure text-to-canonical-tokens transform.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    substitutions: Substitutions,
}

impl Normalizer {
    /// Create a normalizer with the given substitution dictionary.
    pub fn new(substitutions: Substitutions) -> Self {
        Self { substitutions }
    }

    /// Normalize text into the canonical single-spaced token form.
    ///
    /// Malformed or empty input yields the empty string, never a failure.
    pub fn normalize(&self, text: &str, mode: NormalizeMode) -> String {
        let substituted = self.substitutions.apply(text);

        let mut words = Vec::new();
        for word in substituted.split_whitespace() {
            let cleaned = if mode == NormalizeMode::Authoring && is_wildcard(word) {
                word.to_string()
            } else {
                strip_illegal_characters(word)
            };
            if !cleaned.is_empty() {
                words.push(cleaned);
            }
        }

        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_normalization() {
        let normalizer = Normalizer::default();
        assert_eq!(
            normalizer.normalize("Hello,   world!", NormalizeMode::Runtime),
            "HELLO WORLD"
        );
    }

    #[test]
    fn test_runtime_strips_wildcards() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("* _ hi", NormalizeMode::Runtime), "HI");
    }

    #[test]
    fn test_authoring_preserves_wildcards() {
        let normalizer = Normalizer::default();
        assert_eq!(
            normalizer.normalize("HELLO * FRIEND _", NormalizeMode::Authoring),
            "HELLO * FRIEND _"
        );
    }

    #[test]
    fn test_empty_and_junk_input() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize("", NormalizeMode::Runtime), "");
        assert_eq!(normalizer.normalize("?!...", NormalizeMode::Runtime), "");
        assert_eq!(normalizer.normalize("   \t\n ", NormalizeMode::Runtime), "");
    }

    #[test]
    fn test_substitution_runs_before_cleanup() {
        let substitutions = Substitutions::empty().with("can't", "can not");
        let normalizer = Normalizer::new(substitutions);

        assert_eq!(
            normalizer.normalize("I can't swim.", NormalizeMode::Runtime),
            "I CAN NOT SWIM"
        );
    }
}
