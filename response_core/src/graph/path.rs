//! Path building - combining the three match dimensions into one key.

use crate::normalize::{NormalizeMode, Normalizer, MANY_WORD_WILDCARD};

/// Separator token between the pattern segment and the that segment.
///
/// Normalized text can never contain angle brackets, so the separators are
/// guaranteed absent from both sides of a match.
pub const THAT_MARKER: &str = "<that>";

/// Separator token between the that segment and the topic segment.
pub const TOPIC_MARKER: &str = "<topic>";

/// Whether a token is one of the two segment separators.
pub fn is_separator(token: &str) -> bool {
    token == THAT_MARKER || token == TOPIC_MARKER
}

/// Builds canonical match keys from the three match dimensions.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    /// That-contexts longer than this many tokens are replaced wholesale by
    /// the full wildcard, bounding index fan-out from verbose prior
    /// utterances.
    pub max_that_tokens: usize,

    /// Skip normalization of authored rules and only trim them. For rule
    /// sets known to be pre-canonicalized.
    pub trust_authored: bool,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self {
            max_that_tokens: 32,
            trust_authored: false,
        }
    }
}

impl PathBuilder {
    /// Combine pattern, that-context, and topic into a canonical match key.
    ///
    /// Empty that-context or topic segments become the full wildcard. An
    /// empty pattern after normalization yields `None`: the caller skips
    /// the rule (or the input sentence) rather than inserting or matching
    /// an ill-formed key.
    pub fn build(
        &self,
        normalizer: &Normalizer,
        pattern: &str,
        that: &str,
        topic: &str,
        mode: NormalizeMode,
    ) -> Option<String> {
        let (pattern, mut that, mut topic) = if self.trust_authored && mode == NormalizeMode::Authoring
        {
            (
                pattern.trim().to_string(),
                that.trim().to_string(),
                topic.trim().to_string(),
            )
        } else {
            (
                normalizer.normalize(pattern, mode),
                normalizer.normalize(that, mode),
                normalizer.normalize(topic, mode),
            )
        };

        if pattern.is_empty() {
            return None;
        }
        if that.is_empty() {
            that = MANY_WORD_WILDCARD.to_string();
        }
        if topic.is_empty() {
            topic = MANY_WORD_WILDCARD.to_string();
        }
        if that.split_whitespace().count() > self.max_that_tokens {
            that = MANY_WORD_WILDCARD.to_string();
        }

        Some(format!(
            "{} {} {} {} {}",
            pattern, THAT_MARKER, that, TOPIC_MARKER, topic
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> (PathBuilder, Normalizer) {
        (PathBuilder::default(), Normalizer::default())
    }

    #[test]
    fn test_basic_key() {
        let (path, normalizer) = builder();
        let key = path
            .build(&normalizer, "Hello world", "", "", NormalizeMode::Runtime)
            .unwrap();
        assert_eq!(key, "HELLO WORLD <that> * <topic> *");
    }

    #[test]
    fn test_authoring_keeps_wildcards() {
        let (path, normalizer) = builder();
        let key = path
            .build(&normalizer, "HELLO *", "HOW ARE YOU", "*", NormalizeMode::Authoring)
            .unwrap();
        assert_eq!(key, "HELLO * <that> HOW ARE YOU <topic> *");
    }

    #[test]
    fn test_empty_pattern_yields_none() {
        let (path, normalizer) = builder();
        assert!(path
            .build(&normalizer, "", "x", "y", NormalizeMode::Runtime)
            .is_none());
        assert!(path
            .build(&normalizer, "?!.", "x", "y", NormalizeMode::Runtime)
            .is_none());
    }

    #[test]
    fn test_overlong_that_becomes_wildcard() {
        let (mut path, normalizer) = builder();
        path.max_that_tokens = 3;

        let key = path
            .build(
                &normalizer,
                "HI",
                "one two three four",
                "",
                NormalizeMode::Runtime,
            )
            .unwrap();
        assert_eq!(key, "HI <that> * <topic> *");

        let key = path
            .build(&normalizer, "HI", "one two three", "", NormalizeMode::Runtime)
            .unwrap();
        assert_eq!(key, "HI <that> ONE TWO THREE <topic> *");
    }

    #[test]
    fn test_trust_authored_skips_normalization() {
        let (mut path, normalizer) = builder();
        path.trust_authored = true;

        let key = path
            .build(
                &normalizer,
                "  ALREADY CLEAN  ",
                "PRIOR",
                "TOPIC",
                NormalizeMode::Authoring,
            )
            .unwrap();
        assert_eq!(key, "ALREADY CLEAN <that> PRIOR <topic> TOPIC");
    }

    #[test]
    fn test_runtime_never_trusts_input() {
        let (mut path, normalizer) = builder();
        path.trust_authored = true;

        let key = path
            .build(&normalizer, "hello!", "", "", NormalizeMode::Runtime)
            .unwrap();
        assert_eq!(key, "HELLO <that> * <topic> *");
    }

    #[test]
    fn test_separators_cannot_be_injected() {
        let (path, normalizer) = builder();
        // A hostile utterance containing separator-like text is stripped to
        // plain words before the key is assembled.
        let key = path
            .build(&normalizer, "x <that> y", "", "", NormalizeMode::Runtime)
            .unwrap();
        assert_eq!(key, "X THAT Y <that> * <topic> *");
    }
}
