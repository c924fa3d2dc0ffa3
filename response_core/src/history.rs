//! History indexing - the adapter between backward-looking template tags
//! and the append-only conversation log.
//!
//! Tags address history 1-based ("the second-to-last turn, first
//! sentence"); this adapter works 0-based from the most recent turn and
//! leaves the 1-based translation to the tag layer.

use conversation::{ConversationHistory, UserId};

use crate::normalize::MANY_WORD_WILDCARD;

/// Read-only view over one user's slice of the conversation log.
pub struct HistoryIndex<'a> {
    history: &'a dyn ConversationHistory,
    user: UserId,
}

impl<'a> HistoryIndex<'a> {
    /// Create an index over one user's history.
    pub fn new(history: &'a dyn ConversationHistory, user: UserId) -> Self {
        Self { history, user }
    }

    /// Number of recorded turns for this user.
    pub fn turn_count(&self) -> usize {
        self.history.count(self.user)
    }

    /// A sentence of what the bot said, `turns_back` turns ago (0 = most
    /// recent). `None` when either offset is out of range.
    pub fn that_sentence(&self, turns_back: usize, sentence: usize) -> Option<String> {
        self.history
            .nth_back(self.user, turns_back)?
            .output_sentence(sentence)
            .map(str::to_string)
    }

    /// A sentence of what the user said, `turns_back` turns ago (0 = most
    /// recent). `None` when either offset is out of range.
    pub fn input_sentence(&self, turns_back: usize, sentence: usize) -> Option<String> {
        self.history
            .nth_back(self.user, turns_back)?
            .input_sentence(sentence)
            .map(str::to_string)
    }

    /// The first sentence of the most recent bot output, or the universal
    /// wildcard when the user has no history yet.
    pub fn latest_that(&self) -> String {
        self.that_sentence(0, 0)
            .unwrap_or_else(|| MANY_WORD_WILDCARD.to_string())
    }

    /// The full raw output of the most recent turn, or the universal
    /// wildcard when the user has no history yet. This feeds the
    /// that-context of the match path, so "no prior utterance" matches
    /// any authored that-pattern.
    pub fn last_output(&self) -> String {
        match self.history.last(self.user) {
            Some(turn) if !turn.output_sentences.is_empty() => turn.raw_output(),
            _ => MANY_WORD_WILDCARD.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversation::{ConversationTurn, InMemoryHistory};

    fn seeded() -> (InMemoryHistory, UserId) {
        let history = InMemoryHistory::new();
        let user = UserId::new();
        history.append(
            user,
            ConversationTurn::new(["WHAT IS YOUR NAME"], ["I am Reni.", "Who are you?"]),
        );
        history.append(
            user,
            ConversationTurn::new(["I AM ALICE", "NICE TO MEET YOU"], ["Hello Alice."]),
        );
        (history, user)
    }

    #[test]
    fn test_that_sentence() {
        let (history, user) = seeded();
        let index = HistoryIndex::new(&history, user);

        assert_eq!(index.that_sentence(0, 0), Some("Hello Alice.".to_string()));
        assert_eq!(index.that_sentence(1, 1), Some("Who are you?".to_string()));
        assert_eq!(index.that_sentence(1, 2), None);
        assert_eq!(index.that_sentence(2, 0), None);
    }

    #[test]
    fn test_input_sentence() {
        let (history, user) = seeded();
        let index = HistoryIndex::new(&history, user);

        assert_eq!(index.input_sentence(0, 1), Some("NICE TO MEET YOU".to_string()));
        assert_eq!(
            index.input_sentence(1, 0),
            Some("WHAT IS YOUR NAME".to_string())
        );
        assert_eq!(index.input_sentence(0, 5), None);
    }

    #[test]
    fn test_last_output() {
        let (history, user) = seeded();
        let index = HistoryIndex::new(&history, user);
        assert_eq!(index.last_output(), "Hello Alice.");
    }

    #[test]
    fn test_latest_that_is_first_sentence() {
        let history = InMemoryHistory::new();
        let user = UserId::new();
        history.append(
            user,
            ConversationTurn::new(["HI"], ["First sentence.", "Second sentence."]),
        );

        let index = HistoryIndex::new(&history, user);
        assert_eq!(index.latest_that(), "First sentence.");
        assert_eq!(index.last_output(), "First sentence. Second sentence.");
    }

    #[test]
    fn test_empty_history_defaults_to_wildcard() {
        let history = InMemoryHistory::new();
        let user = UserId::new();
        let index = HistoryIndex::new(&history, user);

        assert_eq!(index.last_output(), "*");
        assert_eq!(index.latest_that(), "*");
        assert_eq!(index.turn_count(), 0);
        assert_eq!(index.that_sentence(0, 0), None);
    }
}
