//! Conversation turns - one input/output exchange between a user and the bot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    /// Create a new random turn ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One completed exchange: what the user said and what the bot answered,
/// broken into sentences, in order.
///
/// Turns are append-only. Once stored in history they are referenced,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,

    /// The user's input, split into sentences.
    pub input_sentences: Vec<String>,

    /// The bot's output, split into sentences.
    pub output_sentences: Vec<String>,

    /// When this turn completed.
    pub timestamp: DateTime<Utc>,

    /// How long the turn took to evaluate.
    pub duration_ms: u64,

    /// Whether evaluation ran out of time and returned partial output.
    pub timed_out: bool,
}

impl ConversationTurn {
    /// Create a new turn with the given input and output sentences.
    pub fn new(
        input_sentences: impl IntoIterator<Item = impl Into<String>>,
        output_sentences: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: TurnId::new(),
            input_sentences: input_sentences.into_iter().map(Into::into).collect(),
            output_sentences: output_sentences.into_iter().map(Into::into).collect(),
            timestamp: Utc::now(),
            duration_ms: 0,
            timed_out: false,
        }
    }

    /// Set the evaluation duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Mark the turn as having timed out.
    pub fn with_timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    /// Get an input sentence by 0-based offset.
    pub fn input_sentence(&self, index: usize) -> Option<&str> {
        self.input_sentences.get(index).map(String::as_str)
    }

    /// Get an output sentence by 0-based offset.
    pub fn output_sentence(&self, index: usize) -> Option<&str> {
        self.output_sentences.get(index).map(String::as_str)
    }

    /// The full bot output of this turn, sentences re-joined.
    pub fn raw_output(&self) -> String {
        self.output_sentences.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ConversationTurn::new(["HELLO THERE"], ["Hi!", "How are you?"]);

        assert_eq!(turn.input_sentences.len(), 1);
        assert_eq!(turn.output_sentences.len(), 2);
        assert_eq!(turn.duration_ms, 0);
        assert!(!turn.timed_out);
    }

    #[test]
    fn test_sentence_accessors() {
        let turn = ConversationTurn::new(["FIRST", "SECOND"], ["One.", "Two."]);

        assert_eq!(turn.input_sentence(0), Some("FIRST"));
        assert_eq!(turn.input_sentence(1), Some("SECOND"));
        assert_eq!(turn.input_sentence(2), None);
        assert_eq!(turn.output_sentence(1), Some("Two."));
        assert_eq!(turn.output_sentence(5), None);
    }

    #[test]
    fn test_raw_output() {
        let turn = ConversationTurn::new(["HI"], ["Hello.", "Nice day."]);
        assert_eq!(turn.raw_output(), "Hello. Nice day.");
    }

    #[test]
    fn test_turn_builder() {
        let turn = ConversationTurn::new(["HI"], ["Hello."])
            .with_duration_ms(42)
            .with_timed_out(true);

        assert_eq!(turn.duration_ms, 42);
        assert!(turn.timed_out);
    }

    #[test]
    fn test_turn_serde_round_trip() {
        let turn = ConversationTurn::new(["HI"], ["Hello."]).with_duration_ms(7);

        let json = serde_json::to_string(&turn).unwrap();
        let back: ConversationTurn = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, turn.id);
        assert_eq!(back.input_sentences, turn.input_sentences);
        assert_eq!(back.output_sentences, turn.output_sentences);
        assert_eq!(back.duration_ms, 7);
    }
}
