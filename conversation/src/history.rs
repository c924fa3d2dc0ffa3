//! Conversation history - the append-only per-user log of turns.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::turn::ConversationTurn;
use crate::UserId;

/// Append-only storage of past turns, addressable per user by offset from
/// the most recent turn.
///
/// All methods take `&self`: implementations are expected to use interior
/// locking so the store can be shared across user sessions. Serializing
/// concurrent turns for the *same* user is the caller's responsibility.
pub trait ConversationHistory: Send + Sync {
    /// The most recent turn for the user, if any.
    fn last(&self, user: UserId) -> Option<ConversationTurn>;

    /// The turn `offset` steps back from the most recent (0 = most recent).
    fn nth_back(&self, user: UserId, offset: usize) -> Option<ConversationTurn>;

    /// Number of turns stored for the user.
    fn count(&self, user: UserId) -> usize;

    /// Append a finished turn for the user.
    fn append(&self, user: UserId, turn: ConversationTurn);
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    turns: RwLock<HashMap<UserId, Vec<ConversationTurn>>>,
}

impl InMemoryHistory {
    /// Create a new empty history store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationHistory for InMemoryHistory {
    fn last(&self, user: UserId) -> Option<ConversationTurn> {
        self.nth_back(user, 0)
    }

    fn nth_back(&self, user: UserId, offset: usize) -> Option<ConversationTurn> {
        let turns = self.turns.read().expect("history lock poisoned");
        let user_turns = turns.get(&user)?;
        if offset >= user_turns.len() {
            return None;
        }
        user_turns.get(user_turns.len() - 1 - offset).cloned()
    }

    fn count(&self, user: UserId) -> usize {
        let turns = self.turns.read().expect("history lock poisoned");
        turns.get(&user).map(Vec::len).unwrap_or(0)
    }

    fn append(&self, user: UserId, turn: ConversationTurn) {
        let mut turns = self.turns.write().expect("history lock poisoned");
        turns.entry(user).or_default().push(turn);
    }
}
