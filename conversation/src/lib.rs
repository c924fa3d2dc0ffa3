//! # Conversation
//!
//! The conversational-state crate - users, turns, history, predicates, and
//! bot settings. This crate is the single source of truth for per-user
//! conversation state and does not contain any matching or template logic.

pub mod history;
pub mod predicates;
pub mod settings;
pub mod turn;

pub use history::*;
pub use predicates::*;
pub use settings::*;
pub use turn::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user conversing with the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a user ID from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a nil/empty user ID (useful for defaults).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
