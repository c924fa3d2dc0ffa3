//! Per-user predicates - named values set and read during template evaluation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::UserId;

/// The value returned for any predicate that has never been set.
///
/// `"*"` doubles as the universal wildcard, so an unset `topic` predicate
/// naturally matches every topic segment in the graphmaster.
pub const UNSET_PREDICATE: &str = "*";

/// The predicate naming the user's active conversational topic.
pub const TOPIC_PREDICATE: &str = "topic";

/// Mutable per-user name→value store.
///
/// Reads of unset names return [`UNSET_PREDICATE`] rather than failing.
pub trait PredicateStore: Send + Sync {
    /// Get the value of a named predicate, or `"*"` if unset.
    fn get(&self, user: UserId, name: &str) -> String;

    /// Set a named predicate for the user.
    fn set(&self, user: UserId, name: &str, value: &str);

    /// The user's active topic (the `topic` predicate).
    fn topic(&self, user: UserId) -> String {
        self.get(user, TOPIC_PREDICATE)
    }
}

/// In-memory predicate store.
#[derive(Debug, Default)]
pub struct InMemoryPredicates {
    values: RwLock<HashMap<UserId, HashMap<String, String>>>,
}

impl InMemoryPredicates {
    /// Create a new empty predicate store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredicateStore for InMemoryPredicates {
    fn get(&self, user: UserId, name: &str) -> String {
        let values = self.values.read().expect("predicate lock poisoned");
        values
            .get(&user)
            .and_then(|user_values| user_values.get(name))
            .cloned()
            .unwrap_or_else(|| UNSET_PREDICATE.to_string())
    }

    fn set(&self, user: UserId, name: &str, value: &str) {
        let mut values = self.values.write().expect("predicate lock poisoned");
        values
            .entry(user)
            .or_default()
            .insert(name.to_string(), value.to_string());
    }
}
