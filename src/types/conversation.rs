use serde::Serialize;

use crate::types::{ChatTurn, Role};

/// An ordered, append-only sequence of chat turns.
///
/// Insertion order is chronological order.  Turns are never edited once pushed; the only way
/// to get rid of them is [`Conversation::clear`], which drops everything after the seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
    #[serde(skip)]
    seed_len: usize,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation seeded with one system turn.
    ///
    /// An empty system prompt yields an empty conversation.
    pub fn with_system(system: impl Into<String>) -> Self {
        let system = system.into();
        if system.trim().is_empty() {
            return Self::new();
        }
        Self {
            turns: vec![ChatTurn::system(system)],
            seed_len: 1,
        }
    }

    /// Append a single turn.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Record one completed exchange: the user's input, then the assistant's full answer.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(ChatTurn::user(user));
        self.turns.push(ChatTurn::assistant(assistant));
    }

    /// Return a copy of this conversation with one more user turn on the end.
    ///
    /// This is what gets sent for the next request; `self` is only extended once the
    /// exchange completes.
    pub fn with_user(&self, input: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(ChatTurn::user(input));
        next
    }

    /// Drop every turn after the seed.
    pub fn clear(&mut self) {
        self.turns.truncate(self.seed_len);
    }

    /// The turns in chronological order.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The system turns of this conversation.
    pub fn system_turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter().filter(|t| t.role() == Role::System)
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when there are no turns at all.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<ChatTurn>> for Conversation {
    fn from(turns: Vec<ChatTurn>) -> Self {
        Self { turns, seed_len: 0 }
    }
}
