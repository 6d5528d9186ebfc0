// Conversation history for chat sessions

use serde::{Deserialize, Serialize};

/// Turns kept per session; older turns are dropped first
pub const MAX_STORED_TURNS: usize = 200;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation log for one session
///
/// Holds at most `MAX_STORED_TURNS` turns for display; only the trailing
/// window is forwarded to the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::assistant(content));
    }

    fn push(&mut self, turn: ChatTurn) {
        if self.turns.len() >= MAX_STORED_TURNS {
            let excess = self.turns.len() + 1 - MAX_STORED_TURNS;
            self.turns.drain(..excess);
        }
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The last `n` turns, oldest first
    pub fn window(&self, n: usize) -> &[ChatTurn] {
        recent(&self.turns, n)
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn message_count(&self) -> usize {
        self.turns.len()
    }
}

/// Trailing slice of at most `n` turns
pub fn recent(turns: &[ChatTurn], n: usize) -> &[ChatTurn] {
    let start = turns.len().saturating_sub(n);
    &turns[start..]
}
