use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Lifecycle status for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Done,
    /// Open assistant message receiving chunks.
    Streaming,
    /// Stream ended with an error; content holds whatever arrived before it.
    Interrupted(String),
}

/// One entry in the visible thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            role,
            content: content.into(),
            status,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, MessageStatus::Done)
    }

    /// Creates the empty assistant placeholder that chunks are appended to.
    pub fn assistant_streaming() -> Self {
        Self::new(Role::Assistant, String::new(), MessageStatus::Streaming)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, MessageStatus::Streaming)
    }
}

/// Whether an assistant response is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
}

impl GenerationState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating)
    }
}

/// One user submission awaiting delivery.
///
/// Turns are moved into the transport exactly once; nothing keeps a copy
/// after delivery, which makes the channel at-most-once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub chat_id: ChatId,
    pub text: String,
    pub model_id: String,
}

impl Turn {
    pub fn new(chat_id: ChatId, text: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            model_id: model_id.into(),
        }
    }
}
