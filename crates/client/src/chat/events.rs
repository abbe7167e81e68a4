use std::fmt;

use crate::chat::message::Turn;
use crate::ids::ChatId;

/// Stream payload mapped out of raw channel events into chat domain language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventPayload {
    Start,
    Delta(String),
    Done,
    Error(String),
}

/// Emitted by the connection manager for the session to fold into its thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Chat the server says this event belongs to, when it said so.
    pub chat_id: Option<ChatId>,
    pub payload: StreamEventPayload,
}

impl StreamEvent {
    pub fn new(chat_id: Option<ChatId>, payload: StreamEventPayload) -> Self {
        Self { chat_id, payload }
    }

    /// Returns true for events that end the current generation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.payload,
            StreamEventPayload::Done | StreamEventPayload::Error(_)
        )
    }
}

/// Outcome of handing a turn to the delivery side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Held until the channel reconnects. `position` is 1-based.
    Queued { position: usize },
    /// The send call itself failed; the turn is gone.
    Failed(String),
}

/// Delivery seam between a chat session and whatever owns the channel.
pub trait TurnSink {
    fn deliver(&mut self, turn: Turn) -> Delivery;
}

/// Reasons a submission is rejected before it reaches the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyText,
    NoModelSelected,
    AlreadyGenerating,
    NoActiveChat,
}

impl SubmitRejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyText => "Please type a message first",
            Self::NoModelSelected => "Please select a model first",
            Self::AlreadyGenerating => "Please wait for the current response to finish",
            Self::NoActiveChat => "Please start or open a chat first",
        }
    }
}

impl fmt::Display for SubmitRejection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.user_message())
    }
}
