use serde::Deserialize;

use crate::chat::Turn;
use crate::error::ClientResult;
use crate::ids::ChatId;

/// Events the server emits on the real-time channel.
///
/// Decoded from `{ "event": name, "data": payload }`; see
/// [`crate::transport::socketio::decode_server_event`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        #[serde(default)]
        status: String,
    },
    ResponseStart {
        #[serde(default)]
        chat_id: Option<ChatId>,
    },
    ResponseChunk {
        #[serde(default)]
        chat_id: Option<ChatId>,
        content: String,
    },
    ResponseComplete {
        #[serde(default)]
        chat_id: Option<ChatId>,
    },
    Error {
        error: String,
    },
}

/// Events this client emits on the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SendMessage(Turn),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage(_) => "send_message",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            ClientEvent::SendMessage(turn) => serde_json::json!({
                "chat_id": turn.chat_id,
                "message": turn.text,
                "model": turn.model_id,
            }),
        }
    }
}

/// Everything that reaches the connection manager's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Transport and namespace handshake finished.
    Opened,
    /// A connect attempt never reached `Opened`.
    ConnectFailed { reason: String },
    /// An open channel went away.
    Closed { reason: String },
    Server(ServerEvent),
    /// A scheduled reconnect timer fired.
    ReconnectDue { ticket: u64 },
}

/// The single process-wide real-time channel.
///
/// Calls never block. Outcomes of `connect` arrive later as [`ChannelEvent`]s.
pub trait RealtimeChannel: Send {
    fn connect(&mut self);
    fn disconnect(&mut self);
    fn send(&mut self, event: &ClientEvent) -> ClientResult<()>;
}
