//! Socket.IO v5 framing over Engine.IO v4, text frames only.
//!
//! An Engine.IO frame is a one-digit packet type followed by its payload.
//! Type `4` (message) wraps a Socket.IO packet, itself a one-digit type
//! followed by an optional namespace, an optional ack id and a JSON body:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                     ping / pong
//! 40                                                        namespace connect
//! 42["response_chunk",{"chat_id":1,"content":"Hi"}]         event
//! ```

use serde::Deserialize;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

use crate::connection::{ClientEvent, ServerEvent};
use crate::error::{ClientResult, DecodePayloadSnafu, EncodeEventSnafu, MalformedFrameSnafu};

/// Joins the default namespace.
pub const CONNECT_FRAME: &str = "40";
/// Engine.IO answer to a server ping.
pub const PONG_FRAME: &str = "3";

const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

/// Engine.IO open handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL_MS
}

fn default_ping_timeout() -> u64 {
    DEFAULT_PING_TIMEOUT_MS
}

impl OpenHandshake {
    /// How long the server may stay silent before the session counts as dead.
    pub fn liveness_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect,
    Disconnect,
    ConnectError(String),
    Event { name: String, data: Value },
    /// Acks, binary attachments and upgrade probes; none are used here.
    Ignored(String),
}

pub fn decode_packet(frame: &str) -> ClientResult<Packet> {
    let mut chars = frame.chars();
    let kind = chars.next().context(MalformedFrameSnafu {
        stage: "decode-engine-packet",
        details: "empty frame",
    })?;
    let payload = chars.as_str();

    match kind {
        '0' => {
            let handshake = serde_json::from_str(payload).context(DecodePayloadSnafu {
                stage: "decode-open-handshake",
            })?;
            Ok(Packet::Open(handshake))
        }
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket_packet(payload),
        '6' => Ok(Packet::Noop),
        '5' => Ok(Packet::Ignored(frame.to_string())),
        other => MalformedFrameSnafu {
            stage: "decode-engine-packet",
            details: format!("unknown engine packet type '{other}'"),
        }
        .fail(),
    }
}

fn decode_socket_packet(packet: &str) -> ClientResult<Packet> {
    let mut chars = packet.chars();
    let kind = chars.next().context(MalformedFrameSnafu {
        stage: "decode-socket-packet",
        details: "empty message packet",
    })?;
    let body = skip_ack_id(skip_namespace(chars.as_str()));

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(body),
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| body.to_string());
            Ok(Packet::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Packet::Ignored(packet.to_string())),
        other => MalformedFrameSnafu {
            stage: "decode-socket-packet",
            details: format!("unknown socket packet type '{other}'"),
        }
        .fail(),
    }
}

// `/chat,` prefixes a non-default namespace.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        return body.split_once(',').map_or("", |(_, rest)| rest);
    }
    body
}

fn skip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> ClientResult<Packet> {
    let items: Vec<Value> = serde_json::from_str(body).context(DecodePayloadSnafu {
        stage: "decode-event-packet",
    })?;
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => {
            return MalformedFrameSnafu {
                stage: "decode-event-packet",
                details: "event packet without a name",
            }
            .fail();
        }
    };
    let data = items.next().unwrap_or(Value::Null);
    Ok(Packet::Event { name, data })
}

/// Maps a named event onto [`ServerEvent`]. Unknown names are an error the
/// caller is expected to log and skip.
pub fn decode_server_event(name: String, data: Value) -> ClientResult<ServerEvent> {
    let tagged = serde_json::json!({ "event": name, "data": data });
    serde_json::from_value(tagged).context(DecodePayloadSnafu {
        stage: "decode-server-event",
    })
}

pub fn encode_event(name: &str, data: &Value) -> ClientResult<String> {
    let body = serde_json::to_string(&(name, data)).context(EncodeEventSnafu {
        stage: "encode-event-packet",
    })?;
    Ok(format!("42{body}"))
}

pub fn encode_client_event(event: &ClientEvent) -> ClientResult<String> {
    encode_event(event.name(), &event.payload())
}
