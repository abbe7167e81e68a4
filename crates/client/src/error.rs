use std::num::ParseIntError;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("server URL '{raw}' is invalid on `{stage}`: {source}"))]
    InvalidUrl {
        stage: &'static str,
        raw: String,
        source: url::ParseError,
    },
    #[snafu(display("server URL '{raw}' has no socket equivalent for scheme '{scheme}'"))]
    UnsupportedScheme {
        stage: &'static str,
        raw: String,
        scheme: String,
    },
    #[snafu(display("id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: ParseIntError,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("server returned status {status} on `{stage}`: {body}"))]
    ServerStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
    /// Envelope with success false; `message` is the server's error text.
    #[snafu(display("{message}"))]
    ServerRejected {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("failed to decode server payload on `{stage}`: {source}"))]
    DecodePayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to encode channel event on `{stage}`: {source}"))]
    EncodeEvent {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("malformed channel frame on `{stage}`: {details}"))]
    MalformedFrame {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("real-time channel is not connected"))]
    ChannelClosed { stage: &'static str },
    #[snafu(display("websocket failed on `{stage}`, {source}"))]
    WebSocket {
        stage: &'static str,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[snafu(display("server refused the socket session on `{stage}`: {details}"))]
    HandshakeRejected { stage: &'static str, details: String },
    #[snafu(display("connection lost on `{stage}`: {details}"))]
    ConnectionLost { stage: &'static str, details: String },
    #[snafu(display("{details}"))]
    InvalidCustomModel {
        stage: &'static str,
        details: &'static str,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;
