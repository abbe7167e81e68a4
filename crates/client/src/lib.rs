//! Client core for an Alpaca chat server.
//!
//! [`ChatSession`] tracks one conversation and folds streamed response
//! chunks into it. [`ConnectionManager`] owns the Socket.IO channel, retries
//! with linear backoff and queues turns while disconnected. [`ChatApp`] wires
//! both to the REST API for front ends.

#![deny(unsafe_code)]

pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod connection;
pub mod error;
pub mod ids;
pub mod model;
pub mod notify;
pub mod preferences;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use api::ApiClient;
pub use app::ChatApp;
pub use chat::ChatSession;
pub use config::{ClientConfig, ConfigError};
pub use connection::{ChannelEvent, ConnectionManager, TokioReconnectScheduler};
pub use error::{ClientError, ClientResult};
pub use ids::{ChatId, CustomModelId};
pub use notify::{Notifier, NullObserver, SessionObserver, Severity};
pub use preferences::{Preferences, PreferencesStore};
pub use transport::WebSocketChannel;
