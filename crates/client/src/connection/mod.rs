//! Real-time channel lifecycle: connect, reconnect with linear backoff, and
//! the FIFO queue of turns submitted while disconnected.

mod backoff;
mod channel;
mod manager;

pub use backoff::{ReconnectPlan, ReconnectPolicy, ReconnectScheduler, TokioReconnectScheduler};
pub use channel::{ChannelEvent, ClientEvent, RealtimeChannel, ServerEvent};
pub use manager::{ConnectionManager, ConnectionState};
