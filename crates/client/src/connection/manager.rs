use std::collections::VecDeque;
use std::sync::Arc;

use crate::chat::{Delivery, StreamEvent, StreamEventPayload, Turn, TurnSink};
use crate::connection::backoff::{ReconnectPolicy, ReconnectScheduler};
use crate::connection::channel::{ChannelEvent, ClientEvent, RealtimeChannel, ServerEvent};
use crate::notify::{Notifier, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Owns the real-time channel: lifecycle, reconnect backoff and the queue of
/// turns submitted while disconnected.
///
/// All input arrives through [`ConnectionManager::handle`], one event at a
/// time, so no state here is ever touched concurrently.
pub struct ConnectionManager<C> {
    channel: C,
    state: ConnectionState,
    policy: ReconnectPolicy,
    /// Automatic reconnect attempts since the last successful connect.
    retries: u32,
    queue: VecDeque<Turn>,
    /// Ticket of the one timer allowed to trigger a reconnect.
    pending_reconnect: Option<u64>,
    next_ticket: u64,
    connecting: bool,
    ever_connected: bool,
    shut_down: bool,
    scheduler: Arc<dyn ReconnectScheduler>,
    notifier: Arc<dyn Notifier>,
}

impl<C: RealtimeChannel> ConnectionManager<C> {
    pub fn new(
        channel: C,
        policy: ReconnectPolicy,
        scheduler: Arc<dyn ReconnectScheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            channel,
            state: ConnectionState::Disconnected,
            policy,
            retries: 0,
            queue: VecDeque::new(),
            pending_reconnect: None,
            next_ticket: 0,
            connecting: false,
            ever_connected: false,
            shut_down: false,
            scheduler,
            notifier,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_turns(&self) -> impl Iterator<Item = &Turn> {
        self.queue.iter()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Opens the channel unless it is already open or opening.
    pub fn connect(&mut self) {
        if self.is_connected() || self.connecting {
            tracing::debug!(state = ?self.state, "connect ignored");
            return;
        }
        self.shut_down = false;
        self.connecting = true;
        tracing::info!(attempt = self.retries, "connecting real-time channel");
        self.channel.connect();
    }

    /// Folds one inbox event into the connection state.
    ///
    /// Server stream events come back mapped for the chat session. A failed
    /// send while draining the queue is reported the same way, as an error
    /// for the turn's chat.
    pub fn handle(&mut self, event: ChannelEvent) -> Option<StreamEvent> {
        match event {
            ChannelEvent::Opened => self.on_opened(),
            ChannelEvent::ConnectFailed { reason } => {
                self.on_connect_failed(&reason);
                None
            }
            ChannelEvent::Closed { reason } => {
                self.on_closed(&reason);
                None
            }
            ChannelEvent::ReconnectDue { ticket } => {
                self.on_reconnect_due(ticket);
                None
            }
            ChannelEvent::Server(event) => self.map_server_event(event),
        }
    }

    /// Sends queued turns in FIFO order while the channel stays connected.
    ///
    /// Each turn leaves the queue once its send has been issued. The first
    /// send error stops the drain, tears the channel down so the remaining
    /// turns wait for the next open, and is returned as a stream error.
    pub fn drain_queue(&mut self) -> Option<StreamEvent> {
        let mut sent = 0usize;
        while self.is_connected() {
            let Some(turn) = self.queue.front().cloned() else {
                break;
            };
            let chat_id = turn.chat_id;
            let result = self.channel.send(&ClientEvent::SendMessage(turn));
            self.queue.pop_front();
            match result {
                Ok(()) => sent += 1,
                Err(error) => {
                    tracing::warn!(
                        %chat_id,
                        %error,
                        remaining = self.queue.len(),
                        "queued turn not delivered"
                    );
                    self.channel.disconnect();
                    self.on_closed(&error.to_string());
                    return Some(StreamEvent::new(
                        Some(chat_id),
                        StreamEventPayload::Error(error.to_string()),
                    ));
                }
            }
        }
        if sent > 0 {
            tracing::info!(sent, "drained queued turns");
        }
        None
    }

    /// The host regained network access: retry immediately with a fresh budget.
    pub fn network_online(&mut self) {
        self.notifier.notify("Connection restored", Severity::Success);
        self.retries = 0;
        self.pending_reconnect = None;
        self.connect();
    }

    /// The host lost network access. Nothing else changes; the channel's own
    /// close event drives the reconnect.
    pub fn network_offline(&mut self) {
        self.notifier.notify("You are offline", Severity::Warning);
    }

    /// Closes the channel and cancels pending reconnects. Queued turns stay.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.pending_reconnect = None;
        self.connecting = false;
        self.state = ConnectionState::Disconnected;
        self.channel.disconnect();
        tracing::info!(queued = self.queue.len(), "real-time channel shut down");
    }

    fn on_opened(&mut self) -> Option<StreamEvent> {
        let reconnected = self.ever_connected;
        self.state = ConnectionState::Connected;
        self.connecting = false;
        self.ever_connected = true;
        self.retries = 0;
        self.pending_reconnect = None;
        tracing::info!(reconnected, queued = self.queue.len(), "real-time channel open");

        let message = if reconnected {
            "Reconnected to server"
        } else {
            "Connected to server"
        };
        self.notifier.notify(message, Severity::Success);
        self.drain_queue()
    }

    fn on_connect_failed(&mut self, reason: &str) {
        self.connecting = false;
        tracing::warn!(reason, attempt = self.retries, "connect attempt failed");
        self.schedule_reconnect();
    }

    fn on_closed(&mut self, reason: &str) {
        self.connecting = false;
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
            tracing::warn!(reason, "real-time channel lost");
            self.notifier.notify(
                "Connection lost. Attempting to reconnect...",
                Severity::Warning,
            );
        }
        self.schedule_reconnect();
    }

    fn on_reconnect_due(&mut self, ticket: u64) {
        if self.pending_reconnect != Some(ticket) {
            tracing::debug!(ticket, "ignoring superseded reconnect timer");
            return;
        }
        self.pending_reconnect = None;
        self.connect();
    }

    fn schedule_reconnect(&mut self) {
        if self.shut_down || self.pending_reconnect.is_some() || self.is_connected() {
            return;
        }
        let attempt = self.retries + 1;
        let ticket = self.next_ticket;
        let Some(plan) = self.policy.plan(attempt, ticket) else {
            tracing::error!(retries = self.retries, "giving up on reconnect");
            self.notifier.notify(
                "Unable to connect to server. Please check your connection.",
                Severity::Error,
            );
            return;
        };
        self.next_ticket += 1;
        self.retries = attempt;
        self.pending_reconnect = Some(ticket);
        self.scheduler.schedule(plan);
    }

    fn map_server_event(&mut self, event: ServerEvent) -> Option<StreamEvent> {
        let (chat_id, payload) = match event {
            ServerEvent::Connected { status } => {
                tracing::debug!(%status, "server greeting");
                return None;
            }
            ServerEvent::ResponseStart { chat_id } => (chat_id, StreamEventPayload::Start),
            ServerEvent::ResponseChunk { chat_id, content } => {
                (chat_id, StreamEventPayload::Delta(content))
            }
            ServerEvent::ResponseComplete { chat_id } => (chat_id, StreamEventPayload::Done),
            ServerEvent::Error { error } => (None, StreamEventPayload::Error(error)),
        };
        Some(StreamEvent::new(chat_id, payload))
    }
}

impl<C: RealtimeChannel> TurnSink for ConnectionManager<C> {
    fn deliver(&mut self, turn: Turn) -> Delivery {
        // Earlier turns still waiting go first.
        if self.is_connected() && self.queue.is_empty() {
            let chat_id = turn.chat_id;
            return match self.channel.send(&ClientEvent::SendMessage(turn)) {
                Ok(()) => Delivery::Sent,
                Err(error) => {
                    tracing::warn!(%chat_id, %error, "turn not delivered");
                    Delivery::Failed(error.to_string())
                }
            };
        }

        self.queue.push_back(turn);
        tracing::info!(queued = self.queue.len(), "turn queued until reconnect");
        self.notifier.notify(
            "Message queued. Waiting for connection...",
            Severity::Warning,
        );
        Delivery::Queued {
            position: self.queue.len(),
        }
    }
}
