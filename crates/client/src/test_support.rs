//! Recording fakes shared by the unit tests.

use std::sync::Mutex;

use crate::api::ChatSummary;
use crate::chat::{Delivery, GenerationState, Message, Turn, TurnSink};
use crate::connection::{ClientEvent, RealtimeChannel, ReconnectPlan, ReconnectScheduler};
use crate::error::{ChannelClosedSnafu, ClientResult};
use crate::ids::ChatId;
use crate::notify::{Notifier, SessionObserver, Severity};

pub fn summary(id: i64, model: &str) -> ChatSummary {
    ChatSummary {
        id: ChatId::new(id),
        title: "New Chat".to_string(),
        model: model.to_string(),
        created_at: None,
        updated_at: None,
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn entries(&self) -> Vec<(String, Severity)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(message, recorded)| *recorded == severity && message.contains(needle))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|(_, recorded)| *recorded == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.entries
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<Vec<Message>>>,
    generations: Mutex<Vec<GenerationState>>,
}

impl RecordingObserver {
    pub fn message_snapshots(&self) -> Vec<Vec<Message>> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn generations(&self) -> Vec<GenerationState> {
        self.generations.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn messages_changed(&self, messages: &[Message]) {
        self.snapshots.lock().unwrap().push(messages.to_vec());
    }

    fn generation_changed(&self, state: GenerationState) {
        self.generations.lock().unwrap().push(state);
    }
}

enum SinkMode {
    Send,
    Queue,
    Fail(String),
}

pub struct RecordingSink {
    pub turns: Vec<Turn>,
    mode: SinkMode,
}

impl RecordingSink {
    pub fn sending() -> Self {
        Self::with_mode(SinkMode::Send)
    }

    pub fn queueing() -> Self {
        Self::with_mode(SinkMode::Queue)
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_mode(SinkMode::Fail(reason.to_string()))
    }

    fn with_mode(mode: SinkMode) -> Self {
        Self {
            turns: Vec::new(),
            mode,
        }
    }
}

impl TurnSink for RecordingSink {
    fn deliver(&mut self, turn: Turn) -> Delivery {
        self.turns.push(turn);
        match &self.mode {
            SinkMode::Send => Delivery::Sent,
            SinkMode::Queue => Delivery::Queued {
                position: self.turns.len(),
            },
            SinkMode::Fail(reason) => Delivery::Failed(reason.clone()),
        }
    }
}

/// Channel that records calls; outcomes are fed to the manager by the test.
#[derive(Debug, Default)]
pub struct FakeChannel {
    pub connects: usize,
    pub disconnects: usize,
    pub sent: Vec<ClientEvent>,
    pub fail_sends: bool,
}

impl RealtimeChannel for FakeChannel {
    fn connect(&mut self) {
        self.connects += 1;
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }

    fn send(&mut self, event: &ClientEvent) -> ClientResult<()> {
        if self.fail_sends {
            return ChannelClosedSnafu { stage: "fake-send" }.fail();
        }
        self.sent.push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    plans: Mutex<Vec<ReconnectPlan>>,
}

impl RecordingScheduler {
    pub fn plans(&self) -> Vec<ReconnectPlan> {
        self.plans.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ReconnectPlan> {
        self.plans.lock().unwrap().last().copied()
    }
}

impl ReconnectScheduler for RecordingScheduler {
    fn schedule(&self, plan: ReconnectPlan) {
        self.plans.lock().unwrap().push(plan);
    }
}
