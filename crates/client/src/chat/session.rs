use std::sync::Arc;

use crate::api::{ChatDetail, ChatSummary};
use crate::chat::events::{Delivery, StreamEvent, StreamEventPayload, SubmitRejection, TurnSink};
use crate::chat::message::{GenerationState, Message, MessageStatus, Role, Turn};
use crate::ids::ChatId;
use crate::notify::{Notifier, SessionObserver, Severity};

/// One active conversation: its thread, and whether a response is in flight.
///
/// The session never touches the channel. Turns leave through a [`TurnSink`]
/// and stream events arrive already mapped by the connection manager.
pub struct ChatSession {
    active_chat: Option<ChatSummary>,
    messages: Vec<Message>,
    generation: GenerationState,
    /// Index of the assistant message receiving chunks, if one is open.
    open_assistant: Option<usize>,
    notifier: Arc<dyn Notifier>,
    observer: Arc<dyn SessionObserver>,
}

impl ChatSession {
    pub fn new(notifier: Arc<dyn Notifier>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            active_chat: None,
            messages: Vec::new(),
            generation: GenerationState::Idle,
            open_assistant: None,
            notifier,
            observer,
        }
    }

    pub fn active_chat(&self) -> Option<&ChatSummary> {
        self.active_chat.as_ref()
    }

    pub fn active_chat_id(&self) -> Option<ChatId> {
        self.active_chat.as_ref().map(|chat| chat.id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generation(&self) -> GenerationState {
        self.generation
    }

    /// Switches to a freshly created chat with an empty thread.
    pub fn start_chat(&mut self, chat: ChatSummary) {
        self.active_chat = Some(chat);
        self.replace_messages(Vec::new());
    }

    /// Switches to a stored chat. System prompts are never displayed.
    pub fn open_chat(&mut self, detail: ChatDetail) {
        let messages = detail
            .messages
            .into_iter()
            .filter(|message| message.role != Role::System)
            .map(|message| Message::new(message.role, message.content, MessageStatus::Done))
            .collect();
        self.active_chat = Some(detail.chat);
        self.replace_messages(messages);
    }

    pub fn close_chat(&mut self) {
        self.active_chat = None;
        self.replace_messages(Vec::new());
    }

    /// Picks up server-side changes (e.g. the title set after the first exchange).
    pub fn refresh_active_chat(&mut self, chats: &[ChatSummary]) {
        let Some(active) = self.active_chat.as_mut() else {
            return;
        };
        if let Some(latest) = chats.iter().find(|chat| chat.id == active.id) {
            *active = latest.clone();
        }
    }

    /// Checks everything `submit_turn` checks except for an active chat, so a
    /// front end can reject bad input before creating a chat on the server.
    pub fn validate_submission(
        &self,
        text: &str,
        model_id: Option<&str>,
    ) -> Result<(), SubmitRejection> {
        if text.trim().is_empty() {
            return Err(SubmitRejection::EmptyText);
        }
        if model_id.is_none_or(|model| model.trim().is_empty()) {
            return Err(SubmitRejection::NoModelSelected);
        }
        if self.generation.is_generating() {
            return Err(SubmitRejection::AlreadyGenerating);
        }
        Ok(())
    }

    pub fn submit_turn(
        &mut self,
        text: &str,
        model_id: Option<&str>,
        sink: &mut dyn TurnSink,
    ) -> Result<Delivery, SubmitRejection> {
        let checked = self
            .validate_submission(text, model_id)
            .and_then(|()| self.active_chat_id().ok_or(SubmitRejection::NoActiveChat));
        let chat_id = match checked {
            Ok(chat_id) => chat_id,
            Err(rejection) => {
                tracing::debug!(?rejection, "turn rejected before delivery");
                self.notifier.notify(rejection.user_message(), Severity::Warning);
                return Err(rejection);
            }
        };

        let text = text.trim();
        let model_id = model_id.unwrap_or_default().trim();

        // Optimistic: the user message stays whatever happens to delivery.
        self.messages.push(Message::user(text));
        self.observer.messages_changed(&self.messages);
        self.set_generation(GenerationState::Generating);

        let delivery = sink.deliver(Turn::new(chat_id, text, model_id));
        if let Delivery::Failed(reason) = &delivery {
            self.on_stream_error(reason.clone());
        }
        Ok(delivery)
    }

    /// Routes one mapped stream event to the matching handler.
    pub fn apply_stream_event(&mut self, event: StreamEvent) {
        if !event.is_terminal()
            && let Some(chat_id) = event.chat_id
            && self.active_chat_id() != Some(chat_id)
        {
            tracing::debug!(%chat_id, "dropping stream event for an inactive chat");
            return;
        }

        match event.payload {
            StreamEventPayload::Start => self.on_stream_start(),
            StreamEventPayload::Delta(text) => self.on_stream_chunk(&text),
            StreamEventPayload::Done => self.on_stream_complete(),
            StreamEventPayload::Error(reason) => self.on_stream_error(reason),
        }
    }

    pub fn on_stream_start(&mut self) {
        if self.open_assistant.is_some() {
            tracing::warn!("response_start received while a response is still open");
            self.close_open_assistant(MessageStatus::Done);
        }
        self.messages.push(Message::assistant_streaming());
        self.open_assistant = Some(self.messages.len() - 1);
        self.observer.messages_changed(&self.messages);
    }

    pub fn on_stream_chunk(&mut self, text: &str) {
        let Some(message) = self
            .open_assistant
            .and_then(|index| self.messages.get_mut(index))
        else {
            tracing::warn!(chunk_len = text.len(), "response_chunk without an open response");
            return;
        };
        message.content.push_str(text);
        self.observer.messages_changed(&self.messages);
    }

    pub fn on_stream_complete(&mut self) {
        if self.close_open_assistant(MessageStatus::Done) {
            self.observer.messages_changed(&self.messages);
        }
        self.set_generation(GenerationState::Idle);
    }

    /// Ends the generation, keeping any partial content, and shows `reason`.
    pub fn on_stream_error(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(error = %reason, "response stream failed");

        if self.close_open_assistant(MessageStatus::Interrupted(reason.clone())) {
            self.observer.messages_changed(&self.messages);
        }
        self.set_generation(GenerationState::Idle);
        self.notifier.notify(&format!("Error: {reason}"), Severity::Error);
    }

    fn close_open_assistant(&mut self, status: MessageStatus) -> bool {
        let Some(message) = self
            .open_assistant
            .take()
            .and_then(|index| self.messages.get_mut(index))
        else {
            return false;
        };
        message.status = status;
        true
    }

    fn replace_messages(&mut self, messages: Vec<Message>) {
        self.open_assistant = None;
        self.messages = messages;
        self.observer.messages_changed(&self.messages);
    }

    fn set_generation(&mut self, state: GenerationState) {
        if self.generation == state {
            return;
        }
        self.generation = state;
        self.observer.generation_changed(state);
    }
}
