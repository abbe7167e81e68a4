//! Front-end facing coordinator.
//!
//! `ChatApp` ties the REST catalogue (models, chats, custom models) to the
//! live chat session and its real-time channel. It is driven from a single
//! task: user actions call its methods directly and every [`ChannelEvent`]
//! from the inbox goes through [`ChatApp::handle_channel_event`].

use std::sync::Arc;

use crate::api::{ApiClient, ChatSummary, CustomModel, CustomModelDraft, ModelInfo};
use crate::chat::{ChatSession, Delivery, StreamEventPayload, SubmitRejection};
use crate::connection::{ChannelEvent, ConnectionManager, RealtimeChannel};
use crate::error::ClientResult;
use crate::ids::{ChatId, CustomModelId};
use crate::model::ModelCatalog;
use crate::notify::{Notifier, Severity};
use crate::preferences::{Preferences, PreferencesStore};

/// Title the server gives a chat until its first exchange renames it.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

pub struct ChatApp<C> {
    api: ApiClient,
    session: ChatSession,
    connection: ConnectionManager<C>,
    catalog: ModelCatalog,
    chats: Vec<ChatSummary>,
    selected_model: Option<String>,
    preferences: Arc<PreferencesStore>,
    notifier: Arc<dyn Notifier>,
}

impl<C: RealtimeChannel> ChatApp<C> {
    pub fn new(
        api: ApiClient,
        session: ChatSession,
        connection: ConnectionManager<C>,
        preferences: Arc<PreferencesStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            connection,
            catalog: ModelCatalog::default(),
            chats: Vec::new(),
            selected_model: None,
            preferences,
            notifier,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Loads models and chats concurrently, restores preferences, then opens
    /// the real-time channel.
    pub async fn initialize(&mut self) {
        let (models, chats) = tokio::join!(self.api.list_models(), self.api.list_chats());
        self.apply_models(models);
        self.apply_chats(chats);
        self.restore_preferences().await;
        self.connection.connect();
    }

    pub async fn load_models(&mut self) -> bool {
        let models = self.api.list_models().await;
        self.apply_models(models)
    }

    pub async fn load_chats(&mut self) -> bool {
        let chats = self.api.list_chats().await;
        self.apply_chats(chats)
    }

    pub async fn create_new_chat(&mut self) -> Option<ChatId> {
        let Some(model) = self.selected_model.clone() else {
            self.notifier.notify(
                SubmitRejection::NoModelSelected.user_message(),
                Severity::Warning,
            );
            return None;
        };
        let chat_id = self.create_chat_for(&model).await?;
        self.notifier.notify("New chat created", Severity::Success);
        Some(chat_id)
    }

    pub async fn load_chat(&mut self, chat_id: ChatId) -> bool {
        match self.api.get_chat(chat_id).await {
            Ok(detail) => {
                let model = detail.chat.model.clone();
                tracing::info!(%chat_id, messages = detail.messages.len(), "opened chat");
                self.session.open_chat(detail);
                if !model.trim().is_empty() {
                    self.selected_model = Some(model);
                }
                self.save_preferences();
                true
            }
            Err(error) => {
                tracing::error!(%chat_id, %error, "failed to load chat");
                self.notifier.notify("Failed to load chat", Severity::Error);
                false
            }
        }
    }

    pub async fn delete_current_chat(&mut self) -> bool {
        let Some(chat_id) = self.session.active_chat_id() else {
            self.notifier.notify(SubmitRejection::NoActiveChat.user_message(), Severity::Warning);
            return false;
        };
        if let Err(error) = self.api.delete_chat(chat_id).await {
            tracing::error!(%chat_id, %error, "failed to delete chat");
            self.notifier.notify("Failed to delete chat", Severity::Error);
            return false;
        }

        self.session.close_chat();
        self.save_preferences();
        self.load_chats().await;
        self.notifier.notify("Chat deleted", Severity::Success);
        true
    }

    /// Submits `text` on the active chat, creating a chat first when none is open.
    pub async fn send_message(&mut self, text: &str) -> Result<Delivery, SubmitRejection> {
        let model = self.selected_model.clone();
        if let Err(rejection) = self.session.validate_submission(text, model.as_deref()) {
            self.notifier.notify(rejection.user_message(), Severity::Warning);
            return Err(rejection);
        }

        if self.session.active_chat_id().is_none() {
            let model = model.as_deref().unwrap_or_default();
            if self.create_chat_for(model).await.is_none() {
                return Err(SubmitRejection::NoActiveChat);
            }
        }

        self.session
            .submit_turn(text, model.as_deref(), &mut self.connection)
    }

    pub fn select_model(&mut self, name: &str) -> bool {
        let name = name.trim();
        if !self.catalog.contains(name) {
            self.notifier.notify(&format!("Unknown model: {name}"), Severity::Warning);
            return false;
        }
        self.selected_model = Some(name.to_string());
        self.save_preferences();
        true
    }

    pub async fn list_custom_models(&self) -> Option<Vec<CustomModel>> {
        match self.api.list_custom_models().await {
            Ok(models) => Some(models),
            Err(error) => {
                tracing::error!(%error, "failed to load custom models");
                self.notifier.notify("Failed to load custom models", Severity::Error);
                None
            }
        }
    }

    /// Looks up one custom model for editing.
    pub async fn custom_model(&self, model_id: CustomModelId) -> Option<CustomModel> {
        let models = self.list_custom_models().await?;
        let found = models.into_iter().find(|model| model.id == model_id);
        if found.is_none() {
            self.notifier.notify("Custom model not found", Severity::Warning);
        }
        found
    }

    /// Creates a custom model, or updates `model_id` when given, then reloads
    /// the model catalog.
    pub async fn save_custom_model(
        &mut self,
        model_id: Option<CustomModelId>,
        draft: CustomModelDraft,
    ) -> bool {
        let draft = match draft.validated() {
            Ok(draft) => draft,
            Err(error) => {
                self.notifier.notify(&error.to_string(), Severity::Warning);
                return false;
            }
        };

        let result = match model_id {
            Some(model_id) => self.api.update_custom_model(model_id, &draft).await,
            None => self.api.create_custom_model(&draft).await.map(|_| ()),
        };
        if let Err(error) = result {
            tracing::error!(name = %draft.name, %error, "failed to save custom model");
            self.notifier.notify(&format!("Error: {error}"), Severity::Error);
            return false;
        }

        let message = if model_id.is_some() {
            "Model updated successfully"
        } else {
            "Model created successfully"
        };
        self.notifier.notify(message, Severity::Success);
        self.load_models().await;
        true
    }

    pub async fn delete_custom_model(&mut self, model_id: CustomModelId) -> bool {
        if let Err(error) = self.api.delete_custom_model(model_id).await {
            tracing::error!(%model_id, %error, "failed to delete custom model");
            self.notifier.notify(&format!("Error: {error}"), Severity::Error);
            return false;
        }
        self.notifier.notify("Model deleted successfully", Severity::Success);
        self.load_models().await;
        true
    }

    /// Runs one inbox event through the connection manager and applies any
    /// resulting stream event to the session.
    pub async fn handle_channel_event(&mut self, event: ChannelEvent) {
        let Some(stream_event) = self.connection.handle(event) else {
            return;
        };
        let completed = stream_event.payload == StreamEventPayload::Done;
        self.session.apply_stream_event(stream_event);
        if completed {
            // The server titles a chat after its first exchange.
            self.load_chats().await;
        }
    }

    pub fn network_online(&mut self) {
        self.connection.network_online();
    }

    pub fn network_offline(&mut self) {
        self.connection.network_offline();
    }

    pub fn shutdown(&mut self) {
        self.save_preferences();
        self.connection.shutdown();
    }

    async fn restore_preferences(&mut self) {
        let preferences = self.preferences.get();
        if let Some(model) = preferences.selected_model.as_deref()
            && self.catalog.contains(model)
        {
            self.selected_model = Some(model.to_string());
        }
        if let Some(chat_id) = preferences.current_chat_id
            && !self.load_chat(chat_id).await
        {
            tracing::info!(%chat_id, "forgetting chat that could not be reopened");
            self.save_preferences();
        }
    }

    async fn create_chat_for(&mut self, model: &str) -> Option<ChatId> {
        match self.api.create_chat(model, None).await {
            Ok(chat_id) => {
                self.session.start_chat(ChatSummary {
                    id: chat_id,
                    title: DEFAULT_CHAT_TITLE.to_string(),
                    model: model.to_string(),
                    created_at: None,
                    updated_at: None,
                });
                self.save_preferences();
                self.load_chats().await;
                Some(chat_id)
            }
            Err(error) => {
                tracing::error!(model, %error, "failed to create chat");
                self.notifier.notify("Failed to create chat", Severity::Error);
                None
            }
        }
    }

    fn apply_models(&mut self, models: ClientResult<Vec<ModelInfo>>) -> bool {
        match models {
            Ok(models) => {
                self.catalog = ModelCatalog::from_models(models);
                tracing::debug!(
                    base = self.catalog.base.len(),
                    custom = self.catalog.custom.len(),
                    "loaded models"
                );
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to load models");
                self.notifier.notify("Failed to load models", Severity::Error);
                false
            }
        }
    }

    fn apply_chats(&mut self, chats: ClientResult<Vec<ChatSummary>>) -> bool {
        match chats {
            Ok(chats) => {
                self.session.refresh_active_chat(&chats);
                self.chats = chats;
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to load chats");
                self.notifier.notify("Failed to load chat history", Severity::Error);
                false
            }
        }
    }

    fn save_preferences(&self) {
        self.preferences.save(Preferences {
            selected_model: self.selected_model.clone(),
            current_chat_id: self.session.active_chat_id(),
        });
    }
}
