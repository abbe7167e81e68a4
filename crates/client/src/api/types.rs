use serde::{Deserialize, Serialize};

use crate::chat::Role;
use crate::ids::{ChatId, CustomModelId};

/// Row from `GET /api/chats`, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
    pub model: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `GET /api/chat/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDetail {
    pub chat: ChatSummary,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Base,
    Custom,
}

/// Entry from `GET /api/models`; base and custom models share one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModelKind,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomModel {
    pub id: CustomModelId,
    pub name: String,
    pub base_model: String,
    pub system_prompt: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Create/update body for custom models. See [`CustomModelDraft::validated`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomModelDraft {
    pub name: String,
    pub base_model: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct NewChatRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsPayload {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatsPayload {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedChatPayload {
    pub chat_id: ChatId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomModelsPayload {
    pub models: Vec<CustomModel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedCustomModelPayload {
    pub model_id: CustomModelId,
}

/// Success bodies that carry nothing beyond `success: true`.
#[derive(Debug, Deserialize)]
pub(crate) struct EmptyPayload {}
