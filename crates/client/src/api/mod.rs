//! REST client for the chat server's `/api` surface.
//!
//! Every endpoint answers with a JSON envelope, `{ "success": true, ... }` on
//! success and `{ "success": false, "error": "..." }` otherwise, often paired
//! with a 4xx/5xx status. The envelope is checked before the payload is
//! decoded so server-provided error text reaches the user unchanged.

mod types;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::ResultExt;
use url::Url;

use crate::error::{
    ClientResult, DecodePayloadSnafu, HttpClientSnafu, InvalidUrlSnafu, ServerRejectedSnafu,
    ServerStatusSnafu,
};
use crate::ids::{ChatId, CustomModelId};

pub use types::{
    ChatDetail, ChatSummary, CustomModel, CustomModelDraft, ModelInfo, ModelKind, StoredMessage,
};
use types::{
    ChatsPayload, CreatedChatPayload, CreatedCustomModelPayload, CustomModelsPayload,
    EmptyPayload, ModelsPayload, NewChatRequest,
};

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, mut base_url: Url) -> Self {
        // Endpoint paths are joined relatively, so the base must end in a slash
        // for a path prefix like `/alpaca` to survive the join.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_models(&self) -> ClientResult<Vec<ModelInfo>> {
        let url = self.endpoint("api/models")?;
        let payload: ModelsPayload = self.execute(self.http.get(url), "list-models").await?;
        Ok(payload.models)
    }

    pub async fn list_chats(&self) -> ClientResult<Vec<ChatSummary>> {
        let url = self.endpoint("api/chats")?;
        let payload: ChatsPayload = self.execute(self.http.get(url), "list-chats").await?;
        Ok(payload.chats)
    }

    /// Creates a chat bound to `model`; the server defaults the title to "New Chat".
    pub async fn create_chat(&self, model: &str, title: Option<&str>) -> ClientResult<ChatId> {
        let url = self.endpoint("api/chat")?;
        let body = NewChatRequest { model, title };
        let payload: CreatedChatPayload = self
            .execute(self.http.post(url).json(&body), "create-chat")
            .await?;
        tracing::debug!(chat_id = %payload.chat_id, model, "created chat");
        Ok(payload.chat_id)
    }

    pub async fn get_chat(&self, chat_id: ChatId) -> ClientResult<ChatDetail> {
        let url = self.endpoint(&format!("api/chat/{chat_id}"))?;
        self.execute(self.http.get(url), "get-chat").await
    }

    pub async fn delete_chat(&self, chat_id: ChatId) -> ClientResult<()> {
        let url = self.endpoint(&format!("api/chat/{chat_id}"))?;
        let _: EmptyPayload = self.execute(self.http.delete(url), "delete-chat").await?;
        Ok(())
    }

    pub async fn list_custom_models(&self) -> ClientResult<Vec<CustomModel>> {
        let url = self.endpoint("api/custom-models")?;
        let payload: CustomModelsPayload = self
            .execute(self.http.get(url), "list-custom-models")
            .await?;
        Ok(payload.models)
    }

    pub async fn create_custom_model(
        &self,
        draft: &CustomModelDraft,
    ) -> ClientResult<CustomModelId> {
        let url = self.endpoint("api/custom-model")?;
        let payload: CreatedCustomModelPayload = self
            .execute(self.http.post(url).json(draft), "create-custom-model")
            .await?;
        Ok(payload.model_id)
    }

    pub async fn update_custom_model(
        &self,
        model_id: CustomModelId,
        draft: &CustomModelDraft,
    ) -> ClientResult<()> {
        let url = self.endpoint(&format!("api/custom-model/{model_id}"))?;
        let _: EmptyPayload = self
            .execute(self.http.put(url).json(draft), "update-custom-model")
            .await?;
        Ok(())
    }

    pub async fn delete_custom_model(&self, model_id: CustomModelId) -> ClientResult<()> {
        let url = self.endpoint(&format!("api/custom-model/{model_id}"))?;
        let _: EmptyPayload = self
            .execute(self.http.delete(url), "delete-custom-model")
            .await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url.join(path).context(InvalidUrlSnafu {
            stage: "join-endpoint",
            raw: path.to_string(),
        })
    }

    async fn execute<T>(&self, request: RequestBuilder, stage: &'static str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.context(HttpClientSnafu { stage })?;
        let status = response.status().as_u16();
        let body = response.text().await.context(HttpClientSnafu { stage })?;
        decode_envelope(stage, status, &body)
    }
}

/// Checks the `{ success, error }` envelope and decodes the payload fields.
pub(crate) fn decode_envelope<T>(stage: &'static str, status: u16, body: &str) -> ClientResult<T>
where
    T: DeserializeOwned,
{
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => {
            return ServerStatusSnafu {
                stage,
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>(),
            }
            .fail();
        }
        Err(source) => return Err(source).context(DecodePayloadSnafu { stage }),
    };

    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        tracing::debug!(stage, status, error = %message, "server rejected request");
        return ServerRejectedSnafu { stage, message }.fail();
    }

    serde_json::from_value(value).context(DecodePayloadSnafu { stage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn envelope_success_decodes_payload_fields() {
        let body = r#"{"success": true, "chat_id": 9}"#;
        let payload: CreatedChatPayload = decode_envelope("test", 200, body).unwrap();
        assert_eq!(payload.chat_id, ChatId::new(9));
    }

    #[test]
    fn envelope_failure_surfaces_server_error_text() {
        let body = r#"{"success": false, "error": "Model name already exists"}"#;
        let error = decode_envelope::<EmptyPayload>("test", 400, body).unwrap_err();
        assert!(matches!(error, ClientError::ServerRejected { .. }));
        assert_eq!(error.to_string(), "Model name already exists");
    }

    #[test]
    fn envelope_without_error_text_names_the_status() {
        let error = decode_envelope::<EmptyPayload>("test", 500, r#"{"success": false}"#)
            .unwrap_err();
        assert_eq!(error.to_string(), "request failed with status 500");
    }

    #[test]
    fn non_json_error_body_reports_status() {
        let error = decode_envelope::<EmptyPayload>("test", 502, "<html>Bad gateway</html>")
            .unwrap_err();
        assert!(matches!(error, ClientError::ServerStatus { status: 502, .. }));
    }

    #[test]
    fn non_json_success_body_is_a_decode_error() {
        let error = decode_envelope::<EmptyPayload>("test", 200, "ok").unwrap_err();
        assert!(matches!(error, ClientError::DecodePayload { .. }));
    }

    #[test]
    fn base_url_gains_trailing_slash_for_prefixed_deployments() {
        let client = ApiClient::new(Url::parse("http://example.test/alpaca").unwrap());
        let url = client.endpoint("api/chats").unwrap();
        assert_eq!(url.as_str(), "http://example.test/alpaca/api/chats");
    }
}
