//! REST contract tests: request shapes and envelope handling for every
//! `/api` endpoint the client consumes.

use alpaca_client::api::{CustomModelDraft, ModelKind};
use alpaca_client::chat::Role;
use alpaca_client::{ApiClient, ChatId, ClientError, CustomModelId};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(Url::parse(&server.uri()).unwrap())
}

#[tokio::test]
async fn list_models_decodes_base_and_custom_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "models": [
                {
                    "name": "llama3:latest",
                    "type": "base",
                    "size": "4445.32 MB",
                    "modified_at": "2024-05-01T10:00:00Z",
                    "format": "gguf",
                    "family": "llama",
                    "parameter_size": "8B",
                    "quantization_level": "Q4_0"
                },
                {
                    "name": "pirate",
                    "type": "custom",
                    "base_model": "llama3:latest",
                    "system_prompt": "talk like a pirate"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = client(&server).list_models().await.unwrap();

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].kind, ModelKind::Base);
    assert_eq!(models[0].parameter_size.as_deref(), Some("8B"));
    assert_eq!(models[1].kind, ModelKind::Custom);
    assert_eq!(models[1].base_model.as_deref(), Some("llama3:latest"));
}

#[tokio::test]
async fn create_chat_posts_model_and_optional_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "model": "llama3", "title": "Trip plans" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "chat_id": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chat_id = client(&server)
        .create_chat("llama3", Some("Trip plans"))
        .await
        .unwrap();

    assert_eq!(chat_id, ChatId::new(42));
}

#[tokio::test]
async fn get_chat_returns_summary_and_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "chat": {
                "id": 42,
                "title": "Trip plans",
                "model": "llama3",
                "created_at": "2024-05-01 10:00:00",
                "updated_at": "2024-05-01 10:05:00"
            },
            "messages": [
                { "role": "user", "content": "Where to?", "created_at": "2024-05-01 10:00:01" },
                { "role": "assistant", "content": "Lisbon.", "created_at": "2024-05-01 10:00:05" }
            ]
        })))
        .mount(&server)
        .await;

    let detail = client(&server).get_chat(ChatId::new(42)).await.unwrap();

    assert_eq!(detail.chat.title, "Trip plans");
    assert_eq!(detail.messages.len(), 2);
    assert_eq!(detail.messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn missing_chat_surfaces_server_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "Chat not found"
        })))
        .mount(&server)
        .await;

    let error = client(&server).get_chat(ChatId::new(404)).await.unwrap_err();

    assert!(matches!(error, ClientError::ServerRejected { .. }));
    assert_eq!(error.to_string(), "Chat not found");
}

#[tokio::test]
async fn delete_chat_accepts_bare_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete_chat(ChatId::new(7)).await.unwrap();
}

#[tokio::test]
async fn custom_model_lifecycle_uses_expected_verbs() {
    let server = MockServer::start().await;
    let draft = CustomModelDraft::new("pirate", "llama3", "talk like a pirate");
    Mock::given(method("POST"))
        .and(path("/api/custom-model"))
        .and(body_json(json!({
            "name": "pirate",
            "base_model": "llama3",
            "system_prompt": "talk like a pirate"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "model_id": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/custom-model/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/custom-models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "models": [{
                "id": 3,
                "name": "pirate",
                "base_model": "llama3",
                "system_prompt": "talk like a pirate",
                "created_at": "2024-05-01 10:00:00",
                "updated_at": "2024-05-01 10:00:00"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/custom-model/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let model_id = api.create_custom_model(&draft).await.unwrap();
    assert_eq!(model_id, CustomModelId::new(3));
    api.update_custom_model(model_id, &draft).await.unwrap();
    let models = api.list_custom_models().await.unwrap();
    assert_eq!(models[0].id, model_id);
    api.delete_custom_model(model_id).await.unwrap();
}

#[tokio::test]
async fn duplicate_custom_model_name_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/custom-model"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "Model name already exists"
        })))
        .mount(&server)
        .await;

    let error = client(&server)
        .create_custom_model(&CustomModelDraft::new("pirate", "llama3", "arr"))
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Model name already exists");
}

#[tokio::test]
async fn html_error_page_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let error = client(&server).list_chats().await.unwrap_err();

    assert!(matches!(error, ClientError::ServerStatus { status: 502, .. }));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(Url::parse(&format!("http://{address}")).unwrap());
    let error = api.list_chats().await.unwrap_err();

    assert!(matches!(error, ClientError::HttpClient { .. }));
}
