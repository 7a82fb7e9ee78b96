//! Provider trait objects
//!
//! The CLI hands the agent a `Box<dyn Provider>`; these tests make sure the
//! boxed form forwards every call to the inner backend.

use async_trait::async_trait;
use chartwise_provider::{
    ChatParams, ChatResponse, Message, Provider, ProviderError, ToolCall, ToolChoice,
};
use mockall::mock;
use serde_json::json;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

async fn ask(provider: &dyn Provider, text: &str) -> Result<ChatResponse, ProviderError> {
    let params = ChatParams {
        model: provider.default_model(),
        messages: vec![Message::user(text)],
        tools: vec![],
        max_tokens: 100,
        temperature: 0.7,
        tool_choice: ToolChoice::Auto,
    };
    provider.chat(params).await
}

#[tokio::test]
async fn test_boxed_provider_forwards_chat() {
    let mut mock = MockProvider::new();
    mock.expect_default_model()
        .returning(|| "llama3".to_string());
    mock.expect_chat()
        .times(1)
        .withf(|params| params.model == "llama3" && params.messages.len() == 1)
        .returning(|_| Ok(ChatResponse::text("Processed!")));

    let boxed: Box<dyn Provider> = Box::new(mock);
    let response = ask(&boxed, "Hello").await.unwrap();
    assert_eq!(response.content.as_deref(), Some("Processed!"));
}

#[tokio::test]
async fn test_boxed_provider_forwards_errors() {
    let mut mock = MockProvider::new();
    mock.expect_default_model().returning(String::new);
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::Api("model 'llama9' not found".to_string())));

    let boxed: Box<dyn Provider> = Box::new(mock);
    let err = ask(&boxed, "Hello").await.unwrap_err();
    assert!(err.to_string().contains("llama9"));
}

#[tokio::test]
async fn test_boxed_provider_tool_calls() {
    let mut mock = MockProvider::new();
    mock.expect_default_model()
        .returning(|| "llama3".to_string());
    mock.expect_chat().times(1).returning(|_| {
        Ok(ChatResponse::with_tool_calls(vec![ToolCall::new(
            "call_1",
            "superset_database_list",
            json!({}),
        )]))
    });

    let boxed: Box<dyn Provider> = Box::new(mock);
    let response = ask(&boxed, "list databases").await.unwrap();
    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].name, "superset_database_list");
}

#[test]
fn test_boxed_provider_metadata() {
    let mut mock = MockProvider::new();
    mock.expect_is_configured().times(1).returning(|| false);
    mock.expect_default_model()
        .times(1)
        .returning(|| "gpt-4o".to_string());

    let boxed: Box<dyn Provider> = Box::new(mock);
    assert!(!boxed.is_configured());
    assert_eq!(boxed.default_model(), "gpt-4o");
}
