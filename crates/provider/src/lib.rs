//! Chat-completion providers
//!
//! The narrow contract the agent loop speaks to a language model: a message
//! history plus tool schemas in, one assistant message out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use chartwise_config::{Backend, ModelConfig};

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model service rejected request: {0}")]
    Api(String),

    #[error("no API key configured")]
    NoApiKey,

    #[error("invalid response from model service")]
    InvalidResponse,

    #[error("rate limited by model service")]
    RateLimited,
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Model response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Assistant turn that requested tool invocations
    pub fn assistant_tool_calls(content: Option<String>, calls: &[ToolCall]) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = Some(
            calls
                .iter()
                .map(|tc| ToolCallDef::new(&tc.id, &tc.name, tc.arguments.clone()))
                .collect(),
        );
        msg
    }

    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Tool, Some(result.into()));
        msg.tool_call_id = Some(call_id.into());
        msg.name = Some(name.into());
        msg
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Tool call as echoed back in an assistant message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDef {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCallDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// Tool schema offered to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tool_choice: ToolChoice,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 4096,
            temperature: 0.7,
            tool_choice: ToolChoice::Auto,
        }
    }
}

/// Tool selection mode
#[derive(Debug, Clone)]
pub enum ToolChoice {
    Auto,
    None,
}

/// Chat-completion backend
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Box<T> {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        (**self).chat(params).await
    }

    fn default_model(&self) -> String {
        (**self).default_model()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
}

/// Build the backend selected in the model config
pub fn build_provider(config: &ModelConfig) -> Result<Box<dyn Provider>> {
    match config.backend {
        Backend::Ollama => Ok(Box::new(OllamaProvider::new(
            config.api_base.clone(),
            Some(config.name.clone()),
        )?)),
        Backend::Openai => {
            if config.api_key.is_empty() {
                return Err(ProviderError::NoApiKey);
            }
            Ok(Box::new(OpenAiProvider::new(
                config.api_key.clone(),
                config.api_base.clone(),
                Some(config.name.clone()),
            )))
        }
    }
}

/// Synthesize a call id for backends that do not assign one
pub(crate) fn generated_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_error_display() {
        assert_eq!(ProviderError::NoApiKey.to_string(), "no API key configured");
        assert_eq!(
            ProviderError::Api("model not found".to_string()).to_string(),
            "model service rejected request: model not found"
        );
        assert_eq!(
            ProviderError::InvalidResponse.to_string(),
            "invalid response from model service"
        );
        assert_eq!(
            ProviderError::RateLimited.to_string(),
            "rate limited by model service"
        );
    }

    #[test]
    fn test_chat_response_text_builder() {
        let response = ChatResponse::text("Found 1 database: examples");
        assert_eq!(
            response.content.as_deref(),
            Some("Found 1 database: examples")
        );
        assert!(!response.has_tool_calls());
        assert_eq!(response.finish_reason, "stop");
    }

    #[test]
    fn test_chat_response_with_tool_calls() {
        let response = ChatResponse::with_tool_calls(vec![ToolCall::new(
            "call_1",
            "superset_database_list",
            json!({}),
        )]);
        assert!(response.has_tool_calls());
        assert!(response.content.is_none());
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("You are an analyst");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content.as_deref(), Some("You are an analyst"));
        assert!(msg.tool_calls.is_none());

        let msg = Message::user("show me sales by region");
        assert_eq!(msg.role, Role::User);

        let msg = Message::tool("call_9", "superset_dataset_list", "[]");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(msg.name.as_deref(), Some("superset_dataset_list"));
        assert_eq!(msg.content.as_deref(), Some("[]"));
    }

    #[test]
    fn test_assistant_tool_calls_message() {
        let calls = vec![
            ToolCall::new("a", "superset_database_list", json!({})),
            ToolCall::new("b", "superset_database_schemas", json!({"database_id": 1})),
        ];
        let msg = Message::assistant_tool_calls(None, &calls);

        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_none());
        assert!(msg.has_tool_calls());
        let defs = msg.tool_calls.unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].function.name, "superset_database_schemas");
        assert_eq!(defs[1].function.arguments["database_id"], 1);
        assert_eq!(defs[0].call_type, "function");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json_str = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json_str.contains("\"role\":\"user\""));
        assert!(!json_str.contains("tool_calls"));
        assert_eq!(Role::Tool.as_str(), "tool");
    }

    #[test]
    fn test_tool_new() {
        let tool = Tool::new("superset_dataset_list", "List datasets", json!({}));
        assert_eq!(tool.tool_type, "function");
        assert_eq!(tool.name(), "superset_dataset_list");
        assert_eq!(tool.function.description, "List datasets");
    }

    #[test]
    fn test_chat_params_default() {
        let params = ChatParams::default();
        assert!(params.model.is_empty());
        assert_eq!(params.max_tokens, 4096);
        assert!(matches!(params.tool_choice, ToolChoice::Auto));
    }

    #[test]
    fn test_build_provider_ollama() {
        let config = ModelConfig::default();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.default_model(), "llama3");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_build_provider_openai_requires_key() {
        let config = ModelConfig {
            backend: Backend::Openai,
            ..ModelConfig::default()
        };
        assert!(matches!(
            build_provider(&config),
            Err(ProviderError::NoApiKey)
        ));
    }

    #[test]
    fn test_generated_call_id_prefix() {
        let a = generated_call_id();
        let b = generated_call_id();
        assert!(a.starts_with("call_"));
        assert_ne!(a, b);
    }
}
