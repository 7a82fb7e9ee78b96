//! Ollama native chat API (`/api/chat`)

use crate::*;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "llama3";

pub struct OllamaProvider {
    client: Client,
    host: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(host: Option<String>, default_model: Option<String>) -> Result<Self> {
        // Local models can take minutes on a cold start
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        let host = host
            .unwrap_or_else(|| OLLAMA_HOST.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            host,
            default_model: default_model.unwrap_or_else(|| OLLAMA_MODEL.to_string()),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn build_request(&self, params: &ChatParams) -> Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<Value> = params
            .messages
            .iter()
            .map(|m| {
                let mut obj = json!({
                    "role": m.role.as_str(),
                    "content": m.content.clone().unwrap_or_default(),
                });
                if let Some(tool_calls) = &m.tool_calls {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "function": {
                                    "name": &tc.function.name,
                                    "arguments": &tc.function.arguments,
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                }
                if let Some(name) = &m.name {
                    // Older servers read `name`, newer ones `tool_name`
                    obj["name"] = json!(name);
                    obj["tool_name"] = json!(name);
                }
                obj
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            },
        });

        if !params.tools.is_empty() && !matches!(params.tool_choice, ToolChoice::None) {
            body["tools"] = json!(params.tools);
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<ChatResponse> {
        let message = json
            .get("message")
            .filter(|m| m.is_object())
            .ok_or(ProviderError::InvalidResponse)?;

        let content = message["content"].as_str().map(|s| s.to_string());

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                // Nameless calls are kept so dispatch can report them
                let name = function["name"].as_str().unwrap_or("").to_string();
                // Some models emit arguments as an encoded string; unparsable text stays raw
                let arguments = match &function["arguments"] {
                    Value::String(s) => {
                        serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
                    }
                    Value::Null => json!({}),
                    other => other.clone(),
                };
                let id = call["id"]
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(generated_call_id);

                tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments,
                });
            }
        }

        let prompt_tokens = json["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = json["eval_count"].as_u64().unwrap_or(0) as u32;

        let finish_reason = if tool_calls.is_empty() {
            json["done_reason"].as_str().unwrap_or("stop").to_string()
        } else {
            "tool_calls".to_string()
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }
}

#[async_trait::async_trait]
impl Provider for OllamaProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        trace!("Ollama chat request to {}", self.host);

        let url = format!("{}/api/chat", self.host);
        let body = self.build_request(&params);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(|s| s.to_string()))
                .unwrap_or(text);
            return Err(ProviderError::Api(format!("{}: {}", status, error)));
        }

        let json: Value = response.json().await?;
        debug!(
            "Ollama returned {} tool calls",
            json["message"]["tool_calls"]
                .as_array()
                .map(|v| v.len())
                .unwrap_or(0)
        );

        self.parse_response(json)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }
}
