//! Agent loop: one model call per round, then the requested tools in order

use std::sync::Arc;
use tracing::{debug, error, info};

use chartwise_config::{Config, DEFAULT_EXHAUSTION_MESSAGE, DEFAULT_MAX_ROUNDS};
use chartwise_provider::{ChatParams, ChatResponse, Message, Provider, ToolChoice};

use crate::context::ContextBuilder;
use crate::tools::{self, ToolRegistry};
use crate::AgentError;

/// How a query ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The model replied without requesting tools
    Answer,
    /// Every round requested tools
    BudgetExhausted,
    /// The model could not be reached
    ModelFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub outcome: Outcome,
    pub text: String,
    /// Model calls made for this query
    pub rounds: u32,
}

/// Bounded tool-calling loop over one conversation
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    context: ContextBuilder,
    model: String,
    max_rounds: u32,
    exhaustion_message: String,
    max_tokens: u32,
    temperature: f32,
    history: Vec<Message>,
}

impl<P: Provider> AgentLoop<P> {
    /// Create an agent with the default prompt and budget
    pub fn new(provider: P, tools: ToolRegistry, model: impl Into<String>) -> Self {
        let context = ContextBuilder::new();
        let history = context.initial_messages();
        let defaults = ChatParams::default();

        Self {
            provider: Arc::new(provider),
            tools,
            context,
            model: model.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            exhaustion_message: DEFAULT_EXHAUSTION_MESSAGE.to_string(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            history,
        }
    }

    /// Create an agent with model, budget and prompt taken from the config
    pub fn from_config(provider: P, tools: ToolRegistry, config: &Config) -> Self {
        Self::new(provider, tools, config.model_name())
            .with_context(ContextBuilder::from_config(&config.agent))
            .with_max_rounds(config.max_rounds())
            .with_exhaustion_message(config.agent.exhaustion_message.clone())
            .with_sampling(config.model.max_tokens, config.model.temperature)
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_exhaustion_message(mut self, message: impl Into<String>) -> Self {
        self.exhaustion_message = message.into();
        self
    }

    /// Replace the prompt; the conversation starts over
    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.history = context.initial_messages();
        self.context = context;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Conversation so far, starting with the system prompt
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop every turn except the system prompt
    pub fn reset(&mut self) {
        self.history = self.context.initial_messages();
    }

    /// Process a query and return only the reply text
    pub async fn process(&mut self, query: &str) -> String {
        self.run(query).await.text
    }

    /// Process a query through at most `max_rounds` model calls
    pub async fn run(&mut self, query: &str) -> AgentReply {
        info!("Processing query ({} chars)", query.len());
        ContextBuilder::add_user_message(&mut self.history, query);

        for round in 1..=self.max_rounds {
            debug!("Agent round {}/{}", round, self.max_rounds);

            let response = match self.complete().await {
                Ok(response) => response,
                Err(e) => {
                    error!("Model call failed in round {}: {}", round, e);
                    return AgentReply {
                        outcome: Outcome::ModelFailure,
                        text: e.to_string(),
                        rounds: round,
                    };
                }
            };

            ContextBuilder::add_assistant_message(
                &mut self.history,
                response.content.as_deref(),
                &response.tool_calls,
            );

            if !response.has_tool_calls() {
                return AgentReply {
                    outcome: Outcome::Answer,
                    text: response.content.unwrap_or_default(),
                    rounds: round,
                };
            }

            for call in &response.tool_calls {
                debug!("Executing tool: {}", call.name);
                let result = self
                    .tools
                    .dispatch(&call.name, call.arguments.clone())
                    .await;
                ContextBuilder::add_tool_result(
                    &mut self.history,
                    &call.id,
                    &call.name,
                    &tools::render(&result),
                );
            }
        }

        info!(
            "No final answer after {} rounds, returning exhaustion message",
            self.max_rounds
        );
        AgentReply {
            outcome: Outcome::BudgetExhausted,
            text: self.exhaustion_message.clone(),
            rounds: self.max_rounds,
        }
    }

    async fn complete(&self) -> crate::Result<ChatResponse> {
        let model = if self.model.is_empty() {
            self.provider.default_model()
        } else {
            self.model.clone()
        };

        let params = ChatParams {
            model,
            messages: self.history.clone(),
            tools: self.tools.definitions(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tool_choice: ToolChoice::Auto,
        };

        self.provider.chat(params).await.map_err(AgentError::from)
    }
}
