//! Analyst agent core
//!
//! Builds the analyst conversation, exposes the Superset operations as a
//! closed tool catalogue and drives the bounded tool-calling loop.

use thiserror::Error;

use chartwise_provider::ProviderError;
use chartwise_superset::SupersetError;

pub mod context;
pub mod loop_agent;
pub mod tools;

pub use context::{ContextBuilder, DEFAULT_SYSTEM_PROMPT};
pub use loop_agent::{AgentLoop, AgentReply, Outcome};
pub use tools::{ToolCommand, ToolName, ToolRegistry};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Superset(#[from] SupersetError),

    #[error("Error communicating with the language model: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
