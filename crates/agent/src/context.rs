//! Conversation assembly for the analyst agent

use chartwise_config::AgentConfig;
use chartwise_provider::{Message, ToolCall};

/// Built-in analyst prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Chartwise, a data analyst working inside Apache Superset. You answer questions by exploring the connected databases and building charts with the tools you are given.

Work through these steps:
1. Call superset_database_list to find the database that holds the data.
2. Call superset_database_schemas for that database. Engines such as Trino expose several catalogs and schemas, so pick a schema before listing tables.
3. Call superset_database_get_tables with the database_id and the schema_name you picked.
4. When unsure about columns or values, preview them with superset_sqllab_execute_query and a small LIMIT.
5. Create the chart with superset_chart_create. Usual viz_type values are table, big_number, echarts_timeseries_line, echarts_timeseries_bar and pie. datasource_type is "table" for a dataset and "query" for a saved query; superset_dataset_list shows the datasets that exist.
6. Reply with a short summary and the chart URL returned by superset_chart_create.

If a request is ambiguous, ask one clarifying question instead of guessing. When a tool returns an error, read it and correct the next call."#;

/// Builds the system prompt and appends conversation turns
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: prompt.into(),
        }
    }

    /// Use the configured prompt when one is set
    pub fn from_config(config: &AgentConfig) -> Self {
        match config.system_prompt.as_deref().map(str::trim) {
            Some(prompt) if !prompt.is_empty() => Self::with_system_prompt(prompt),
            _ => Self::new(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// History of a fresh conversation
    pub fn initial_messages(&self) -> Vec<Message> {
        vec![Message::system(self.system_prompt.clone())]
    }

    pub fn add_user_message(messages: &mut Vec<Message>, content: &str) {
        messages.push(Message::user(content));
    }

    /// Add the model's turn, keeping the tool calls it requested
    pub fn add_assistant_message(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: &[ToolCall],
    ) {
        if tool_calls.is_empty() {
            messages.push(Message::assistant(content.unwrap_or("")));
        } else {
            messages.push(Message::assistant_tool_calls(
                content.map(|c| c.to_string()),
                tool_calls,
            ));
        }
    }

    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        name: &str,
        result: &str,
    ) {
        messages.push(Message::tool(tool_call_id, name, result));
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
