//! Typed tool invocations

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use chartwise_superset::ChartSpec;

use super::ToolName;
use crate::{AgentError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemasArgs {
    #[serde(deserialize_with = "database_id")]
    pub database_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TablesArgs {
    #[serde(deserialize_with = "database_id")]
    pub database_id: i64,
    #[serde(default)]
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqlArgs {
    #[serde(deserialize_with = "database_id")]
    pub database_id: i64,
    pub sql: String,
}

/// A model tool call decoded into one of the six operations
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    ListDatabases,
    ListSchemas(SchemasArgs),
    ListTables(TablesArgs),
    ExecuteSql(SqlArgs),
    CreateChart(ChartSpec),
    ListDatasets,
}

impl ToolCommand {
    /// Decode a tool name and its argument mapping
    pub fn parse(name: &str, args: Value) -> Result<Self> {
        let tool: ToolName = name.parse()?;

        Ok(match tool {
            ToolName::DatabaseList => ToolCommand::ListDatabases,
            ToolName::DatabaseSchemas => ToolCommand::ListSchemas(decode(tool, args)?),
            ToolName::DatabaseGetTables => ToolCommand::ListTables(decode(tool, args)?),
            ToolName::SqllabExecuteQuery => ToolCommand::ExecuteSql(decode(tool, args)?),
            ToolName::ChartCreate => ToolCommand::CreateChart(decode(tool, args)?),
            ToolName::DatasetList => ToolCommand::ListDatasets,
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolCommand::ListDatabases => ToolName::DatabaseList,
            ToolCommand::ListSchemas(_) => ToolName::DatabaseSchemas,
            ToolCommand::ListTables(_) => ToolName::DatabaseGetTables,
            ToolCommand::ExecuteSql(_) => ToolName::SqllabExecuteQuery,
            ToolCommand::CreateChart(_) => ToolName::ChartCreate,
            ToolCommand::ListDatasets => ToolName::DatasetList,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, args: Value) -> Result<T> {
    let invalid = |message: String| AgentError::InvalidArguments {
        tool: tool.as_str().to_string(),
        message,
    };

    let args = match args {
        // Models send `null` for argument-less calls
        Value::Null => Value::Object(Map::new()),
        // Backends pass through argument text they could not parse
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| invalid(format!("arguments are not valid JSON ({}): {}", e, raw)))?,
        other => other,
    };

    serde_json::from_value(args).map_err(|e| invalid(e.to_string()))
}

/// Accepts `1` as well as `"1"`
fn database_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Number(id) => Ok(id),
        Id::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("database_id is not an integer: {:?}", text))),
    }
}
