//! Superset tool catalogue and dispatch

mod command;

pub use command::{SchemasArgs, SqlArgs, TablesArgs, ToolCommand};

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use chartwise_provider::Tool;
use chartwise_superset::SupersetApi;

use crate::{AgentError, Result};

/// The operations the model may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    DatabaseList,
    DatabaseGetTables,
    DatabaseSchemas,
    SqllabExecuteQuery,
    ChartCreate,
    DatasetList,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::DatabaseList,
        ToolName::DatabaseGetTables,
        ToolName::DatabaseSchemas,
        ToolName::SqllabExecuteQuery,
        ToolName::ChartCreate,
        ToolName::DatasetList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::DatabaseList => "superset_database_list",
            ToolName::DatabaseGetTables => "superset_database_get_tables",
            ToolName::DatabaseSchemas => "superset_database_schemas",
            ToolName::SqllabExecuteQuery => "superset_sqllab_execute_query",
            ToolName::ChartCreate => "superset_chart_create",
            ToolName::DatasetList => "superset_dataset_list",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::DatabaseList => "List all databases available in Superset",
            ToolName::DatabaseGetTables => "List tables in a specific database",
            ToolName::DatabaseSchemas => "List schemas in a specific database",
            ToolName::SqllabExecuteQuery => "Execute a SQL query against a database",
            ToolName::ChartCreate => "Create a new chart in Superset",
            ToolName::DatasetList => "List available datasets",
        }
    }

    /// JSON schema of the argument mapping
    pub fn parameters(&self) -> Value {
        match self {
            ToolName::DatabaseList | ToolName::DatasetList => json!({
                "type": "object",
                "properties": {},
            }),
            ToolName::DatabaseGetTables => json!({
                "type": "object",
                "properties": {
                    "database_id": {"type": "integer", "description": "ID of the database"},
                    "schema_name": {
                        "type": "string",
                        "description": "Schema to list tables from (required for Trino)"
                    }
                },
                "required": ["database_id"]
            }),
            ToolName::DatabaseSchemas => json!({
                "type": "object",
                "properties": {
                    "database_id": {"type": "integer", "description": "ID of the database"}
                },
                "required": ["database_id"]
            }),
            ToolName::SqllabExecuteQuery => json!({
                "type": "object",
                "properties": {
                    "database_id": {"type": "integer", "description": "ID of the database"},
                    "sql": {"type": "string", "description": "SQL statement to run"}
                },
                "required": ["database_id", "sql"]
            }),
            ToolName::ChartCreate => json!({
                "type": "object",
                "properties": {
                    "slice_name": {"type": "string", "description": "Chart title"},
                    "datasource_id": {"type": "integer", "description": "ID of the dataset or query"},
                    "datasource_type": {"type": "string", "enum": ["table", "query"]},
                    "viz_type": {
                        "type": "string",
                        "description": "Visualization type, e.g. table, big_number, pie, echarts_timeseries_line"
                    },
                    "params": {"type": "object", "description": "Chart form data"}
                },
                "required": ["slice_name", "datasource_id", "datasource_type", "viz_type", "params"]
            }),
        }
    }

    pub fn required_args(&self) -> Vec<String> {
        self.parameters()["required"]
            .as_array()
            .map(|req| {
                req.iter()
                    .filter_map(|r| r.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn definition(&self) -> Tool {
        Tool::new(self.as_str(), self.description(), self.parameters())
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = AgentError;

    fn from_str(name: &str) -> Result<Self> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }
}

/// Dispatches decoded tool calls to the injected Superset collaborator
#[derive(Clone)]
pub struct ToolRegistry {
    api: Arc<dyn SupersetApi>,
}

impl ToolRegistry {
    pub fn new(api: Arc<dyn SupersetApi>) -> Self {
        Self { api }
    }

    /// Schemas offered to the model, one per dispatchable operation
    pub fn definitions(&self) -> Vec<Tool> {
        ToolName::ALL.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        ToolName::ALL.iter().map(|t| t.as_str()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        name.parse::<ToolName>().is_ok()
    }

    /// Run one decoded command against Superset
    pub async fn execute(&self, command: ToolCommand) -> Result<Value> {
        let value = match command {
            ToolCommand::ListDatabases => payload(self.api.list_databases().await?),
            ToolCommand::ListSchemas(args) => {
                payload(self.api.database_schemas(args.database_id).await?)
            }
            ToolCommand::ListTables(args) => payload(
                self.api
                    .database_tables(args.database_id, args.schema_name)
                    .await?,
            ),
            ToolCommand::ExecuteSql(args) => {
                payload(self.api.execute_sql(args.database_id, args.sql).await?)
            }
            ToolCommand::CreateChart(chart) => payload(self.api.create_chart(chart).await?),
            ToolCommand::ListDatasets => payload(self.api.list_datasets().await?),
        };
        Ok(value)
    }

    /// Dispatch a model tool call by name; failures become `{"error": ...}`
    pub async fn dispatch(&self, name: &str, args: Value) -> Value {
        info!("Invoking tool {}", name);

        let command = match ToolCommand::parse(name, args) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected tool call {}: {}", name, e);
                return json!({ "error": e.to_string() });
            }
        };

        match self.execute(command).await {
            Ok(value) => value,
            Err(e) => {
                error!("Tool {} failed: {}", name, e);
                json!({ "error": e.to_string() })
            }
        }
    }
}

/// Serialize a tool result for the conversation
pub fn render(value: &Value) -> String {
    value.to_string()
}

fn payload<T: Serialize + fmt::Debug>(result: T) -> Value {
    serde_json::to_value(&result).unwrap_or_else(|_| Value::String(format!("{:?}", result)))
}
