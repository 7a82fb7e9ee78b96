//! Records exchanged with Superset

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Database connection as listed by `/api/v1/database/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub id: i64,
    #[serde(alias = "database_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl DatabaseSummary {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            backend: None,
        }
    }
}

/// Dataset (physical or virtual table) as listed by `/api/v1/dataset/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: i64,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatasetDatabase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDatabase {
    pub id: i64,
    pub database_name: String,
}

/// Rows returned by a synchronous SQL Lab execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub data: Vec<Map<String, Value>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasourceType {
    Table,
    Query,
}

impl DatasourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasourceType::Table => "table",
            DatasourceType::Query => "query",
        }
    }
}

/// Chart to create through `/api/v1/chart/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub slice_name: String,
    pub datasource_id: i64,
    pub datasource_type: DatasourceType,
    pub viz_type: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedChart {
    pub id: i64,
    pub url: String,
}

/// New database connection, as registered by the smoke-test flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDatabase {
    pub database_name: String,
    pub sqlalchemy_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}
