//! Superset REST collaborator
//!
//! `SupersetApi` is the set of operations the agent may invoke; `SupersetClient`
//! implements it over Superset's `/api/v1` endpoints.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod client;
pub mod types;

pub use client::SupersetClient;
pub use types::{
    ChartSpec, CreatedChart, DatabaseSummary, DatasetSummary, DatasourceType, NewDatabase,
    QueryResult,
};

/// Superset client errors
#[derive(Error, Debug)]
pub enum SupersetError {
    #[error("request to Superset failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON from Superset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Superset API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected Superset response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, SupersetError>;

/// Operations exposed to the agent
#[async_trait]
pub trait SupersetApi: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>>;

    async fn database_schemas(&self, database_id: i64) -> Result<Vec<String>>;

    /// Without a schema, tables of every schema are listed as `schema.table`
    async fn database_tables(
        &self,
        database_id: i64,
        schema_name: Option<String>,
    ) -> Result<Vec<String>>;

    async fn execute_sql(&self, database_id: i64, sql: String) -> Result<QueryResult>;

    async fn create_chart(&self, chart: ChartSpec) -> Result<CreatedChart>;

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>>;
}

/// Pull a human-readable message out of a Superset error body
pub(crate) fn error_message(body: &Value) -> Option<String> {
    let text = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    text(&body["message"])
        .or_else(|| text(&body["msg"]))
        .or_else(|| {
            body["errors"]
                .as_array()
                .and_then(|errs| errs.first())
                .and_then(|e| text(&e["message"]))
        })
}
