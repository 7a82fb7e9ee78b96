//! Mocks shared by the agent tests

#![allow(dead_code)]

use async_trait::async_trait;
use chartwise_agent::ToolRegistry;
use chartwise_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};
use chartwise_superset::{
    ChartSpec, CreatedChart, DatabaseSummary, DatasetSummary, QueryResult, SupersetApi,
    SupersetError,
};
use mockall::mock;
use serde_json::Value;
use std::sync::Arc;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

mock! {
    pub Superset {}

    #[async_trait]
    impl SupersetApi for Superset {
        async fn list_databases(&self) -> Result<Vec<DatabaseSummary>, SupersetError>;
        async fn database_schemas(&self, database_id: i64) -> Result<Vec<String>, SupersetError>;
        async fn database_tables(
            &self,
            database_id: i64,
            schema_name: Option<String>,
        ) -> Result<Vec<String>, SupersetError>;
        async fn execute_sql(&self, database_id: i64, sql: String) -> Result<QueryResult, SupersetError>;
        async fn create_chart(&self, chart: ChartSpec) -> Result<CreatedChart, SupersetError>;
        async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, SupersetError>;
    }
}

pub fn registry(superset: MockSuperset) -> ToolRegistry {
    ToolRegistry::new(Arc::new(superset))
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ChatResponse {
    ChatResponse::with_tool_calls(vec![ToolCall::new(id, name, arguments)])
}
