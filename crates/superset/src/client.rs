//! HTTP client for Superset's `/api/v1`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use chartwise_config::SupersetConfig;

use crate::types::{
    ChartSpec, CreatedChart, DatabaseSummary, DatasetSummary, NewDatabase, QueryResult,
};
use crate::{error_message, Result, SupersetApi, SupersetError};

#[derive(Debug, Default)]
struct Session {
    access_token: Option<String>,
    csrf_token: Option<String>,
}

pub struct SupersetClient {
    client: Client,
    base_url: String,
    auth_provider: String,
    session: RwLock<Session>,
}

impl SupersetClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, "db", Duration::from_secs(60))
    }

    pub fn from_config(config: &SupersetConfig) -> Result<Self> {
        Self::with_options(
            config.base_url.clone(),
            config.auth_provider.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_options(
        base_url: impl Into<String>,
        auth_provider: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        // The CSRF token is bound to the session cookie
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_provider: auth_provider.into(),
            session: RwLock::new(Session::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.access_token.is_some()
    }

    /// Log in and keep the access token (and CSRF token, when issued) for later calls
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        info!("Authenticating to Superset at {} as {}", self.base_url, username);

        let body = json!({
            "username": username,
            "password": password,
            "provider": &self.auth_provider,
            "refresh": true,
        });
        let response = self
            .client
            .post(self.url("/api/v1/security/login"))
            .json(&body)
            .send()
            .await?;

        let json = match Self::read_json(response).await {
            Ok(json) => json,
            Err(SupersetError::Api { status, message }) => {
                return Err(SupersetError::Auth(format!("{} ({})", message, status)))
            }
            Err(e) => return Err(e),
        };

        let token = json["access_token"]
            .as_str()
            .ok_or_else(|| SupersetError::Auth("no access_token in login response".to_string()))?
            .to_string();

        self.session.write().await.access_token = Some(token);

        match self.fetch_csrf_token().await {
            Ok(csrf) => self.session.write().await.csrf_token = Some(csrf),
            Err(e) => warn!("No CSRF token issued, continuing without one: {}", e),
        }

        Ok(())
    }

    async fn fetch_csrf_token(&self) -> Result<String> {
        let json = self.get("/api/v1/security/csrf_token/", &[]).await?;
        json["result"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| SupersetError::InvalidResponse("csrf_token without result".to_string()))
    }

    /// Register a database connection
    pub async fn create_database(&self, database: &NewDatabase) -> Result<Value> {
        let mut body = json!({
            "database_name": &database.database_name,
            "sqlalchemy_uri": &database.sqlalchemy_uri,
            "configuration_method": "sqlalchemy_form",
            "expose_in_sqllab": true,
        });
        if let Some(engine) = &database.engine {
            body["engine"] = json!(engine);
        }
        self.post("/api/v1/database/", &body).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorize(&self, request: RequestBuilder, with_csrf: bool) -> RequestBuilder {
        let session = self.session.read().await;
        let mut request = request;
        if let Some(token) = &session.access_token {
            request = request.bearer_auth(token);
        }
        if with_csrf {
            if let Some(csrf) = &session.csrf_token {
                request = request
                    .header("X-CSRFToken", csrf)
                    .header("Referer", &self.base_url);
            }
        }
        request
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        trace!("GET {}", path);
        let request = self.client.get(self.url(path));
        let request = if query.is_empty() {
            request
        } else {
            request.query(query)
        };
        let response = self.authorize(request, false).await.send().await?;
        Self::read_json(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        trace!("POST {}", path);
        let request = self.client.post(self.url(path)).json(body);
        let response = self.authorize(request, true).await.send().await?;
        Self::read_json(response).await
    }

    async fn read_json(response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        debug!("Superset responded {} ({} bytes)", status, text.len());

        let json: Value = if text.trim().is_empty() {
            Value::Null
        } else if status.is_success() {
            serde_json::from_str(&text)?
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() {
            let message = match &json {
                Value::String(s) => s.clone(),
                other => error_message(other).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                }),
            };
            return Err(SupersetError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(json)
    }

    fn result_array(json: &Value, endpoint: &str) -> Result<Vec<Value>> {
        json["result"]
            .as_array()
            .cloned()
            .ok_or_else(|| SupersetError::InvalidResponse(format!("{} without result list", endpoint)))
    }

    async fn tables_in_schema(&self, database_id: i64, schema: &str) -> Result<Vec<String>> {
        let query = format!("(schema_name:{})", rison_string(schema));
        let json = self
            .get(
                &format!("/api/v1/database/{}/tables/", database_id),
                &[("q", query)],
            )
            .await?;

        let tables = Self::result_array(&json, "tables")?
            .iter()
            .filter_map(|t| {
                t["value"]
                    .as_str()
                    .or_else(|| t["table_name"].as_str())
                    .or_else(|| t.as_str())
                    .map(|s| s.to_string())
            })
            .collect();
        Ok(tables)
    }
}

#[async_trait]
impl SupersetApi for SupersetClient {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let json = self.get("/api/v1/database/", &[]).await?;
        let databases = Self::result_array(&json, "database list")?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<DatabaseSummary>, _>>()?;
        Ok(databases)
    }

    async fn database_schemas(&self, database_id: i64) -> Result<Vec<String>> {
        let json = self
            .get(&format!("/api/v1/database/{}/schemas/", database_id), &[])
            .await?;
        Ok(Self::result_array(&json, "schemas")?
            .iter()
            .filter_map(|s| s.as_str().map(|s| s.to_string()))
            .collect())
    }

    async fn database_tables(
        &self,
        database_id: i64,
        schema_name: Option<String>,
    ) -> Result<Vec<String>> {
        if let Some(schema) = schema_name.filter(|s| !s.is_empty()) {
            return self.tables_in_schema(database_id, &schema).await;
        }

        let mut tables = Vec::new();
        for schema in self.database_schemas(database_id).await? {
            for table in self.tables_in_schema(database_id, &schema).await? {
                tables.push(format!("{}.{}", schema, table));
            }
        }
        Ok(tables)
    }

    async fn execute_sql(&self, database_id: i64, sql: String) -> Result<QueryResult> {
        let body = json!({
            "database_id": database_id,
            "sql": sql,
            "runAsync": false,
        });
        let json = self.post("/api/v1/sqllab/execute/", &body).await?;

        if let Some(status) = json["status"].as_str() {
            if status != "success" {
                let message = error_message(&json).unwrap_or_else(|| format!("query {}", status));
                return Err(SupersetError::InvalidResponse(message));
            }
        }

        let columns = json["columns"]
            .as_array()
            .map(|cols| {
                cols.iter()
                    .filter_map(|c| {
                        c["name"]
                            .as_str()
                            .or_else(|| c["column_name"].as_str())
                            .map(|s| s.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let data: Vec<Map<String, Value>> = json["data"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|r| r.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(QueryResult {
            columns,
            row_count: data.len(),
            data,
        })
    }

    async fn create_chart(&self, chart: ChartSpec) -> Result<CreatedChart> {
        let body = json!({
            "slice_name": &chart.slice_name,
            "viz_type": &chart.viz_type,
            "datasource_id": chart.datasource_id,
            "datasource_type": chart.datasource_type.as_str(),
            // Superset stores form data as an encoded JSON string
            "params": chart.params.to_string(),
        });
        let json = self.post("/api/v1/chart/", &body).await?;

        let id = json["id"]
            .as_i64()
            .ok_or_else(|| SupersetError::InvalidResponse("chart created without id".to_string()))?;

        info!("Created chart {} ({})", id, chart.slice_name);
        Ok(CreatedChart {
            id,
            url: format!("{}/explore/?slice_id={}", self.base_url, id),
        })
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let json = self.get("/api/v1/dataset/", &[]).await?;
        let datasets = Self::result_array(&json, "dataset list")?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<DatasetSummary>, _>>()?;
        Ok(datasets)
    }
}

/// Quote a value as a Rison string (`'` and `!` escape with `!`)
fn rison_string(value: &str) -> String {
    let escaped = value.replace('!', "!!").replace('\'', "!'");
    format!("'{}'", escaped)
}
