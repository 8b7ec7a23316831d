//! REST client for the backing query engine.
//!
//! Speaks the ADX v1 query endpoint: a single POST carrying the database
//! and query text, answered by a set of tables of which the first is the
//! primary result.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::auth::TokenProvider;
use super::{AdxConfig, ClientError};
use crate::types::Row;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Tables")]
    tables: Vec<Table>,
}

#[derive(Debug, Deserialize)]
struct Table {
    #[serde(rename = "Columns")]
    columns: Vec<Column>,
    #[serde(rename = "Rows")]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Column {
    #[serde(rename = "ColumnName")]
    column_name: String,
}

/// Connection handle to the query engine.
///
/// Built once per process by [`super::SharedClient`] and reused by all
/// callers for the process lifetime. No total-request timeout is applied
/// here; callers own their upper bound.
pub struct KustoHandle {
    http: Client,
    query_url: String,
    database: String,
    auth: TokenProvider,
}

impl KustoHandle {
    /// Build a handle from the connection values. Performs no network
    /// traffic; tokens are acquired on first execution.
    pub fn connect(config: &AdxConfig) -> Result<Self, ClientError> {
        let base = reqwest::Url::parse(&config.cluster)
            .map_err(|e| ClientError::InvalidClusterUrl(format!("{}: {}", config.cluster, e)))?;
        let query_url = base
            .join("v1/rest/query")
            .map_err(|e| ClientError::InvalidClusterUrl(format!("{}: {}", config.cluster, e)))?;

        let http = Client::new();
        let auth = TokenProvider::new(
            http.clone(),
            &config.tenant_id,
            &config.client_id,
            &config.client_secret,
            base.as_str(),
        );

        Ok(Self {
            http,
            query_url: query_url.into(),
            database: config.database.clone(),
            auth,
        })
    }

    /// Execute one query, returning the primary result as rows.
    pub async fn execute(&self, query: &str) -> Result<Vec<Row>, ClientError> {
        let token = self.auth.token().await?;

        debug!(url = %self.query_url, "executing query");
        let body = serde_json::json!({ "db": self.database, "csl": query });
        let response = self
            .http
            .post(&self.query_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Query { status, body });
        }

        let parsed: QueryResponse = response.json().await?;
        rows_from_response(parsed)
    }
}

/// Convert the primary (first) result table into column-name -> value rows.
fn rows_from_response(response: QueryResponse) -> Result<Vec<Row>, ClientError> {
    let table = response.tables.into_iter().next().ok_or_else(|| {
        ClientError::MalformedResponse("response contained no tables".to_string())
    })?;

    let mut rows = Vec::with_capacity(table.rows.len());
    for values in table.rows {
        let mut row = Row::new();
        for (column, value) in table.columns.iter().zip(values) {
            row.insert(column.column_name.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}
