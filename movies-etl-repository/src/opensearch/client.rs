//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::types::{BulkItemFailure, BulkSummary};
use movies_etl_shared::IndexDocument;

/// Error type OpenSearch reports when creating an index that already exists.
const ALREADY_EXISTS_ERROR: &str = "resource_already_exists_exception";

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200").await?;
/// if !client.index_exists("movies").await? {
///     client.create_index("movies", &index_settings(Stream::FilmWork)).await?;
/// }
/// let summary = client.bulk_upsert("movies", &documents).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Build the action/document pairs of a bulk request.
    ///
    /// Every document is an `index` action with `_id` set to the document id,
    /// which makes the write an upsert.
    fn build_bulk_body(
        index_name: &str,
        documents: &[IndexDocument],
    ) -> Result<Vec<JsonBody<Value>>, SearchError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

        for doc in documents {
            let source = serde_json::to_value(doc)
                .map_err(|e| SearchError::serialization(e.to_string()))?;
            body.push(json!({"index": {"_index": index_name, "_id": doc.id().to_string()}}).into());
            body.push(source.into());
        }

        Ok(body)
    }

    /// Turn a bulk response body into a summary of per-item outcomes.
    fn parse_bulk_response(total: usize, response: &Value) -> Result<BulkSummary, SearchError> {
        let has_errors = response
            .get("errors")
            .and_then(Value::as_bool)
            .ok_or_else(|| SearchError::parse("Bulk response has no `errors` flag"))?;

        if !has_errors {
            return Ok(BulkSummary::all_succeeded(total));
        }

        let items = response
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse("Bulk response has no `items` array"))?;

        let failures: Vec<BulkItemFailure> = items
            .iter()
            .filter_map(|item| item.get("index"))
            .filter(|result| result.get("error").is_some())
            .map(|result| BulkItemFailure {
                id: result
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                status: result
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or_default(),
                reason: result["error"]
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            })
            .collect();

        let failed = failures.len();
        Ok(BulkSummary {
            total,
            succeeded: total.saturating_sub(failed),
            failed,
            failures,
        })
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self))]
    async fn index_exists(&self, index_name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index_name]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchError::request(format!(
                "Index existence check returned status {}",
                status
            ))),
        }
    }

    #[instrument(skip(self, settings))]
    async fn create_index(&self, index_name: &str, settings: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index_name))
            .body(settings.clone())
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        if status.is_success() {
            if body.get("acknowledged").and_then(Value::as_bool) == Some(true) {
                info!(index = %index_name, "Index created");
            } else {
                warn!(index = %index_name, "Index creation was not acknowledged");
            }
            return Ok(());
        }

        // Someone else created it between the existence check and now
        if body["error"]["type"].as_str() == Some(ALREADY_EXISTS_ERROR) {
            debug!(index = %index_name, "Index already exists");
            return Ok(());
        }

        error!(status = %status, body = %body, "Index creation failed");
        Err(SearchError::index_creation(format!(
            "Creating index {} failed with status {}: {}",
            index_name, status, body
        )))
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(
        &self,
        index_name: &str,
        documents: &[IndexDocument],
    ) -> Result<BulkSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body = Self::build_bulk_body(index_name, documents)?;

        let response = self
            .client
            .bulk(BulkParts::Index(index_name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        Self::parse_bulk_response(documents.len(), &response_body)
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        debug!(status = %status, "OpenSearch cluster status");

        Ok(status == "green" || status == "yellow")
    }
}
