//! HTTP client for the Solr JSON API.

use crate::{
    config::SolrConfig,
    error::{Result, SolrError},
    operations::SolrOperations,
    query::Query,
    retry::RetryPolicy,
    search::{SearchQuery, SelectResponse},
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Solr client speaking the JSON request/response API.
#[derive(Clone)]
pub struct SolrClient {
    http: reqwest::Client,
    config: Arc<SolrConfig>,
    retry: RetryPolicy,
    base: Url,
}

impl SolrClient {
    /// Create a new Solr client.
    pub fn new(config: SolrConfig) -> Result<Self> {
        config.validate()?;
        info!(url = %config.url, collection = %config.collection, "Initializing Solr client");

        let base = Url::parse(&config.url)?;
        if base.cannot_be_a_base() {
            return Err(SolrError::Validation(format!(
                "URL cannot be used as a base: {}",
                config.url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| SolrError::Connection(e.to_string()))?;

        let retry = if config.max_retries > 0 {
            RetryPolicy::exponential(config.max_retries)
        } else {
            RetryPolicy::none()
        };

        debug!("Solr client initialized");

        Ok(Self {
            http,
            config: Arc::new(config),
            retry,
            base,
        })
    }

    /// Create a client from `SOLR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SolrConfig::from_env()?)
    }

    /// Replace the retry policy derived from the configuration.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SolrConfig {
        &self.config
    }

    fn endpoint(&self, collection: &str, path: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SolrError::Validation(format!("Invalid base URL: {}", self.base)))?
            .pop_if_empty()
            .push(collection)
            .extend(path);
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.retry
            .run(|| self.execute_once(method.clone(), &url, params, body))
            .await
    }

    async fn execute_once(
        &self,
        method: Method,
        url: &Url,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        debug!(%method, %url, "Sending Solr request");

        let mut request = self.http.request(method, url.clone()).query(params);
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(solr_error(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> SolrError {
        if e.is_timeout() {
            SolrError::Timeout(self.config.request_timeout)
        } else if e.is_connect() {
            SolrError::Connection(e.to_string())
        } else {
            SolrError::Http(e)
        }
    }

    async fn update(&self, collection: &str, body: Value) -> Result<()> {
        let url = self.endpoint(collection, &["update"])?;
        let mut params = vec![("wt".to_string(), "json".to_string())];
        if let Some((key, value)) = self.config.commit.to_param() {
            params.push((key.to_string(), value));
        }
        self.execute(Method::POST, url, &params, Some(&body)).await?;
        Ok(())
    }
}

fn solr_error(status: u16, body: &str) -> SolrError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error
        .and_then(|e| e.get("msg"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                body.trim().to_string()
            }
        });
    let status = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(status);

    SolrError::Solr { status, message }
}

#[async_trait]
impl SolrOperations for SolrClient {
    fn default_collection(&self) -> &str {
        &self.config.collection
    }

    async fn add(&self, collection: &str, docs: &[Value]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        debug!(collection, count = docs.len(), "Adding documents");
        self.update(collection, Value::Array(docs.to_vec())).await
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        debug!(collection, id, "Getting document");
        let url = self.endpoint(collection, &["get"])?;
        let params = [
            ("id".to_string(), id.to_string()),
            ("wt".to_string(), "json".to_string()),
        ];
        let mut body = self.execute(Method::GET, url, &params, None).await?;

        match body.get_mut("doc").map(Value::take) {
            Some(Value::Null) | None => Ok(None),
            Some(doc) => Ok(Some(doc)),
        }
    }

    async fn select(&self, collection: &str, query: &SearchQuery) -> Result<SelectResponse> {
        let params = query.to_params();
        debug!(collection, q = %query.query(), "Executing select");
        let url = self.endpoint(collection, &["select"])?;
        let body = self.execute(Method::GET, url, &params, None).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!(collection, count = ids.len(), "Deleting documents by id");
        self.update(collection, json!({ "delete": ids })).await
    }

    async fn delete_by_query(&self, collection: &str, query: &Query) -> Result<()> {
        let q = query.to_solr();
        debug!(collection, q = %q, "Deleting documents by query");
        self.update(collection, json!({ "delete": { "query": q } })).await
    }

    async fn commit(&self, collection: &str) -> Result<()> {
        debug!(collection, "Committing");
        let url = self.endpoint(collection, &["update"])?;
        let params = [("wt".to_string(), "json".to_string())];
        let body = json!({ "commit": {} });
        self.execute(Method::POST, url, &params, Some(&body)).await?;
        Ok(())
    }

    async fn ping(&self, collection: &str) -> Result<bool> {
        let url = self.endpoint(collection, &["admin", "ping"])?;
        let params = [("wt".to_string(), "json".to_string())];
        match self.execute_once(Method::GET, &url, &params, None).await {
            Ok(body) => Ok(body.get("status").and_then(Value::as_str) == Some("OK")),
            Err(e) => {
                debug!(collection, error = %e, "Ping failed");
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for SolrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolrClient")
            .field("url", &self.config.url)
            .field("collection", &self.config.collection)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = SolrClient::new(SolrConfig::new("http://localhost:8983/solr/")).unwrap();
        let url = client.endpoint("collection1", &["admin", "ping"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8983/solr/collection1/admin/ping");

        let client = SolrClient::new(SolrConfig::new("http://localhost:8983/solr")).unwrap();
        let url = client.endpoint("products", &["select"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8983/solr/products/select");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(SolrClient::new(SolrConfig::new("mailto:solr@example.com")).is_err());
        assert!(SolrClient::new(SolrConfig::new("")).is_err());
    }

    #[test]
    fn test_solr_error_parsing() {
        let err = solr_error(
            400,
            r#"{"responseHeader":{"status":400},"error":{"msg":"undefined field bogus","code":400}}"#,
        );
        match err {
            SolrError::Solr { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "undefined field bogus");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = solr_error(503, "");
        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_retryable());

        let err = solr_error(404, "<html>Not Found</html>");
        assert!(matches!(err, SolrError::Solr { status: 404, ref message } if message.contains("Not Found")));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let client = SolrClient::new(
            SolrConfig::new("http://localhost:8983/solr").with_basic_auth("admin", "s3cret"),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("collection1"));
        assert!(!debug.contains("s3cret"));
    }
}
