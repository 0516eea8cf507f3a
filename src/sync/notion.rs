//! Notion-compatible HTTP page store
//!
//! Endpoints used:
//! - `POST /pages` to create
//! - `POST /databases/{id}/query` to query
//! - `PATCH /pages/{id}` to update
//!
//! Every request carries a bearer token, the `Notion-Version` header and the
//! configured timeout. Queries and updates are retried with exponential
//! backoff on transport errors, timeouts, 429 and 5xx. Creates are only resent
//! after a 429 or a failed connect, since any other failure may follow a page
//! the store already saved. Other 4xx responses fail immediately.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};
use url::Url;

use super::property::{properties_to_json, Page, Properties};
use super::store::{Filter, PageStore, Sort};
use super::StoreError;
use crate::config::StoreConfig;
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::truncate_text;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client for a Notion-style database API
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    version: String,
    retry: RetryConfig,
}

impl NotionClient {
    /// Build a client from store configuration
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` for a missing token, an unusable
    /// base URL or a zero timeout.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let token = config
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StoreError::InvalidConfig("api_token is not set".to_string()))?;
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| StoreError::InvalidConfig(format!("base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidConfig(
                "base_url must use http or https".to_string(),
            ));
        }
        if config.request_timeout_secs == 0 {
            return Err(StoreError::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StoreError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            version: config.api_version.clone(),
            retry: RetryConfig::with_delays(
                config.max_retries,
                config.retry_base_delay_ms,
                config.retry_base_delay_ms.saturating_mul(16),
            ),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        resend_on: fn(&StoreError) -> bool,
    ) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        with_retry_if(&self.retry, || self.send_once(&method, &url, body), resend_on).await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: &Value,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .json(body)
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), url, "Store request failed");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: truncate_text(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PageStore for NotionClient {
    #[instrument(skip(self, properties), fields(properties = properties.len()))]
    async fn create_page(
        &self,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties_to_json(properties),
        });
        let response = self
            .send(Method::POST, "/pages", &body, StoreError::is_safe_to_resend)
            .await?;
        Page::from_json(&response)
    }

    #[instrument(skip(self, filter, sorts))]
    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        sorts: &[Sort],
    ) -> Result<Vec<Page>, StoreError> {
        let mut body = Map::new();
        if let Some(filter) = filter {
            body.insert("filter".to_string(), filter.to_json());
        }
        if !sorts.is_empty() {
            body.insert(
                "sorts".to_string(),
                Value::Array(sorts.iter().map(Sort::to_json).collect()),
            );
        }

        let path = format!("/databases/{database_id}/query");
        let response = self
            .send(Method::POST, &path, &Value::Object(body), StoreError::is_retryable)
            .await?;

        response
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Decode("query response without results".to_string()))?
            .iter()
            .map(Page::from_json)
            .collect()
    }

    #[instrument(skip(self, properties), fields(properties = properties.len()))]
    async fn update_page(
        &self,
        page_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let body = json!({ "properties": properties_to_json(properties) });
        let path = format!("/pages/{page_id}");
        let response = self
            .send(Method::PATCH, &path, &body, StoreError::is_retryable)
            .await?;
        Page::from_json(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            api_token: Some("secret".to_string()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_new_validates_config() {
        assert!(NotionClient::new(&config()).is_ok());

        let missing_token = StoreConfig::default();
        assert!(matches!(
            NotionClient::new(&missing_token),
            Err(StoreError::InvalidConfig(_))
        ));

        let bad_url = StoreConfig {
            base_url: "ftp://example.com".to_string(),
            ..config()
        };
        assert!(NotionClient::new(&bad_url).is_err());

        let zero_timeout = StoreConfig {
            request_timeout_secs: 0,
            ..config()
        };
        assert!(NotionClient::new(&zero_timeout).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = NotionClient::new(&StoreConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..config()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }
}
