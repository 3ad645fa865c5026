//! Workspace API client
//!
//! One [`WorkspaceClient`] is shared by every job. It owns the bearer token,
//! the pooled HTTP connection set, the global request pacer, and the retry
//! policy; the [`WorkspaceApi`] operations are thin typed wrappers over one
//! paced, classified, retried request primitive.

use std::time::Duration;

use async_trait::async_trait;
use docpress_domain::constants::{
    DEFAULT_API_VERSION, DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_OP_TIMEOUT_SECS,
    DEFAULT_REQ_PER_SEC, HTTP_POOL_MAX_IDLE, MAX_CHILDREN_PER_APPEND,
};
use docpress_domain::{
    BlockPage, CreatePageRequest, CreatedPage, Error, QueryPage, RemoteBlock, Result, WorkspaceApi,
};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use crate::classify;
use crate::limiter::RequestPacer;
use crate::retry::RetryPolicy;

/// Header carrying the workspace API version
const VERSION_HEADER: &str = "Workspace-Version";

/// Configuration for the workspace client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `https://api.workspace.com/v1`
    pub base_url: String,
    /// Bearer token
    pub token: String,
    /// Version header value
    pub api_version: String,
    /// Outbound request budget per second
    pub req_per_sec: u32,
    /// Retry attempts per operation
    pub max_retries: usize,
    /// Timeout for one HTTP attempt
    pub attempt_timeout: Duration,
    /// Timeout for one logical operation including retries
    pub op_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.workspace.com/v1".to_owned(),
            token: String::new(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            req_per_sec: DEFAULT_REQ_PER_SEC,
            max_retries: docpress_domain::constants::DEFAULT_MAX_RETRIES,
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            op_timeout: Duration::from_secs(DEFAULT_OP_TIMEOUT_SECS),
        }
    }
}

/// Shared, concurrency-safe client over the workspace HTTP API
pub struct WorkspaceClient {
    http: reqwest::Client,
    config: ClientConfig,
    pacer: RequestPacer,
    retry: RetryPolicy,
}

impl WorkspaceClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the token is empty or the underlying
    /// HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(Error::config("workspace token is required"));
        }
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
            .timeout(config.attempt_timeout)
            .build()
            .map_err(|e| Error::config(format!("http client: {e}")))?;
        let pacer = RequestPacer::new(config.req_per_sec);
        let retry = RetryPolicy {
            max_attempts: config.max_retries.max(1),
        };
        Ok(Self {
            http,
            config,
            pacer,
            retry,
        })
    }

    /// One paced, classified, retried request returning the decoded body
    ///
    /// Acquires a pacer token immediately before every send (never across
    /// retries), retries transient and conflict failures with backoff, and
    /// honors rate-limit hints without consuming an attempt. The whole loop
    /// is bounded by the per-operation timeout.
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let operation = self.request_inner(method, path, body);
        match tokio::time::timeout(self.config.op_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "workspace operation exceeded {}s",
                self.config.op_timeout.as_secs()
            ))),
        }
    }

    async fn request_inner(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{path}", self.config.base_url);
        let mut attempt = 0usize;
        loop {
            self.pacer.acquire().await;
            trace!(%method, path, attempt, "workspace request");
            let mut builder = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&self.config.token)
                .header(VERSION_HEADER, &self.config.api_version);
            if let Some(payload) = body {
                builder = builder.json(payload);
            }
            let outcome = match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| Error::workspace(format!("undecodable body: {e}")));
                    }
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok());
                    let text = response.text().await.unwrap_or_default();
                    Err(classify::status_error(status, &text, retry_after))
                }
                Err(error) => Err(classify::transport_error(&error)),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(Error::RateLimited { retry_after_secs }) => {
                    // Rate limits do not consume an attempt; the operation
                    // timeout bounds the loop.
                    let delay = self.retry.retry_after(retry_after_secs);
                    debug!(path, delay_secs = delay.as_secs(), "rate limited, honoring hint");
                    tokio::time::sleep(delay).await;
                }
                Err(error) if error.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    debug!(path, attempt, %error, delay_ms = delay.as_millis() as u64, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl std::fmt::Debug for WorkspaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceClient")
            .field("base_url", &self.config.base_url)
            .field("req_per_sec", &self.config.req_per_sec)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkspaceApi for WorkspaceClient {
    async fn create_page(&self, request: CreatePageRequest) -> Result<CreatedPage> {
        let mut properties = json!({
            "title": {
                "title": [{ "type": "text", "text": { "content": request.title } }]
            }
        });
        if let Some(url) = &request.source_url {
            properties["URL"] = json!({ "url": url });
        }
        let mut body = json!({
            "parent": { "database_id": request.database_id },
            "properties": properties,
            "children": request.children,
        });
        if let Some(icon) = &request.icon {
            body["icon"] = json!({ "type": "emoji", "emoji": icon });
        }
        if let Some(cover) = &request.cover {
            body["cover"] = json!({ "type": "external", "external": { "url": cover } });
        }
        let value = self.request(Method::POST, "/pages", Some(&body)).await?;
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::workspace("create_page response missing id"))?
            .to_owned();
        Ok(CreatedPage {
            id,
            url: value
                .get("url")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        })
    }

    async fn append_children(
        &self,
        parent_id: &str,
        children: Vec<Value>,
    ) -> Result<Vec<RemoteBlock>> {
        if children.len() > MAX_CHILDREN_PER_APPEND {
            return Err(Error::invalid_input(format!(
                "append of {} children exceeds the {MAX_CHILDREN_PER_APPEND} limit",
                children.len()
            )));
        }
        let body = json!({ "children": children });
        let value = self
            .request(
                Method::PATCH,
                &format!("/blocks/{parent_id}/children"),
                Some(&body),
            )
            .await?;
        let results = value
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::workspace("append response missing results"))?;
        let mut blocks = Vec::with_capacity(results.len());
        for entry in results {
            match RemoteBlock::from_wire(entry) {
                Ok(block) => blocks.push(block),
                Err(error) => warn!(%error, "skipping undecodable appended block"),
            }
        }
        Ok(blocks)
    }

    async fn update_block(&self, block_id: &str, payload: Value) -> Result<()> {
        self.request(Method::PATCH, &format!("/blocks/{block_id}"), Some(&payload))
            .await
            .map(|_| ())
    }

    async fn delete_block(&self, block_id: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("/blocks/{block_id}"), None)
            .await
            .map(|_| ())
    }

    async fn list_children(&self, parent_id: &str, cursor: Option<String>) -> Result<BlockPage> {
        let mut path = format!("/blocks/{parent_id}/children?page_size=100");
        if let Some(cursor) = cursor {
            path.push_str(&format!("&start_cursor={cursor}"));
        }
        let value = self.request(Method::GET, &path, None).await?;
        let mut page = BlockPage {
            next_cursor: value
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            has_more: value
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            ..BlockPage::default()
        };
        if let Some(results) = value.get("results").and_then(Value::as_array) {
            for entry in results {
                match RemoteBlock::from_wire(entry) {
                    Ok(block) => page.results.push(block),
                    Err(error) => trace!(%error, "skipping unknown remote block kind"),
                }
            }
        }
        Ok(page)
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/pages/{page_id}"), None)
            .await
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/databases/{database_id}"), None)
            .await
    }

    async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
        page_size: Option<u32>,
        cursor: Option<String>,
    ) -> Result<QueryPage> {
        let mut body = json!({});
        if let Some(filter) = filter {
            body["filter"] = filter;
        }
        if let Some(sorts) = sorts {
            body["sorts"] = sorts;
        }
        if let Some(size) = page_size {
            body["page_size"] = json!(size.min(100));
        }
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        let value = self
            .request(
                Method::POST,
                &format!("/databases/{database_id}/query"),
                Some(&body),
            )
            .await?;
        Ok(QueryPage {
            results: value
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            next_cursor: value
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            has_more: value
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    async fn update_page_properties(&self, page_id: &str, properties: Value) -> Result<()> {
        let body = json!({ "properties": properties });
        self.request(Method::PATCH, &format!("/pages/{page_id}"), Some(&body))
            .await
            .map(|_| ())
    }
}
