//! HTTP client for the remote resource API
//!
//! `HttpBackend` speaks the JSON flavour of the API: list endpoints return
//! `{count, next, previous, results}` pages and every request carries an
//! `Authorization: Token <token>` header once a token is known.
//!
//! # Example
//!
//! ```no_run
//! use salsa::backend::{ChrisBackend, HttpBackend, ListQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let anonymous = HttpBackend::new("http://localhost:8000/api/v1/", None)?;
//! let token = anonymous.fetch_token("chris", "chris1234").await?;
//!
//! let backend = HttpBackend::new("http://localhost:8000/api/v1/", Some(token))?;
//! let feeds = backend.list_feeds(&ListQuery::new().with_limit(5)).await?;
//! println!("{} feeds", feeds.count);
//! # Ok(())
//! # }
//! ```

use super::client::ChrisBackend;
use super::error::BackendError;
use super::search::{newest_plugin, PluginSearch};
use super::types::{
    FeedCreateRequest, FeedCreated, FeedRecord, FileRecord, FolderRecord, InstanceRef, ListQuery,
    PacsFileRecord, Page, PluginRecord, PluginRun,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default request timeout for API calls
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the remote resource API
pub struct HttpBackend {
    /// API root, always ending in `/`
    base_url: String,

    /// Auth token, absent for anonymous access
    token: Option<String>,

    /// Shared HTTP client with connection pooling
    http_client: Client,

    /// Request timeout duration
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let base_url = normalize_base_url(&base_url.into())?;

        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            BackendError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            base_url,
            token,
            http_client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Exchanges credentials for an auth token
    pub async fn fetch_token(&self, username: &str, password: &str) -> Result<String, BackendError> {
        info!("Requesting auth token for {} at {}", username, self.base_url);
        let url = self.url("auth-token/");
        let body = json!({ "username": username, "password": password });

        let response: TokenResponse = self
            .send_json(Method::POST, &url, Some(&body), "auth-token")
            .await
            .map_err(|e| match e {
                BackendError::ApiError {
                    status_code: Some(400),
                    message,
                } => BackendError::AuthenticationError { message },
                other => other,
            })?;
        Ok(response.token)
    }

    /// Checks that the API root answers
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        debug!("Checking API health at {}", self.base_url);

        match self.request(Method::GET, &self.base_url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    warn!("API health check failed with status: {}", response.status());
                }
                Ok(healthy)
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!("Cannot reach API at {}: {}", self.base_url, e);
                Ok(false)
            }
            Err(e) => {
                error!("API health check error: {}", e);
                Err(BackendError::from_reqwest(&e, self.timeout.as_secs()))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, format!("Token {}", token)),
            None => builder,
        }
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, BackendError> {
        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            error!("Request for {} failed: {}", resource, e);
            BackendError::from_reqwest(&e, self.timeout.as_secs())
        })?;

        let status = response.status();
        debug!(
            "{} answered {} in {:.2}s",
            resource,
            status,
            start.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API returned error status {} for {}: {}", status, resource, body);
            return Err(BackendError::from_status(status.as_u16(), &body, resource));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &ListQuery,
        resource: &str,
    ) -> Result<T, BackendError> {
        let builder = self.request(Method::GET, url).query(&query.to_pairs());
        let response = self.execute(builder, resource).await?;
        decode(response, resource).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        resource: &str,
    ) -> Result<T, BackendError> {
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.execute(builder, resource).await?;
        decode(response, resource).await
    }

    async fn delete(&self, url: &str, resource: &str) -> Result<(), BackendError> {
        self.execute(self.request(Method::DELETE, url), resource)
            .await
            .map(|_| ())
    }

    /// Lists a collection, switching to its `search/` endpoint when filters are set
    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, BackendError> {
        let path = if query.is_search() {
            format!("{}search/", collection)
        } else {
            collection.to_string()
        };
        let resource = if collection.is_empty() { "feeds" } else { collection };
        self.get_json(&self.url(&path), query, resource).await
    }

    async fn find_plugin(&self, search: &PluginSearch) -> Result<PluginRecord, BackendError> {
        if search.is_empty() {
            return Err(BackendError::ConfigurationError {
                message: "empty plugin search".to_string(),
            });
        }
        let page: Page<PluginRecord> = self.list("plugins/", &search.to_query()).await?;
        newest_plugin(&page.results)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                resource: format!("plugin matching '{}'", search),
            })
    }

    async fn create_instance(
        &self,
        plugin: &PluginRecord,
        params: &Map<String, Value>,
    ) -> Result<PluginRun, BackendError> {
        let url = self.url(&format!("plugins/{}/instances/", plugin.id));
        debug!(
            "Creating instance of {} v{} with {} parameter(s)",
            plugin.name,
            plugin.version,
            params.len()
        );
        let body = Value::Object(params.clone());
        self.send_json(Method::POST, &url, Some(&body), "plugin instances")
            .await
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, BackendError> {
    let text = response.text().await.map_err(|e| BackendError::NetworkError {
        message: format!("Failed to read {} response: {}", resource, e),
    })?;
    serde_json::from_str(&text).map_err(|e| {
        error!("Failed to parse {} response: {}", resource, e);
        BackendError::InvalidResponse {
            message: format!("JSON parse error: {}", e),
            raw_response: Some(text.chars().take(200).collect()),
        }
    })
}

fn normalize_base_url(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(BackendError::ConfigurationError {
            message: format!("API URL must start with http:// or https://, got '{}'", raw),
        });
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/", trimmed))
    }
}

#[async_trait]
impl ChrisBackend for HttpBackend {
    async fn create_feed(&self, request: &FeedCreateRequest) -> Result<FeedCreated, BackendError> {
        let search = PluginSearch::parse(
            &match &request.plugin.version {
                Some(version) => format!("name_exact: {}, version: {}", request.plugin.name, version),
                None => format!("name_exact: {}", request.plugin.name),
            },
        );
        let plugin = self.find_plugin(&search).await?;

        let mut params = Map::new();
        params.insert("dir".to_string(), json!(request.source_dirs.join(",")));
        params.insert("title".to_string(), json!(request.title));
        let run = self.create_instance(&plugin, &params).await?;

        if let Some(feed_id) = run.feed_id {
            let url = self.url(&format!("{}/", feed_id));
            let body = json!({ "name": request.title });
            let renamed: Result<Value, BackendError> =
                self.send_json(Method::PUT, &url, Some(&body), "feed").await;
            if let Err(e) = renamed {
                warn!("Feed {} created but could not be renamed: {}", feed_id, e);
            }
        }

        info!(
            "Created feed {:?} from {} source dir(s) via {} instance {}",
            run.feed_id,
            request.source_dirs.len(),
            run.plugin_name,
            run.id
        );

        Ok(FeedCreated {
            id: run.feed_id,
            bootstrap_instance: Some(InstanceRef {
                id: Some(run.id),
                plugin_name: Some(run.plugin_name),
            }),
        })
    }

    async fn run_plugin(
        &self,
        searchable: &str,
        params: &Map<String, Value>,
    ) -> Result<PluginRun, BackendError> {
        let plugin = self.find_plugin(&PluginSearch::parse(searchable)).await?;
        self.create_instance(&plugin, params).await
    }

    async fn list_plugins(&self, query: &ListQuery) -> Result<Page<PluginRecord>, BackendError> {
        self.list("plugins/", query).await
    }

    async fn list_feeds(&self, query: &ListQuery) -> Result<Page<FeedRecord>, BackendError> {
        self.list("", query).await
    }

    async fn delete_feed(&self, id: u64) -> Result<(), BackendError> {
        self.delete(&self.url(&format!("{}/", id)), &format!("feed {}", id))
            .await
    }

    async fn list_files(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<FileRecord>, BackendError> {
        let query = query.clone().with_filter("fname", path);
        self.list("userfiles/", &query).await
    }

    async fn delete_file(&self, id: u64) -> Result<(), BackendError> {
        self.delete(
            &self.url(&format!("userfiles/{}/", id)),
            &format!("file {}", id),
        )
        .await
    }

    async fn create_folder(&self, path: &str) -> Result<FolderRecord, BackendError> {
        let body = json!({ "path": path });
        self.send_json(Method::POST, &self.url("filebrowser/"), Some(&body), "folders")
            .await
    }

    async fn list_pacs_files(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PacsFileRecord>, BackendError> {
        self.list("pacs/files/", query).await
    }

    async fn download(&self, resource_url: &str) -> Result<Bytes, BackendError> {
        let response = self
            .execute(self.request(Method::GET, resource_url), resource_url)
            .await?;
        response.bytes().await.map_err(|e| BackendError::NetworkError {
            message: format!("Download of {} interrupted: {}", resource_url, e),
        })
    }

    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
