//! Resource Manager client.
//!
//! A thin typed client over the ARM REST API. Operations are grouped the way
//! the REST API groups them:
//!
//! - [`ResourceGroups`](resource_groups::ResourceGroups): list, create or
//!   update, delete, list resources, export template
//! - [`Resources`](resources::Resources): generic create or update
//!
//! Every request is authenticated with a bearer token from a
//! [`TokenCredential`] and carries an `api-version` query parameter. Lists
//! follow `nextLink` until exhausted. Calls answered as long-running
//! operations are polled to completion before they return.
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = ArmClient::builder(endpoint, subscription_id)
//!     .credential(credential)
//!     .build()?;
//!
//! for group in client.resource_groups().list().await? {
//!     println!("{:?}", group.name);
//! }
//! ```

pub mod lro;
pub mod models;
pub mod resource_groups;
pub mod resources;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::auth::TokenCredential;
use crate::config::{ApiConfig, DEFAULT_RESOURCES_API_VERSION};
use crate::error::{Error, Result};

use self::models::{CloudError, Page};
use self::resource_groups::ResourceGroups;
use self::resources::Resources;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default delay between long-running operation polls
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default upper bound on how long a long-running operation is polled
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30 * 60;

/// Configuration for the Resource Manager client
#[derive(Debug, Clone)]
pub struct ArmClientConfig {
    /// Management endpoint base URI
    pub endpoint: String,
    /// Subscription all calls are scoped to
    pub subscription_id: String,
    /// api-version for resource group and resource listing calls
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
    /// Delay between polls when the service sends no `Retry-After`
    pub poll_interval: Duration,
    /// Give up polling a long-running operation after this long
    pub operation_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl ArmClientConfig {
    pub fn new(endpoint: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subscription_id: subscription_id.into(),
            api_version: DEFAULT_RESOURCES_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            user_agent: format!("rgmgmt/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for creating an [`ArmClient`]
pub struct ArmClientBuilder {
    config: ArmClientConfig,
    credential: Option<Arc<dyn TokenCredential>>,
}

impl ArmClientBuilder {
    /// Set the credential used for every request
    pub fn credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the default delay between long-running operation polls
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set how long a long-running operation may take
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Take timeout, poll interval and api-version from the `[api]` section
    pub fn api_config(mut self, api: &ApiConfig) -> Self {
        self.config.api_version = api.resources_api_version.clone();
        self.config.timeout = api.timeout;
        self.config.poll_interval = api.poll_interval;
        self.config.operation_timeout = api.operation_timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ArmClient> {
        let credential = self
            .credential
            .ok_or_else(|| Error::Configuration("a credential is required".to_string()))?;
        ArmClient::from_config(self.config, credential)
    }
}

/// HTTP client for the Resource Manager API
pub struct ArmClient {
    /// The underlying HTTP client
    http: Client,
    /// Management endpoint, always ending in `/`
    base: Url,
    /// Client configuration
    config: ArmClientConfig,
    credential: Arc<dyn TokenCredential>,
}

impl ArmClient {
    /// Create a new builder
    pub fn builder(
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> ArmClientBuilder {
        ArmClientBuilder {
            config: ArmClientConfig::new(endpoint, subscription_id),
            credential: None,
        }
    }

    /// Create a client from client configuration
    fn from_config(config: ArmClientConfig, credential: Arc<dyn TokenCredential>) -> Result<Self> {
        let mut base = Url::parse(&config.endpoint).map_err(|e| {
            Error::Configuration(format!(
                "Invalid management endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Management endpoint cannot be a base URL: {}",
                config.endpoint
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        if config.subscription_id.is_empty() {
            return Err(Error::Configuration("subscription id is required".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            config,
            credential,
        })
    }

    /// The management endpoint
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// The subscription all calls are scoped to
    pub fn subscription_id(&self) -> &str {
        &self.config.subscription_id
    }

    /// The api-version used for resource group calls
    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    /// Resource group operations
    pub fn resource_groups(&self) -> ResourceGroups<'_> {
        ResourceGroups::new(self)
    }

    /// Generic resource operations
    pub fn resources(&self) -> Resources<'_> {
        Resources::new(self)
    }

    /// Acquire a token up front so credential problems surface before any
    /// management call is made.
    pub async fn authenticate(&self) -> Result<()> {
        self.credential.get_token().await.map(|_| ())
    }

    /// Build a URL under the subscription from path segments.
    ///
    /// Segments are percent-encoded individually; empty segments are skipped.
    pub(crate) fn subscription_url(&self, segments: &[&str], api_version: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("Invalid endpoint: {}", self.base)))?
            .pop_if_empty()
            .push("subscriptions")
            .push(&self.config.subscription_id)
            .extend(segments.iter().filter(|s| !s.is_empty()));
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    /// Start an authenticated request.
    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.credential.get_token().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token.token)
            .header(header::ACCEPT, "application/json"))
    }

    /// Send a request and turn non-success statuses into [`Error::Api`].
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        operation: &str,
    ) -> Result<Response> {
        debug!(%method, %url, operation, "Sending request");

        let mut request = self.request(method, url).await?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        trace!(%status, operation, "Received response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response, operation).await)
        }
    }

    /// GET a JSON document.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T> {
        let response = self.send::<()>(Method::GET, url, None, operation).await?;
        parse_json(response, operation).await
    }

    /// GET every page of a list, following `nextLink`.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        first: Url,
        operation: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(url, operation).await?;
            items.extend(page.value);

            next = match page.next_link.filter(|l| !l.is_empty()) {
                Some(link) => Some(Url::parse(&link)?),
                None => None,
            };
        }

        debug!(operation, count = items.len(), "Listed items");
        Ok(items)
    }

    /// Poll interval used when the service sends no `Retry-After`.
    pub(crate) fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Upper bound for polling one long-running operation.
    pub(crate) fn operation_timeout(&self) -> Duration {
        self.config.operation_timeout
    }
}

impl fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.base.as_str())
            .field("subscription_id", &self.config.subscription_id)
            .field("api_version", &self.config.api_version)
            .finish()
    }
}

/// Read a JSON body, naming the operation when it does not parse.
pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::unexpected(operation, e.to_string()))
}

/// Build an [`Error::Api`] from a failed response.
async fn error_from_response(response: Response, operation: &str) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    api_error(status, &body, operation)
}

/// Map a status and body to an error, preferring the ARM error payload.
pub(crate) fn api_error(status: StatusCode, body: &str, operation: &str) -> Error {
    match serde_json::from_str::<CloudError>(body) {
        Ok(cloud) if !cloud.error.code.is_empty() => {
            Error::api(operation, status.as_u16(), cloud.error.code, cloud.error.message)
        }
        _ => Error::api(
            operation,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error"),
            body.trim(),
        ),
    }
}
