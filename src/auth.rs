//! Service principal authentication.
//!
//! Access tokens are obtained with the OAuth2 client credentials grant against
//! the tenant's token endpoint (`{authority}/{tenant}/oauth2/token`) and cached
//! until shortly before they expire.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rgmgmt::auth::{ClientSecretCredential, TokenCredential};
//!
//! let credential = ClientSecretCredential::builder(tenant, client_id, secret)
//!     .audience("https://management.azurestackci.onmicrosoft.com/abcd")
//!     .build()?;
//!
//! let token = credential.get_token().await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::config::DEFAULT_AUTHORITY;
use crate::error::{Error, Result};

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Default timeout for token requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A bearer token and its expiry.
#[derive(Clone)]
pub struct AccessToken {
    /// The token value
    pub token: String,
    /// When the token stops being accepted
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token expires within the refresh margin.
    pub fn is_expiring(&self) -> bool {
        self.expires_on
            .checked_sub_signed(ChronoDuration::seconds(EXPIRY_MARGIN_SECS))
            .map_or(true, |refresh_at| refresh_at <= Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Something that can hand out bearer tokens for the management API.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Return a token that is valid for at least the refresh margin.
    async fn get_token(&self) -> Result<AccessToken>;
}

/// Token endpoint success payload.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default, deserialize_with = "seconds_from_str_or_number")]
    expires_in: Option<i64>,
    #[serde(default, deserialize_with = "seconds_from_str_or_number")]
    expires_on: Option<i64>,
}

/// Token endpoint error payload.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// The v1 token endpoint sends numbers as strings; newer ones send numbers.
fn seconds_from_str_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Builder for [`ClientSecretCredential`]
pub struct ClientSecretCredentialBuilder {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    audience: Option<String>,
    validate_authority: bool,
    timeout: Duration,
}

impl ClientSecretCredentialBuilder {
    /// Set the token issuer (default `https://login.windows.net/`)
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Set the resource the token is requested for
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Require an `https` authority (default: true)
    pub fn validate_authority(mut self, validate: bool) -> Self {
        self.validate_authority = validate;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the credential
    pub fn build(self) -> Result<ClientSecretCredential> {
        let audience = self
            .audience
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::Configuration("token audience is required".to_string()))?;

        let token_url = token_endpoint(&self.authority, &self.tenant_id, self.validate_authority)?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("rgmgmt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ClientSecretCredential {
            client,
            token_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            audience,
            cached: RwLock::new(None),
        })
    }
}

/// Build the token endpoint URL for `tenant` under `authority`.
fn token_endpoint(authority: &str, tenant: &str, validate: bool) -> Result<Url> {
    let mut authority = Url::parse(authority)
        .map_err(|e| Error::Configuration(format!("Invalid authority '{}': {}", authority, e)))?;

    if validate && authority.scheme() != "https" {
        return Err(Error::Configuration(format!(
            "Authority must use https: {}",
            authority
        )));
    }

    if tenant.is_empty() || tenant.contains('/') {
        return Err(Error::Configuration(format!("Invalid tenant id '{}'", tenant)));
    }

    if authority.cannot_be_a_base() {
        return Err(Error::Configuration(format!(
            "Authority cannot be a base: {}",
            authority
        )));
    }

    authority
        .path_segments_mut()
        .map_err(|()| Error::Configuration("Authority cannot be a base".to_string()))?
        .pop_if_empty()
        .extend([tenant, "oauth2", "token"]);

    Ok(authority)
}

/// Client credentials grant for a service principal.
pub struct ClientSecretCredential {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    audience: String,
    cached: RwLock<Option<AccessToken>>,
}

impl ClientSecretCredential {
    /// Start building a credential for the given service principal.
    pub fn builder(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ClientSecretCredentialBuilder {
        ClientSecretCredentialBuilder {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            audience: None,
            validate_authority: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// The token endpoint this credential posts to.
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Request a fresh token from the token endpoint.
    async fn request_token(&self) -> Result<AccessToken> {
        debug!(url = %self.token_url, resource = %self.audience, "Requesting access token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", self.audience.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(Error::Authentication(format!("{} ({})", message, status)));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Authentication(format!("Malformed token response: {}", e))
        })?;

        if let Some(kind) = token.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(Error::Authentication(format!(
                    "Unsupported token type '{}'",
                    kind
                )));
            }
        }

        let expires_on = match (token.expires_on, token.expires_in) {
            (Some(on), _) => DateTime::from_timestamp(on, 0).ok_or_else(|| {
                Error::Authentication(format!("Token expiry {} is out of range", on))
            })?,
            (None, Some(secs)) => ChronoDuration::try_seconds(secs)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .ok_or_else(|| {
                    Error::Authentication(format!("Token lifetime {}s is out of range", secs))
                })?,
            (None, None) => {
                return Err(Error::Authentication(
                    "Token response has no expiry".to_string(),
                ))
            }
        };

        info!(expires_on = %expires_on, "Acquired access token");

        Ok(AccessToken::new(token.access_token, expires_on))
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self) -> Result<AccessToken> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| !t.is_expiring()) {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expiring()) {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("audience", &self.audience)
            .finish()
    }
}

/// A credential that always returns the same token.
///
/// Useful against endpoints that accept a pre-issued token.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, DateTime::<Utc>::MAX_UTC),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}
