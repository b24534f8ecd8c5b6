//! Configuration module for rgmgmt
//!
//! Two sources feed a run:
//! - Connection settings, which are required and come from the environment
//!   ([`Credentials`])
//! - Sample tunables, which are optional and come from a TOML file plus a few
//!   environment overrides ([`Config`])

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory (tenant) id.
pub const ENV_TENANT_ID: &str = "AAD_TENANT_ID";
/// Service principal application id.
pub const ENV_CLIENT_ID: &str = "APP_CLIENT_ID";
/// Service principal secret.
pub const ENV_CLIENT_SECRET: &str = "APP_CLIENT_SECRET";
/// Subscription the sample operates in.
pub const ENV_SUBSCRIPTION_ID: &str = "AZURESTACK_SUBSCRIPTION_ID";
/// Token audience for the management endpoint.
pub const ENV_RESOURCE_ID: &str = "AZURESTACK_RESOURCE_ID";
/// Base URI of the management endpoint.
pub const ENV_ARM_URI: &str = "AZURESTACK_ARM_URI";
/// Location of the stamp.
pub const ENV_LOCATION: &str = "AZURESTACK_LOCATION";

/// All variables a run needs, in the order they are reported.
pub const REQUIRED_ENV_VARS: [&str; 7] = [
    ENV_TENANT_ID,
    ENV_CLIENT_ID,
    ENV_CLIENT_SECRET,
    ENV_SUBSCRIPTION_ID,
    ENV_RESOURCE_ID,
    ENV_ARM_URI,
    ENV_LOCATION,
];

/// Path of the configuration file.
pub const ENV_CONFIG: &str = "RGMGMT_CONFIG";

/// Default token issuer.
pub const DEFAULT_AUTHORITY: &str = "https://login.windows.net/";

/// Default api-version for resource and resource group calls.
pub const DEFAULT_RESOURCES_API_VERSION: &str = "2016-06-01";

/// Connection settings read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    /// Audience the access token is requested for
    pub resource_id: String,
    /// Management endpoint base URI
    pub arm_endpoint: String,
    pub location: String,
}

impl Credentials {
    /// Read the connection settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the connection settings through `lookup`.
    ///
    /// Unset and empty values count as missing. When anything is missing the
    /// error lists every missing name, not just the first one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_ENV_VARS.len());
        let mut missing = Vec::new();

        for name in REQUIRED_ENV_VARS {
            match lookup(name) {
                Some(value) if !value.is_empty() => values.push(value),
                _ => {
                    missing.push(name.to_string());
                    values.push(String::new());
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingEnvironment(missing));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();

        Ok(Self {
            tenant_id: next(),
            client_id: next(),
            client_secret: next(),
            subscription_id: next(),
            resource_id: next(),
            arm_endpoint: next(),
            location: next(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("resource_id", &self.resource_id)
            .field("arm_endpoint", &self.arm_endpoint)
            .field("location", &self.location)
            .finish()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What the sample creates
    pub sample: SampleConfig,

    /// How the management API is reached
    pub api: ApiConfig,
}

/// Names and properties used by the sample run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Resource group created and deleted by the run
    pub resource_group: String,

    /// Location for created resources; falls back to `AZURESTACK_LOCATION`
    pub location: Option<String>,

    /// Tags applied in the tag update step
    pub tags: BTreeMap<String, String>,

    /// Name of the key vault created with a generic PUT
    pub vault_name: String,

    /// api-version for the key vault resource provider
    pub vault_api_version: String,

    /// Wait for a line on stdin before deleting the resource group
    pub confirm_delete: bool,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            resource_group: "sample-dotnet-group-mgmt".to_string(),
            location: None,
            tags: BTreeMap::from([("Hello".to_string(), "World".to_string())]),
            vault_name: "bdARMTestVault".to_string(),
            vault_api_version: "2015-06-01".to_string(),
            confirm_delete: true,
        }
    }
}

impl SampleConfig {
    /// Location to create resources in.
    pub fn location<'a>(&'a self, credentials: &'a Credentials) -> &'a str {
        self.location.as_deref().unwrap_or(&credentials.location)
    }
}

/// Management API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Token issuer base URL
    pub authority: String,

    /// api-version for resource group and resource listing calls
    pub resources_api_version: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay between long-running operation polls when the service gives none
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Give up on a long-running operation after this long
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Require an https token authority
    pub validate_authority: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            resources_api_version: DEFAULT_RESOURCES_API_VERSION.to_string(),
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(30 * 60),
            validate_authority: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());

        Ok(config)
    }

    /// Pick the configuration file to read, if any.
    ///
    /// An explicit path always wins, even when the file does not exist.
    fn find_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
        let config_dir = dirs::config_dir();
        Self::find_config_file_in(
            explicit_path,
            |name| std::env::var(name).ok(),
            Path::new("."),
            config_dir.as_deref(),
        )
    }

    /// Lookup order: explicit path, `RGMGMT_CONFIG`, `rgmgmt.toml` in
    /// `working_dir`, then `rgmgmt/rgmgmt.toml` under `config_dir`.
    fn find_config_file_in<F>(
        explicit_path: Option<&Path>,
        lookup: F,
        working_dir: &Path,
        config_dir: Option<&Path>,
    ) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = explicit_path {
            return Some(path.to_path_buf());
        }

        if let Some(env_config) = lookup(ENV_CONFIG).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(env_config));
        }

        let mut candidates = vec![working_dir.join("rgmgmt.toml")];
        if let Some(config_dir) = config_dir {
            candidates.push(config_dir.join("rgmgmt").join("rgmgmt.toml"));
        }

        candidates.into_iter().find(|p| p.exists())
    }

    /// Load from a specific TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // RGMGMT_AUTHORITY
        if let Some(authority) = lookup("RGMGMT_AUTHORITY").filter(|v| !v.is_empty()) {
            self.api.authority = authority;
        }

        // RGMGMT_API_VERSION
        if let Some(version) = lookup("RGMGMT_API_VERSION").filter(|v| !v.is_empty()) {
            self.api.resources_api_version = version;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn full_env() -> HashMap<&'static str, String> {
        REQUIRED_ENV_VARS
            .iter()
            .map(|name| (*name, format!("value-of-{}", name)))
            .collect()
    }

    #[test]
    fn test_credentials_from_complete_env() {
        let env = full_env();
        let creds = Credentials::from_lookup(|n| env.get(n).cloned()).unwrap();

        assert_eq!(creds.tenant_id, "value-of-AAD_TENANT_ID");
        assert_eq!(creds.client_secret, "value-of-APP_CLIENT_SECRET");
        assert_eq!(creds.arm_endpoint, "value-of-AZURESTACK_ARM_URI");
        assert_eq!(creds.location, "value-of-AZURESTACK_LOCATION");
    }

    #[test]
    fn test_credentials_report_every_missing_var() {
        let mut env = full_env();
        env.remove(ENV_CLIENT_ID);
        env.insert(ENV_LOCATION, String::new());

        let err = Credentials::from_lookup(|n| env.get(n).cloned()).unwrap_err();
        match err {
            Error::MissingEnvironment(names) => {
                assert_eq!(names, vec![ENV_CLIENT_ID.to_string(), ENV_LOCATION.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_credentials_empty_env() {
        let err = Credentials::from_lookup(|_| None).unwrap_err();
        match err {
            Error::MissingEnvironment(names) => assert_eq!(names.len(), 7),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let env = full_env();
        let creds = Credentials::from_lookup(|n| env.get(n).cloned()).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("value-of-APP_CLIENT_SECRET"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample.resource_group, "sample-dotnet-group-mgmt");
        assert_eq!(config.sample.vault_name, "bdARMTestVault");
        assert_eq!(config.sample.vault_api_version, "2015-06-01");
        assert_eq!(config.sample.tags.get("Hello").map(String::as_str), Some("World"));
        assert!(config.sample.confirm_delete);
        assert_eq!(config.api.authority, DEFAULT_AUTHORITY);
        assert_eq!(config.api.timeout, Duration::from_secs(60));
        assert!(config.api.validate_authority);
    }

    #[test]
    fn test_location_falls_back_to_env() {
        let env = full_env();
        let creds = Credentials::from_lookup(|n| env.get(n).cloned()).unwrap();
        let mut sample = SampleConfig::default();
        assert_eq!(sample.location(&creds), "value-of-AZURESTACK_LOCATION");

        sample.location = Some("local".to_string());
        assert_eq!(sample.location(&creds), "local");
    }

    #[test]
    fn test_config_from_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[sample]
resource_group = "rg-from-file"
confirm_delete = false

[api]
poll_interval = "250ms"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sample.resource_group, "rg-from-file");
        assert!(!config.sample.confirm_delete);
        assert_eq!(config.sample.vault_name, "bdARMTestVault");
        assert_eq!(config.api.poll_interval, Duration::from_millis(250));
        assert_eq!(config.api.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sample\nresource_group = 1").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/rgmgmt.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rgmgmt.toml"));
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env_overrides(|name| match name {
            "RGMGMT_AUTHORITY" => Some("https://login.example.test/".to_string()),
            "RGMGMT_API_VERSION" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api.authority, "https://login.example.test/");
        assert_eq!(
            config.api.resources_api_version,
            DEFAULT_RESOURCES_API_VERSION
        );
    }

    fn write_config(path: &Path, resource_group: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            format!("[sample]\nresource_group = \"{}\"\n", resource_group),
        )
        .unwrap();
    }

    #[test]
    fn test_config_lookup_order() {
        let work = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        let local = work.path().join("rgmgmt.toml");
        let per_user = user.path().join("rgmgmt").join("rgmgmt.toml");
        let no_env = |_: &str| None;

        // Nothing on disk
        assert_eq!(
            Config::find_config_file_in(None, no_env, work.path(), Some(user.path())),
            None
        );

        write_config(&per_user, "rg-user");
        assert_eq!(
            Config::find_config_file_in(None, no_env, work.path(), Some(user.path())),
            Some(per_user.clone())
        );

        write_config(&local, "rg-local");
        assert_eq!(
            Config::find_config_file_in(None, no_env, work.path(), Some(user.path())),
            Some(local.clone())
        );

        let from_env = |name: &str| (name == ENV_CONFIG).then(|| "/etc/rgmgmt/env.toml".to_string());
        assert_eq!(
            Config::find_config_file_in(None, from_env, work.path(), Some(user.path())),
            Some(PathBuf::from("/etc/rgmgmt/env.toml"))
        );

        let explicit = Path::new("explicit.toml");
        assert_eq!(
            Config::find_config_file_in(Some(explicit), from_env, work.path(), Some(user.path())),
            Some(explicit.to_path_buf())
        );
    }

    #[test]
    fn test_empty_config_env_is_ignored() {
        let work = tempfile::tempdir().unwrap();
        let empty = |_: &str| Some(String::new());
        assert_eq!(
            Config::find_config_file_in(None, empty, work.path(), None),
            None
        );
    }

    #[test]
    fn test_found_file_is_loaded() {
        let work = tempfile::tempdir().unwrap();
        let local = work.path().join("rgmgmt.toml");
        write_config(&local, "rg-local");

        let path = Config::find_config_file_in(None, |_| None, work.path(), None).unwrap();
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.sample.resource_group, "rg-local");
    }
}
