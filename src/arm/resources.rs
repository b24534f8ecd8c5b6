//! Generic resource operations.
//!
//! Any resource type can be written through the provider path
//! `resourcegroups/{group}/providers/{namespace}/{parent}/{type}/{name}`
//! as long as the caller knows the provider's api-version and body shape.

use reqwest::Method;
use std::fmt;
use tracing::info;

use super::lro;
use super::models::GenericResource;
use super::ArmClient;
use crate::error::{Error, Result};

/// Where a resource lives below its resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    /// Provider namespace, e.g. `Microsoft.KeyVault`
    pub provider_namespace: String,
    /// Path of the parent resource; empty for top-level resources
    pub parent_path: String,
    /// Resource type below the parent, e.g. `vaults`
    pub resource_type: String,
    /// Resource name
    pub name: String,
}

impl ResourcePath {
    /// A top-level resource.
    pub fn new(
        provider_namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider_namespace: provider_namespace.into(),
            parent_path: String::new(),
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    fn segments(&self) -> Vec<&str> {
        let mut segments = vec!["providers", self.provider_namespace.as_str()];
        segments.extend(self.parent_path.split('/').filter(|s| !s.is_empty()));
        segments.extend(self.resource_type.split('/').filter(|s| !s.is_empty()));
        segments.push(&self.name);
        segments
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.provider_namespace)?;
        if !self.parent_path.is_empty() {
            write!(f, "{}/", self.parent_path.trim_matches('/'))?;
        }
        write!(f, "{}/{}", self.resource_type, self.name)
    }
}

/// Operations on individual resources.
#[derive(Debug, Clone, Copy)]
pub struct Resources<'a> {
    client: &'a ArmClient,
}

impl<'a> Resources<'a> {
    pub(crate) fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    /// Create a resource, or replace an existing one, with a generic PUT.
    ///
    /// `api_version` is the resource provider's version, not the one used
    /// for resource group calls.
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        resource: &ResourcePath,
        api_version: &str,
        parameters: &GenericResource,
    ) -> Result<GenericResource> {
        let operation = format!("create or update '{}' in '{}'", resource, resource_group);

        let mut segments = vec!["resourcegroups", resource_group];
        segments.extend(resource.segments());
        let url = self.client.subscription_url(&segments, api_version)?;

        let response = self
            .client
            .send(Method::PUT, url.clone(), Some(parameters), &operation)
            .await?;
        let pending = lro::is_pending(&response);
        let body = lro::complete(self.client, response, &operation).await?;

        // After an async PUT the resource itself is the result.
        let body = match body {
            Some(body) if !pending => body,
            _ => self.client.get_json(url, &operation).await?,
        };

        let written: GenericResource = serde_json::from_value(body)
            .map_err(|e| Error::unexpected(&operation, e.to_string()))?;

        info!(
            resource = %resource,
            id = written.id.as_deref().unwrap_or(""),
            "Resource written"
        );
        Ok(written)
    }
}
