//! Resource group operations.

use reqwest::Method;
use tracing::{info, warn};

use super::lro;
use super::models::{ExportTemplateRequest, GenericResource, ResourceGroup, ResourceGroupExportResult};
use super::ArmClient;
use crate::error::{Error, Result};

/// Operations on the resource groups of a subscription.
#[derive(Debug, Clone, Copy)]
pub struct ResourceGroups<'a> {
    client: &'a ArmClient,
}

impl<'a> ResourceGroups<'a> {
    pub(crate) fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    fn api_version(&self) -> &str {
        self.client.api_version()
    }

    /// List every resource group in the subscription.
    pub async fn list(&self) -> Result<Vec<ResourceGroup>> {
        let url = self
            .client
            .subscription_url(&["resourcegroups"], self.api_version())?;
        self.client.list_all(url, "list resource groups").await
    }

    /// Create a resource group, or replace the properties of an existing one.
    pub async fn create_or_update(&self, name: &str, group: &ResourceGroup) -> Result<ResourceGroup> {
        let operation = format!("create or update resource group '{}'", name);
        let url = self
            .client
            .subscription_url(&["resourcegroups", name], self.api_version())?;

        let response = self
            .client
            .send(Method::PUT, url, Some(group), &operation)
            .await?;
        let body = lro::complete(self.client, response, &operation)
            .await?
            .ok_or_else(|| Error::unexpected(&operation, "empty response body"))?;

        let created: ResourceGroup = serde_json::from_value(body)?;
        info!(
            resource_group = name,
            provisioning_state = created.provisioning_state().unwrap_or("unknown"),
            "Resource group written"
        );
        Ok(created)
    }

    /// Delete a resource group and every resource in it.
    ///
    /// Returns once the service reports the deletion finished.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let operation = format!("delete resource group '{}'", name);
        let url = self
            .client
            .subscription_url(&["resourcegroups", name], self.api_version())?;

        let response = self
            .client
            .send::<()>(Method::DELETE, url, None, &operation)
            .await?;
        lro::complete(self.client, response, &operation).await?;

        info!(resource_group = name, "Resource group deleted");
        Ok(())
    }

    /// List the resources contained in a resource group.
    pub async fn list_resources(&self, name: &str) -> Result<Vec<GenericResource>> {
        let operation = format!("list resources in '{}'", name);
        let url = self
            .client
            .subscription_url(&["resourceGroups", name, "resources"], self.api_version())?;
        self.client.list_all(url, &operation).await
    }

    /// Capture a resource group as a template.
    pub async fn export_template(
        &self,
        name: &str,
        request: &ExportTemplateRequest,
    ) -> Result<ResourceGroupExportResult> {
        let operation = format!("export template of '{}'", name);
        let url = self
            .client
            .subscription_url(&["resourcegroups", name, "exportTemplate"], self.api_version())?;

        let response = self
            .client
            .send(Method::POST, url, Some(request), &operation)
            .await?;
        let body = lro::complete(self.client, response, &operation)
            .await?
            .ok_or_else(|| Error::unexpected(&operation, "empty response body"))?;

        let result: ResourceGroupExportResult = serde_json::from_value(body)?;
        if let Some(err) = &result.error {
            warn!(
                resource_group = name,
                code = %err.code,
                message = %err.message,
                "Template export was partial"
            );
        }
        Ok(result)
    }
}
