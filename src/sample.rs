//! The resource group walkthrough.
//!
//! [`Sample::run`] performs one fixed sequence of calls against the
//! management API and reports each result through a [`Reporter`]:
//!
//! 1. acquire a token
//! 2. list resource groups
//! 3. create the sample resource group
//! 4. add tags to it
//! 5. list resource groups again
//! 6. create a key vault with a generic PUT
//! 7. list the resources in the group
//! 8. export the group as a template
//! 9. wait for confirmation
//! 10. delete the group
//!
//! Any failed call ends the run with its error; later steps are not attempted.

use serde::Serialize;
use serde_json::Value;
use std::io;
use tracing::info;

use crate::arm::models::{ExportTemplateRequest, GenericResource, ResourceGroup};
use crate::arm::resources::ResourcePath;
use crate::arm::ArmClient;
use crate::config::SampleConfig;
use crate::error::Result;

/// Provider namespace of the key vault created by the run.
pub const KEY_VAULT_NAMESPACE: &str = "Microsoft.KeyVault";

/// Resource type of the key vault created by the run.
pub const KEY_VAULT_TYPE: &str = "vaults";

/// Receives the output of a run.
pub trait Reporter {
    /// A step is starting.
    fn step(&mut self, message: &str);

    /// One listed or created item.
    fn item(&mut self, label: &str, name: &str, id: &str);

    /// The exported template.
    fn template(&mut self, template: &Value);

    /// A step has finished.
    fn end_step(&mut self);

    /// Block until the user agrees to continue.
    fn confirm(&mut self, prompt: &str) -> io::Result<()>;
}

/// Key vault SKU as the provider expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyVaultSku {
    pub family: String,
    pub name: String,
}

impl Default for KeyVaultSku {
    fn default() -> Self {
        Self {
            family: "A".to_string(),
            name: "standard".to_string(),
        }
    }
}

/// Properties of the key vault created by the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    pub tenant_id: String,
    pub sku: KeyVaultSku,
    pub access_policies: Vec<Value>,
    pub enabled_for_deployment: bool,
    pub enabled_for_template_deployment: bool,
    pub enabled_for_disk_encryption: bool,
}

impl KeyVaultProperties {
    /// A standard vault with no access policies, open to deployments.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            sku: KeyVaultSku::default(),
            access_policies: Vec::new(),
            enabled_for_deployment: true,
            enabled_for_template_deployment: true,
            enabled_for_disk_encryption: true,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Resource groups seen in the first listing
    pub groups_before: usize,
    /// Resource groups seen after creating the sample group
    pub groups_after: usize,
    /// Id of the created key vault
    pub vault_id: Option<String>,
    /// Resources found in the sample group
    pub resources: usize,
    /// Whether the export returned a template
    pub exported: bool,
}

/// The walkthrough, bound to a client and its settings.
pub struct Sample<'a> {
    client: &'a ArmClient,
    tenant_id: &'a str,
    location: &'a str,
    config: &'a SampleConfig,
    confirm_delete: bool,
}

impl<'a> Sample<'a> {
    pub fn new(
        client: &'a ArmClient,
        tenant_id: &'a str,
        location: &'a str,
        config: &'a SampleConfig,
    ) -> Self {
        Self {
            client,
            tenant_id,
            location,
            config,
            confirm_delete: config.confirm_delete,
        }
    }

    /// Skip (or require) the confirmation before deletion.
    pub fn confirm_delete(mut self, confirm: bool) -> Self {
        self.confirm_delete = confirm;
        self
    }

    /// Run every step in order.
    pub async fn run<R: Reporter + ?Sized>(&self, reporter: &mut R) -> Result<RunSummary> {
        let group_name = self.config.resource_group.as_str();
        let groups = self.client.resource_groups();
        let mut summary = RunSummary::default();

        self.client.authenticate().await?;
        info!(endpoint = %self.client.endpoint(), "Authenticated against management endpoint");

        summary.groups_before = self.list_groups(reporter).await?;

        reporter.step(&format!(
            "Creating resource group named {} in {}",
            group_name, self.location
        ));
        let params = ResourceGroup::new(self.location);
        groups.create_or_update(group_name, &params).await?;
        reporter.end_step();

        reporter.step("Adding tags to the resource group");
        let params = params.with_tags(self.config.tags.clone());
        groups.create_or_update(group_name, &params).await?;
        reporter.end_step();

        summary.groups_after = self.list_groups(reporter).await?;

        reporter.step("Create a Key Vault resource with a generic PUT");
        let properties = serde_json::to_value(KeyVaultProperties::new(self.tenant_id))?;
        let vault = self
            .client
            .resources()
            .create_or_update(
                group_name,
                &ResourcePath::new(KEY_VAULT_NAMESPACE, KEY_VAULT_TYPE, &self.config.vault_name),
                &self.config.vault_api_version,
                &GenericResource::new(self.location, properties),
            )
            .await?;
        reporter.item(
            "Key Vault",
            vault.name.as_deref().unwrap_or_default(),
            vault.id.as_deref().unwrap_or_default(),
        );
        summary.vault_id = vault.id;
        reporter.end_step();

        reporter.step(&format!("Listing resources within group {}", group_name));
        let resources = groups.list_resources(group_name).await?;
        for resource in &resources {
            reporter.item(
                "Resource",
                resource.name.as_deref().unwrap_or_default(),
                resource.id.as_deref().unwrap_or_default(),
            );
        }
        summary.resources = resources.len();
        reporter.end_step();

        reporter.step(&format!(
            "Exporting the resource group template for {}",
            group_name
        ));
        let export = groups
            .export_template(group_name, &ExportTemplateRequest::all_resources())
            .await?;
        if let Some(template) = &export.template {
            reporter.template(template);
            summary.exported = true;
        }
        reporter.end_step();

        if self.confirm_delete {
            reporter.confirm("Press any key to continue and delete the sample resources")?;
        }

        reporter.step(&format!(
            "deleting resource group {} and all resources within it",
            group_name
        ));
        groups.delete(group_name).await?;
        reporter.end_step();

        Ok(summary)
    }

    async fn list_groups<R: Reporter + ?Sized>(&self, reporter: &mut R) -> Result<usize> {
        reporter.step("Listing resource groups:");
        let listed = self.client.resource_groups().list().await?;
        for group in &listed {
            reporter.item(
                "Resource group",
                group.name.as_deref().unwrap_or_default(),
                group.id.as_deref().unwrap_or_default(),
            );
        }
        reporter.end_step();
        Ok(listed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_key_vault_properties_body() {
        let body = serde_json::to_value(KeyVaultProperties::new("tenant-1")).unwrap();
        assert_eq!(
            body,
            json!({
                "tenantId": "tenant-1",
                "sku": {"family": "A", "name": "standard"},
                "accessPolicies": [],
                "enabledForDeployment": true,
                "enabledForTemplateDeployment": true,
                "enabledForDiskEncryption": true
            })
        );
    }
}
