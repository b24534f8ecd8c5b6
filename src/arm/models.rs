//! Wire types for the Resource Manager REST API.
//!
//! Read-only properties (`id`, `name`, `type`, provisioning state) are
//! optional so the same structs serve as request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Resource tags.
pub type Tags = BTreeMap<String, String>;

/// A resource group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing)]
    pub properties: Option<ResourceGroupProperties>,
}

impl ResourceGroup {
    /// Parameters for creating a group in `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Replace the tags.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Provisioning state reported by the service, if any.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// SKU of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

/// Any resource, with provider-specific properties kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing)]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl GenericResource {
    /// Parameters for a resource in `location` with the given properties.
    pub fn new(location: impl Into<String>, properties: Value) -> Self {
        Self {
            location: Some(location.into()),
            properties: Some(properties),
            ..Self::default()
        }
    }
}

/// Request body for exporting a resource group as a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTemplateRequest {
    /// Resource ids to export; `*` exports everything in the group
    pub resources: Vec<String>,
    /// Comma separated export options, e.g. `IncludeParameterDefaultValue`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl ExportTemplateRequest {
    /// Export every resource in the group.
    pub fn all_resources() -> Self {
        Self {
            resources: vec!["*".to_string()],
            options: None,
        }
    }
}

/// Result of a template export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupExportResult {
    #[serde(default)]
    pub template: Option<Value>,
    /// Set when some resources could not be exported
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Error payload returned by Resource Manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudError {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status resource.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resource_group_request_body() {
        let tags = Tags::from([("Hello".to_string(), "World".to_string())]);
        let group = ResourceGroup::new("local").with_tags(tags);

        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"location": "local", "tags": {"Hello": "World"}})
        );
    }

    #[test]
    fn test_resource_group_response() {
        let group: ResourceGroup = serde_json::from_value(json!({
            "id": "/subscriptions/sub/resourceGroups/rg1",
            "name": "rg1",
            "location": "local",
            "properties": {"provisioningState": "Succeeded"}
        }))
        .unwrap();

        assert_eq!(group.name.as_deref(), Some("rg1"));
        assert_eq!(group.provisioning_state(), Some("Succeeded"));
        assert_eq!(group.tags, None);
    }

    #[test]
    fn test_generic_resource_round_trip_fields() {
        let resource: GenericResource = serde_json::from_value(json!({
            "id": "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/v1",
            "name": "v1",
            "type": "Microsoft.KeyVault/vaults",
            "location": "local",
            "properties": {"vaultUri": "https://v1.vault.local/"}
        }))
        .unwrap();

        assert_eq!(resource.resource_type.as_deref(), Some("Microsoft.KeyVault/vaults"));

        let body = serde_json::to_value(&resource).unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("type").is_none());
        assert_eq!(body["properties"]["vaultUri"], "https://v1.vault.local/");
    }

    #[test]
    fn test_export_request_body() {
        assert_eq!(
            serde_json::to_value(ExportTemplateRequest::all_resources()).unwrap(),
            json!({"resources": ["*"]})
        );
        let with_options = ExportTemplateRequest {
            options: Some("IncludeComments".to_string()),
            ..ExportTemplateRequest::all_resources()
        };
        assert_eq!(
            serde_json::to_value(with_options).unwrap(),
            json!({"resources": ["*"], "options": "IncludeComments"})
        );
    }

    #[test]
    fn test_page_without_next_link() {
        let page: Page<ResourceGroup> =
            serde_json::from_value(json!({"value": [{"location": "local"}]})).unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_cloud_error() {
        let err: CloudError = serde_json::from_value(json!({
            "error": {"code": "ResourceGroupNotFound", "message": "Resource group 'x' could not be found."}
        }))
        .unwrap();
        assert_eq!(err.error.code, "ResourceGroupNotFound");
        assert!(err.error.details.is_empty());
    }
}
