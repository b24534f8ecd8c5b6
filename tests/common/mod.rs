//! Shared test utilities for the rgmgmt test suite.
//!
//! This module provides:
//! - A mock management endpoint that answers every call of a sample run
//! - A recording [`Reporter`] for asserting on run output
//! - Helpers for inspecting the order of received requests
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use serde_json::{json, Value};
use std::io;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rgmgmt::sample::Reporter;

pub const TENANT: &str = "tenant-1";
pub const SUBSCRIPTION: &str = "sub-1";
pub const GROUP: &str = "sample-dotnet-group-mgmt";
pub const VAULT: &str = "bdARMTestVault";
pub const LOCATION: &str = "local";

pub fn group_path() -> String {
    format!("/subscriptions/{}/resourcegroups/{}", SUBSCRIPTION, GROUP)
}

pub fn group_id() -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUBSCRIPTION, GROUP)
}

pub fn vault_path() -> String {
    format!("{}/providers/Microsoft.KeyVault/vaults/{}", group_path(), VAULT)
}

pub fn vault_id() -> String {
    format!("{}/providers/Microsoft.KeyVault/vaults/{}", group_id(), VAULT)
}

fn group_body(tags: Option<Value>) -> Value {
    let mut body = json!({
        "id": group_id(),
        "name": GROUP,
        "location": LOCATION,
        "properties": {"provisioningState": "Succeeded"}
    });
    if let Some(tags) = tags {
        body["tags"] = tags;
    }
    body
}

/// Mount a token endpoint for [`TENANT`] that issues `tok`.
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/token", TENANT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": "3600",
            "access_token": "tok"
        })))
        .mount(server)
        .await;
}

/// Mount every management call of a successful run.
pub async fn mount_management(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{}/resourcegroups", SUBSCRIPTION)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": format!("/subscriptions/{}/resourceGroups/existing", SUBSCRIPTION),
                "name": "existing",
                "location": LOCATION
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(group_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(group_body(Some(
            json!({"Hello": "World"}),
        ))))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(vault_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": vault_id(),
            "name": VAULT,
            "type": "Microsoft.KeyVault/vaults",
            "location": LOCATION,
            "properties": {"tenantId": TENANT}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/subscriptions/{}/resourceGroups/{}/resources",
            SUBSCRIPTION, GROUP
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": vault_id(),
                "name": VAULT,
                "type": "Microsoft.KeyVault/vaults",
                "location": LOCATION
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{}/exportTemplate", group_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "template": {
                "$schema": "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#",
                "contentVersion": "1.0.0.0",
                "resources": [{"type": "Microsoft.KeyVault/vaults", "name": VAULT}]
            }
        })))
        .mount(server)
        .await;

    let status_url = format!("{}/operationresults/delete", server.uri());
    Mock::given(method("DELETE"))
        .and(path(group_path()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", status_url.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/delete"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// `METHOD /path` of every request the server received, in order.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

/// The requests of a complete run, in order.
pub fn expected_run_log() -> Vec<String> {
    let list = format!("GET /subscriptions/{}/resourcegroups", SUBSCRIPTION);
    vec![
        format!("POST /{}/oauth2/token", TENANT),
        list.clone(),
        format!("PUT {}", group_path()),
        format!("PUT {}", group_path()),
        list,
        format!("PUT {}", vault_path()),
        format!(
            "GET /subscriptions/{}/resourceGroups/{}/resources",
            SUBSCRIPTION, GROUP
        ),
        format!("POST {}/exportTemplate", group_path()),
        format!("DELETE {}", group_path()),
        "GET /operationresults/delete".to_string(),
    ]
}

/// Reporter that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<String>,
    pub confirmations: usize,
}

impl RecordingReporter {
    pub fn steps(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| e.strip_prefix("step: "))
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn step(&mut self, message: &str) {
        self.events.push(format!("step: {}", message));
    }

    fn item(&mut self, label: &str, name: &str, id: &str) {
        self.events.push(format!("item: {} {} {}", label, name, id));
    }

    fn template(&mut self, template: &Value) {
        self.events.push(format!("template: {}", template));
    }

    fn end_step(&mut self) {}

    fn confirm(&mut self, prompt: &str) -> io::Result<()> {
        self.confirmations += 1;
        self.events.push(format!("confirm: {}", prompt));
        Ok(())
    }
}
