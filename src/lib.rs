//! # rgmgmt - Resource Group Management on Azure Stack
//!
//! rgmgmt authenticates a service principal against Azure Active Directory and
//! drives the Azure Resource Manager REST API of an Azure Stack stamp through
//! the life cycle of one resource group.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    CLI Interface                      │
//! │          (clap parsing, colored step output)          │
//! └──────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                    Sample runner                      │
//! │        (fixed sequence of management calls)           │
//! └──────────────────────────────────────────────────────┘
//!                            │
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//! ┌────────────────────────┐   ┌────────────────────────┐
//! │    Resource Manager    │   │   Token credential     │
//! │   client (reqwest +    │──▶│  (client credentials   │
//! │   long-running ops)    │   │   grant, cached)       │
//! └────────────────────────┘   └────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rgmgmt::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let creds = Credentials::from_env()?;
//!     let credential = ClientSecretCredential::builder(
//!         &creds.tenant_id,
//!         &creds.client_id,
//!         &creds.client_secret,
//!     )
//!     .audience(&creds.resource_id)
//!     .build()?;
//!
//!     let client = ArmClient::builder(&creds.arm_endpoint, &creds.subscription_id)
//!         .credential(Arc::new(credential))
//!         .build()?;
//!
//!     for group in client.resource_groups().list().await? {
//!         println!("{:?}", group.name);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Commonly used items.
pub mod prelude {
    pub use crate::arm::models::{
        ExportTemplateRequest, GenericResource, ResourceGroup, ResourceGroupExportResult, Tags,
    };
    pub use crate::arm::resources::ResourcePath;
    pub use crate::arm::ArmClient;
    pub use crate::auth::{AccessToken, ClientSecretCredential, TokenCredential};
    pub use crate::config::{Config, Credentials};
    pub use crate::error::{Error, Result};
    pub use crate::sample::{Reporter, RunSummary, Sample};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Connection settings from the environment and optional TOML configuration.
pub mod config;

// ============================================================================
// Management API
// ============================================================================

/// Access tokens for the management endpoint.
///
/// Provides the [`TokenCredential`](auth::TokenCredential) trait and the
/// client credentials grant used to obtain bearer tokens.
pub mod auth;

/// Typed client for the Resource Manager REST API.
pub mod arm;

// ============================================================================
// Walkthrough
// ============================================================================

/// The fixed sequence of resource group operations.
pub mod sample;

pub use error::{Error, Result};

/// Version of the rgmgmt library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
