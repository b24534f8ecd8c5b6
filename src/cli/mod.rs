//! CLI module for rgmgmt
//!
//! Argument parsing and console output for the `rgmgmt` binary.

pub mod output;

use clap::Parser;
use std::path::PathBuf;

/// Walk through resource group management against an Azure Stack endpoint.
///
/// Connection settings are read from AAD_TENANT_ID, APP_CLIENT_ID,
/// APP_CLIENT_SECRET, AZURESTACK_SUBSCRIPTION_ID, AZURESTACK_RESOURCE_ID,
/// AZURESTACK_ARM_URI and AZURESTACK_LOCATION.
#[derive(Parser, Debug, Clone)]
#[command(name = "rgmgmt")]
#[command(version)]
#[command(about = "Resource group management walkthrough for Azure Stack")]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, env = rgmgmt::config::ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Delete the resource group without waiting for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["rgmgmt"]).unwrap();
        assert_eq!(cli.verbosity(), 0);
        assert!(!cli.yes);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_verbosity_is_capped() {
        let cli = Cli::try_parse_from(["rgmgmt", "-vvvvv"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from(["rgmgmt", "--yes", "--no-color", "-c", "sample.toml"])
            .unwrap();
        assert!(cli.yes);
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("sample.toml")));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["rgmgmt", "--forks", "5"]).is_err());
    }
}
