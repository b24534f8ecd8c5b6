//! rgmgmt - resource group management walkthrough for Azure Stack
//!
//! This is the main entry point for the rgmgmt CLI.

mod cli;

use anyhow::{Context, Result};
use cli::output::OutputFormatter;
use cli::Cli;
use rgmgmt::arm::ArmClient;
use rgmgmt::auth::ClientSecretCredential;
use rgmgmt::config::{Config, Credentials, REQUIRED_ENV_VARS};
use rgmgmt::sample::Sample;
use rgmgmt::{Error, VERSION};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let mut output = OutputFormatter::new(!cli.no_color, cli.verbosity());

    let exit_code = match run(&cli, &mut output).await {
        Ok(()) => 0,
        Err(e) => {
            output.flush();
            output.error(&format!("{:#}", e));
            if e.downcast_ref::<Error>().is_some_and(Error::is_auth_error) {
                output.hint("Check APP_CLIENT_ID, APP_CLIENT_SECRET and AAD_TENANT_ID");
            }
            1
        }
    };

    output.flush();
    if exit_code == 0 && output.write_failed() {
        output.error("Run output could not be written to stdout");
        std::process::exit(1);
    }
    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

async fn run(cli: &Cli, output: &mut OutputFormatter) -> Result<()> {
    debug!(version = VERSION, "Starting rgmgmt");

    let creds = match Credentials::from_env() {
        Ok(creds) => creds,
        Err(Error::MissingEnvironment(missing)) => {
            report_missing_environment(&missing);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let credential = ClientSecretCredential::builder(
        &creds.tenant_id,
        &creds.client_id,
        &creds.client_secret,
    )
    .authority(&config.api.authority)
    .audience(&creds.resource_id)
    .validate_authority(config.api.validate_authority)
    .timeout(config.api.timeout)
    .build()
    .context("Failed to set up service principal credential")?;
    debug!(token_url = %credential.token_url(), "Using token endpoint");

    let client = ArmClient::builder(&creds.arm_endpoint, &creds.subscription_id)
        .credential(Arc::new(credential))
        .api_config(&config.api)
        .build()
        .context("Failed to set up management client")?;

    let location = config.sample.location(&creds);
    let summary = Sample::new(&client, &creds.tenant_id, location, &config.sample)
        .confirm_delete(config.sample.confirm_delete && !cli.yes)
        .run(output)
        .await
        .with_context(|| {
            format!(
                "Sample run against {} did not complete",
                client.endpoint()
            )
        })?;

    debug!(?summary, "Sample finished");
    output.finished();
    Ok(())
}

/// Tell the user which variables to set. Nothing has been called yet.
fn report_missing_environment(missing: &[String]) {
    println!("This sample needs the following environment variables to be set:");
    for name in REQUIRED_ENV_VARS {
        if missing.iter().any(|m| m == name) {
            println!("  {} (missing)", name);
        } else {
            println!("  {}", name);
        }
    }
}
