//! Command-line entry shared by the node binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::config::resolve_config;
use crate::lifecycle::{run_node, ServiceVariant};

/// Emulated microservice node.
#[derive(Debug, Parser)]
#[command(version, long_about = None)]
pub struct NodeArgs {
    /// TOML configuration file. VECRO_* environment variables override it.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Resolve and validate the configuration, print it, then exit.
    #[arg(long)]
    pub check: bool,
}

/// Parse arguments, resolve configuration and run the node.
pub async fn run(variant: ServiceVariant) -> Result<(), Box<dyn std::error::Error>> {
    let args = NodeArgs::parse();
    let config = resolve_config(args.config.as_deref())?;

    if args.check {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    run_node(config, variant).await?;
    Ok(())
}
