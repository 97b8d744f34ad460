//! Command implementations

mod config;
mod finance;
mod render;
mod report;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;
use solarmatch_core::config::CliConfigOverrides;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut overrides = CliConfigOverrides {
        api_base_url: cli.api_url,
        pricing_file: cli.pricing,
        ..Default::default()
    };
    if let Commands::Report(args) = &cli.command {
        overrides.radius_meters = args.radius;
        overrides.heatmap_scheme = args.scheme;
    }
    let config = load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Report(args) => report::execute(args, &config, &output).await,
        Commands::Finance(args) => finance::execute(args, &config, &output),
        Commands::Render(args) => render::execute(args, &config, &output),
        Commands::Config => config::execute(&config, &output),
    }
}
