//! WAF Policy Autopilot CLI
//!
//! Renders Firewall Manager WAFv2 policies for tagged Application Load
//! Balancers and optionally pushes them through the FMS API.

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_target(false)
        .init();

    let result = match cli.command {
        Commands::Render(args) => commands::render(args).await,
        Commands::Apply(args) => commands::apply(args).await,
        Commands::ValidateConfig { path } => commands::validate_config(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
