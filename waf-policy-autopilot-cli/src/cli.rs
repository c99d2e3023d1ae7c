//! CLI argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "waf-policy-autopilot")]
#[command(
    version,
    about = "Render and apply Firewall Manager WAFv2 policies for tagged ALBs"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render policies to a JSON file
    Render(RenderArgs),

    /// Check OU membership, discover ALBs and upsert their FMS policies
    Apply(ApplyArgs),

    /// Load and validate a rule table
    ValidateConfig {
        /// Path to the YAML rule table
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Discover ALBs from AWS instead of reading --input
    #[arg(long)]
    pub discover: bool,

    /// Resources JSON file used when --discover is not set
    #[arg(long, default_value = "resources.json")]
    pub input: PathBuf,

    /// Rule table YAML; the built-in table plus environment overrides is used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the rendered policies
    #[arg(long, default_value = "generated/policies.json")]
    pub output: PathBuf,

    /// AWS region for discovery
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Rule table YAML; defaults to CONFIG_SSM_PARAM, CONFIG_PATH or the built-in table
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Only act when this account belongs to the OU; also scopes the policies
    #[arg(long, env = "OU_ID")]
    pub ou_id: Option<String>,

    /// Log intended changes without calling PutPolicy
    #[arg(long)]
    pub dry_run: bool,
}
