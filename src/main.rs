use anyhow::Result;
use clap::{Parser, Subcommand};
use redline::output::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "redline")]
#[command(version, about = "Diff-driven code review: deterministic rules plus an AI provider")]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to ./redline.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review a unified diff and print findings
    Review {
        /// Path to the diff file
        #[arg(short, long)]
        diff: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,

        /// Run only the deterministic rules stage, skipping the provider
        #[arg(long, conflicts_with = "no_rules")]
        rules_only: bool,

        /// Skip the deterministic rules stage
        #[arg(long)]
        no_rules: bool,
    },
    /// View, validate, or scaffold configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Inspect configured rules
    Rules {
        #[command(subcommand)]
        command: Option<RulesCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a starter redline.toml in the working directory
    Init,
}

#[derive(Subcommand, Clone)]
pub enum RulesCommands {
    /// List enabled rules
    List,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "redline=debug" } else { "redline=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Review {
            diff,
            format,
            rules_only,
            no_rules,
        } => cmd::cmd_review(config_path, diff, *format, *rules_only, *no_rules)?,
        Commands::Config { command } => cmd::cmd_config(config_path, command.clone())?,
        Commands::Rules { command } => cmd::cmd_rules(config_path, command.clone())?,
    }

    Ok(())
}
