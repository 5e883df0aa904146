//! policyd CLI
//!
//! A thin command-line wrapper over `policyd-engine`: every invocation loads
//! the configured rule store, performs one operation, and exits.

mod commands;

use std::path::Path;

use clap::{Parser, Subcommand};
use policyd_engine::PolicydConfig;
use tracing_subscriber::{EnvFilter, fmt};

/// policyd — manage rules in the policyd rule engine.
#[derive(Parser, Debug)]
#[command(name = "policyd", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "POLICYD_CONFIG", default_value = "policyd.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage rules: add, delete, enable, disable, get, list, execute.
    Rules(commands::rules::RulesArgs),
    /// Submit application data for receive-mode rules to evaluate.
    PostApplicationData(commands::data::DataArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config: PolicydConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str(r#"rules_dir = "rules""#)?
    };

    let engine = config.build();

    match &cli.command {
        Command::Rules(args) => commands::rules::run(&engine, args).await?,
        Command::PostApplicationData(args) => commands::data::run(&engine, args).await?,
    }

    Ok(())
}
