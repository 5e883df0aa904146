use std::time::Duration;

use clap::Args;

use policyd_engine::RuleEngine;

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Application name the data is posted on behalf of.
    #[arg(long = "app-name")]
    pub app_name: String,

    /// Path to the raw XML application data to submit.
    #[arg(long = "data-file")]
    pub data_file: std::path::PathBuf,
}

/// Submit `data_file`'s contents to `engine`'s receive queue, then give the
/// background processing worker a short grace period to drain it before this
/// short-lived process exits — there is no long-lived daemon here to keep
/// the worker alive once the CLI returns.
pub async fn run(engine: &RuleEngine, args: &DataArgs) -> anyhow::Result<()> {
    let data = std::fs::read(&args.data_file)?;
    anyhow::ensure!(!data.is_empty(), "empty application data file");

    engine.receive_application_data(&args.app_name, data);
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("Posted application data for {}", args.app_name);
    Ok(())
}
