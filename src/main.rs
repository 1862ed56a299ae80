//! TrainPanel CLI - web control panel for remote training jobs

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use trainpanel::cloud::{CommandRunner, GcloudClient, SystemRunner, TensorboardDashboard};
use trainpanel::config::{CliArgs, LogFormat, PanelConfig};
use trainpanel::web::PanelServer;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(&args);

    // Handle result
    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(args: &CliArgs) {
    let default_level = match args.verbose {
        0 => "info",
        1 => "trainpanel=debug,info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    // Build configuration
    let config = PanelConfig::from_cli(&args).context("invalid configuration")?;
    config
        .ensure_dirs()
        .context("cannot prepare instance directory")?;

    tracing::debug!(?config, "configuration resolved");

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let client = Arc::new(GcloudClient::from_config(&config, runner.clone()));
    let dashboard = Arc::new(TensorboardDashboard::from_config(&config, runner));

    PanelServer::new(config, client, dashboard)
        .run()
        .await
        .context("server error")
}
