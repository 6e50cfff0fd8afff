use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chainwatch_server::startup::load_rules;
use chainwatch_server::{build_router, AlertPipeline, AppState};

/// Alert rule engine for on-chain wallet events.
#[derive(Debug, Parser)]
#[command(name = "chainwatch-server", version)]
struct Cli {
    /// Directory of YAML rule definitions (overrides RULES_DIR).
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Listen port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Start with an empty rule set.
    #[arg(long)]
    no_load: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chainwatch_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = chainwatch_core::Config::from_env();
    if let Some(dir) = cli.rules_dir {
        config.rules.rules_dir = dir;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;
    config.log_summary();

    let pipeline = AlertPipeline::from_config(&config)?;
    if !cli.no_load {
        load_rules(pipeline.engine(), &config.rules.rules_dir);
    }

    let state = Arc::new(AppState::new(pipeline, config.server.cors_origin.clone()));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
