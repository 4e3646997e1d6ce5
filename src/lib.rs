pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod indexer;

use clap::{CommandFactory, Parser};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use db::Store;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let args = cli::Cli::parse();

    match args.command {
        Some(cli::Commands::Serve) => run_serve(config).await,
        Some(cli::Commands::Index) => run_index(config).await,
        Some(cli::Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }
        None => {
            cli::Cli::command().print_help()?;
            Ok(())
        }
    }
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    config.validate_for_serve()?;

    info!("Partpix v{} starting...", env!("CARGO_PKG_VERSION"));

    let state = api::create_app_state_from_config(config.clone()).await?;

    let port = config.server.port;
    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("Listening at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {e}");
        }
    });

    info!("Service running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {e}");
        }
    }

    server_handle.abort();
    info!("Service stopped");

    Ok(())
}

async fn run_index(config: Config) -> anyhow::Result<()> {
    config.validate_for_index()?;

    let store = Store::with_pool_options(
        &config.database_url(),
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    let stats = indexer::run(&store, &config).await?;

    println!();
    println!("{:-<70}", "");
    println!("Index run complete!");
    println!("  Indexed: {}", stats.indexed);
    println!("  Skipped: {}", stats.skipped);
    if stats.failed > 0 {
        println!("  Failed:  {}", stats.failed);
    }

    if config.indexer.strict && stats.failed > 0 {
        anyhow::bail!("{} entries failed to index", stats.failed);
    }

    Ok(())
}
