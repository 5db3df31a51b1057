pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;
pub mod state;

use std::path::Path;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;

pub async fn run() -> anyhow::Result<()> {
    // A .env file may carry QUILLD_TOKEN_SECRET; load it before the
    // config layer reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // `init` must run before validation: a fresh install has no token
    // secret yet, and init is what creates one.
    if let Some(Commands::Init) = cli.command {
        return cmd_init(cli.config.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    serve(config).await
}

fn cmd_init(path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map_or_else(Config::default_config_path, Path::to_path_buf);

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let mut config = Config::default();
    config.auth.token_secret = auth::generate_secret();
    config.save_to_path(&path)?;

    println!("✓ Config file created: {}", path.display());
    println!("  A token secret was generated for you.");
    println!("  Edit database.url, then start the server with 'quilld serve'.");

    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("quilld v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;

    let state = api::create_app_state_from_config(config).await?;
    let app = api::router(state).await;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }
}
