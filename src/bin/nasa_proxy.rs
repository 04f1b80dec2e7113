use anyhow::Context;
use clap::Parser;
use log::info;
use solar_compare::proxy::app_state::{AppState, QueryDefaults};
use solar_compare::proxy::router;
use solar_compare::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serves NASA POWER daily data as flat JSON records")]
struct Cli {
    #[arg(short, long, env = "SOLAR_COMPARE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `proxy.bind`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    let state = Arc::new(AppState {
        client: settings.power_client()?,
        defaults: QueryDefaults::from(&settings.proxy),
    });

    let bind = cli.bind.unwrap_or_else(|| settings.proxy.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("nasa-proxy listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
