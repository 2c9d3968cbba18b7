mod routes;
mod state;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pocketbook_core::PocketbookConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "pocketbook")]
#[command(about = "Serve the pocketbook finance and calendar API")]
struct Cli {
    /// Config file (defaults to ./pocketbook.toml or ~/.config/pocketbook/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding data.json, events.json and images.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Static root; uploads are stored under picture/upload
    #[arg(long)]
    public_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut PocketbookConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(public_dir) = self.public_dir {
            config.public_dir = public_dir;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = PocketbookConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let state = AppState::open(&config)?;
    let app = routes::app(state, &config);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("pocketbook listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
