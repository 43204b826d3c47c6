//! Strictly Gridtoe - server binary

use anyhow::Result;
use clap::Parser;
use strictly_gridtoe_server::GameServer;
use strictly_gridtoe_server::cli::{Cli, Command};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing();
            let config = args.resolve()?;
            run_server(config).await
        }
        Command::Config(args) => {
            print!("{}", args.resolve()?.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Run the game server until Ctrl-C
async fn run_server(config: strictly_gridtoe_server::ServerConfig) -> Result<()> {
    info!("Starting Strictly Gridtoe server");

    let server = GameServer::bind(config).await?;
    info!(addr = %server.local_addr()?, "Server ready");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
