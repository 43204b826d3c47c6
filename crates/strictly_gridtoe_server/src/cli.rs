//! Command-line interface for strictly_gridtoe.

use crate::ServerConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Gridtoe - N-player tic-tac-toe server
#[derive(Parser, Debug)]
#[command(name = "gridtoe")]
#[command(about = "Multi-session N-player tic-tac-toe server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Serve(ConfigArgs),

    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

/// Configuration sources shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides the config file)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ConfigArgs {
    /// Loads the config file, if any, and applies command-line overrides.
    pub fn resolve(&self) -> Result<ServerConfig, crate::ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        Ok(config)
    }
}
