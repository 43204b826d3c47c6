//! Strictly Gridtoe server library
//!
//! Hosts concurrent N-player tic-tac-toe sessions over TCP.
//!
//! # Architecture
//!
//! - **Protocol**: one JSON message per line, tagged by `"type"`
//! - **Connection**: line-framed reader plus a writer task per client
//! - **Driver**: per-connection translation of intents into session calls,
//!   with fan-out of every state change to all participants
//! - **Server**: accept loop sharing one session registry
//! - **Client**: typed async client for the same protocol
//!
//! # Example
//!
//! ```no_run
//! use strictly_gridtoe_server::{GameServer, ServerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = GameServer::bind(ServerConfig::default()).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
mod client;
mod config;
mod connection;
mod driver;
mod outbox;
pub mod protocol;
mod server;

pub use client::GameClient;
pub use config::{ConfigError, ServerConfig};
pub use connection::serve_connection;
pub use driver::{Flow, Registry, SessionDriver};
pub use outbox::{ConnectionId, Outbox, broadcast};
pub use protocol::{ClientIntent, GameResult, ServerEvent};
pub use server::GameServer;
