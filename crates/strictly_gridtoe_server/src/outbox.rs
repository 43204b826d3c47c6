//! Per-connection outbound queues and fan-out.

use crate::protocol::ServerEvent;
use derive_more::{Display, From};
use strictly_gridtoe::Recipient;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{instrument, trace, warn};

/// Identifier assigned to each accepted connection, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From)]
pub struct ConnectionId(u64);

/// Sending half of a connection's outbound queue.
///
/// Delivery never waits: a full queue (slow reader) or a closed one (gone
/// reader) drops the event so one recipient cannot hold up the others.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection: ConnectionId,
    tx: mpsc::Sender<ServerEvent>,
}

impl Outbox {
    /// Creates an outbox and the receiver its writer task drains.
    pub fn channel(connection: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { connection, tx }, rx)
    }

    /// Connection this outbox belongs to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Queues `event`. Returns false if it was dropped.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(connection = %self.connection, ?event, "Outbox full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!(connection = %self.connection, "Outbox closed, dropping event");
                false
            }
        }
    }
}

/// Sends a copy of `event` to every recipient. Returns how many accepted it.
#[instrument(skip_all, fields(recipients = recipients.len()))]
pub fn broadcast(recipients: &[Recipient<Outbox>], event: &ServerEvent) -> usize {
    recipients
        .iter()
        .filter(|r| r.handle.deliver(event.clone()))
        .count()
}
