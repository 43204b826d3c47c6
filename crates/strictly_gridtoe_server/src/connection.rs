//! Line-framed JSON connection handling.

use crate::ServerConfig;
use crate::driver::{Flow, Registry, SessionDriver};
use crate::outbox::{ConnectionId, Outbox};
use crate::protocol::ClientIntent;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, instrument, warn};

/// How long queued events may take to flush once the connection is done.
const FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Serves one client until it quits or disconnects.
///
/// Inbound lines are parsed into [`ClientIntent`]s and handed to a
/// [`SessionDriver`]; a separate writer task drains the connection's outbox
/// so that slow writes never block the read loop or other sessions.
#[instrument(skip_all, fields(connection = %id, peer = %peer))]
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    registry: Registry,
    config: &ServerConfig,
) {
    info!("Client connected");

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(*config.max_line_length()));
    let (mut sink, mut lines) = framed.split();
    let (outbox, mut events) = Outbox::channel(id, *config.outbox_capacity());

    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to encode event");
                    continue;
                }
            };
            if let Err(e) = sink.send(line).await {
                debug!(error = %e, "Write failed, stopping writer");
                break;
            }
        }
        if let Err(e) = sink.close().await {
            debug!(error = %e, "Error closing connection");
        }
    });

    let mut driver = SessionDriver::new(registry, outbox);
    // A decode error pauses the stream for one `None` before reading resumes.
    let mut resuming = false;

    loop {
        let line = match lines.next().await {
            None if resuming => {
                resuming = false;
                continue;
            }
            None => {
                info!("Connection closed by peer");
                driver.disconnect();
                break;
            }
            Some(Ok(line)) => {
                resuming = false;
                line
            }
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!("Request line too long");
                driver.reject_malformed("Request line too long");
                resuming = true;
                continue;
            }
            Some(Err(LinesCodecError::Io(e))) => {
                warn!(error = %e, "Error reading from connection");
                driver.disconnect();
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ClientIntent>(line) {
            Ok(intent) => {
                if driver.handle(intent) == Flow::Close {
                    info!("Client quit");
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "Malformed request");
                driver.reject_malformed(format!("Malformed request: {}", e));
            }
        }
    }

    // Dropping the driver drops this connection's outbox; the writer exits
    // once every queued event is written.
    drop(driver);
    if tokio::time::timeout(FLUSH_GRACE, &mut writer).await.is_err() {
        debug!("Writer did not drain in time");
        writer.abort();
    }

    info!("Client disconnected");
}
