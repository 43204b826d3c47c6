//! Typed client for the line-framed JSON protocol.

use crate::protocol::{ClientIntent, ServerEvent};
use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use strictly_gridtoe::{Mark, SessionId, SessionSummary};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, instrument};

/// Client connection to a game server.
#[derive(Debug)]
pub struct GameClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl GameClient {
    /// Connects to the server.
    #[instrument(skip(addr))]
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("Failed to connect to game server")?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
        })
    }

    /// Sends one intent.
    pub async fn send(&mut self, intent: &ClientIntent) -> Result<()> {
        let line = serde_json::to_string(intent)?;
        debug!(%line, "Sending intent");
        self.framed.send(line).await?;
        Ok(())
    }

    /// Sends a raw line, bypassing encoding.
    pub async fn send_raw(&mut self, line: impl Into<String>) -> Result<()> {
        self.framed.send(line.into()).await?;
        Ok(())
    }

    /// Waits for the next event; `None` once the server closed the
    /// connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        match self.framed.next().await {
            None => Ok(None),
            Some(line) => {
                let line = line?;
                let event = serde_json::from_str(&line)
                    .with_context(|| format!("Unreadable event: {}", line))?;
                Ok(Some(event))
            }
        }
    }

    /// Reads events until `pick` accepts one, skipping the rest.
    ///
    /// A [`ServerEvent::Rejected`] that `pick` does not accept is returned as
    /// an error.
    pub async fn wait_for<T>(
        &mut self,
        mut pick: impl FnMut(&ServerEvent) -> Option<T>,
    ) -> Result<T> {
        loop {
            let Some(event) = self.next_event().await? else {
                bail!("Connection closed while waiting for event");
            };
            if let Some(value) = pick(&event) {
                return Ok(value);
            }
            if let ServerEvent::Rejected { kind, reason } = event {
                bail!("Request rejected ({}): {}", kind, reason);
            }
            debug!(?event, "Skipping event");
        }
    }

    /// Creates a session and returns its id and this client's mark.
    pub async fn create_session(
        &mut self,
        capacity: usize,
        name: impl Into<String>,
    ) -> Result<(SessionId, Mark)> {
        self.send(&ClientIntent::CreateSession {
            capacity,
            name: name.into(),
        })
        .await?;
        self.wait_for(joined).await
    }

    /// Joins a session and returns this client's mark.
    pub async fn join_session(
        &mut self,
        session_id: SessionId,
        name: impl Into<String>,
    ) -> Result<Mark> {
        self.send(&ClientIntent::JoinSession {
            session_id,
            name: name.into(),
        })
        .await?;
        self.wait_for(joined).await.map(|(_, mark)| mark)
    }

    /// Fetches the lobby listing.
    pub async fn list_sessions(&mut self) -> Result<Vec<SessionSummary>> {
        self.send(&ClientIntent::ListSessions).await?;
        self.wait_for(|event| match event {
            ServerEvent::SessionList { sessions } => Some(sessions.clone()),
            _ => None,
        })
        .await
    }

    /// Sends a move. Results arrive as later events.
    pub async fn play(&mut self, index: usize) -> Result<()> {
        self.send(&ClientIntent::Move { index }).await
    }

    /// Leaves and waits for the server's goodbye.
    pub async fn quit(mut self) -> Result<()> {
        self.send(&ClientIntent::Quit).await?;
        self.wait_for(|event| matches!(event, ServerEvent::Goodbye).then_some(()))
            .await
    }
}

fn joined(event: &ServerEvent) -> Option<(SessionId, Mark)> {
    match event {
        ServerEvent::Joined {
            session_id, mark, ..
        } => Some((*session_id, *mark)),
        _ => None,
    }
}
