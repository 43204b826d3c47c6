//! Per-connection control loop between client intents and sessions.
//!
//! A [`SessionDriver`] belongs to exactly one connection. It remembers which
//! session (by id) the connection is seated in and with which mark, turns
//! each intent into one registry or session call, and fans the result out.
//! Events are queued while the session lock is still held, so every
//! participant sees a session's changes in the order they were applied.
//! Queueing never waits on a client.

use crate::outbox::{Outbox, broadcast};
use crate::protocol::{ClientIntent, GameResult, ServerEvent};
use derive_new::new;
use std::sync::Arc;
use strictly_gridtoe::{
    ErrorKind, Mark, MoveOutcome, Session, SessionError, SessionId, SessionRegistry,
    SessionStatus, Transition,
};
use tracing::{debug, info, instrument, warn};

/// Registry whose participants are reached through their outboxes.
pub type Registry = SessionRegistry<Outbox>;

/// Whether the connection should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next intent.
    Continue,
    /// Close the connection.
    Close,
}

#[derive(Debug, Clone, Copy, new)]
struct Attachment {
    session_id: SessionId,
    mark: Mark,
}

/// Drives one connection's participation in the lobby and in a session.
#[derive(Debug)]
pub struct SessionDriver {
    registry: Registry,
    outbox: Outbox,
    attached: Option<Attachment>,
}

impl SessionDriver {
    /// Creates a driver for a connection that is not seated anywhere yet.
    pub fn new(registry: Registry, outbox: Outbox) -> Self {
        Self {
            registry,
            outbox,
            attached: None,
        }
    }

    /// Session and mark this connection is seated with, if any.
    pub fn attachment(&self) -> Option<(SessionId, Mark)> {
        self.attached.map(|a| (a.session_id, a.mark))
    }

    /// Handles one intent.
    #[instrument(skip(self), fields(connection = %self.outbox.connection()))]
    pub fn handle(&mut self, intent: ClientIntent) -> Flow {
        match intent {
            ClientIntent::CreateSession { capacity, name } => self.create(capacity, &name),
            ClientIntent::ListSessions => self.list(),
            ClientIntent::JoinSession { session_id, name } => self.join(session_id, &name),
            ClientIntent::Move { index } => self.play(index),
            ClientIntent::Quit => {
                self.leave();
                self.reply(ServerEvent::Goodbye);
                return Flow::Close;
            }
        }
        Flow::Continue
    }

    /// Reports an unreadable request back to this connection.
    pub fn reject_malformed(&self, reason: impl ToString) {
        self.reject(ErrorKind::Validation, reason);
    }

    /// Called once the connection's read side fails or closes.
    ///
    /// Abandons the seated session, if still running, and tells the other
    /// participants.
    #[instrument(skip(self), fields(connection = %self.outbox.connection()))]
    pub fn disconnect(&mut self) {
        if self.attached.is_some() {
            info!("Connection lost while seated");
        }
        self.leave();
    }

    // ─────────────────────────────────────────────────────────────
    //  Intents
    // ─────────────────────────────────────────────────────────────

    fn create(&mut self, capacity: usize, name: &str) {
        if self.seated_elsewhere() {
            return;
        }

        let hosted = self
            .registry
            .host(capacity, name, self.outbox.clone(), |session, transition| {
                self.announce_seat(session, transition)
            });
        match hosted {
            Ok((session, transition)) => self.attach(session.id(), transition.value),
            Err(e) => self.reject(e.kind(), e),
        }
    }

    fn list(&self) {
        let sessions = self.registry.list();
        debug!(count = sessions.len(), "Sending session list");
        self.reply(ServerEvent::SessionList { sessions });
    }

    fn join(&mut self, session_id: SessionId, name: &str) {
        if self.seated_elsewhere() {
            return;
        }

        let session = match self.registry.get(session_id) {
            Ok(session) => session,
            Err(e) => return self.reject(e.kind(), e),
        };

        let joined = session.join_then(name, self.outbox.clone(), |transition| {
            self.announce_seat(&session, transition)
        });
        match joined {
            Ok(transition) => self.attach(session.id(), transition.value),
            Err(e) => self.reject(e.kind(), e),
        }
    }

    fn play(&mut self, index: usize) {
        let Some(attachment) = self.attached else {
            return self.reject(ErrorKind::Validation, "Not seated in a session");
        };
        let Some(session) = self.live_session(attachment.session_id) else {
            self.attached = None;
            return self.reject(ErrorKind::Turn, SessionError::GameOver);
        };

        let moved = session.make_move_then(attachment.mark, index, |transition| {
            broadcast(
                &transition.recipients,
                &ServerEvent::state_changed(transition.snapshot.clone()),
            );
            if let Some(ended) = game_ended(transition) {
                broadcast(&transition.recipients, &ended);
            }
        });
        let outcome = match moved {
            Ok(transition) => transition.value,
            Err(e) => return self.reject(e.kind(), e),
        };

        if outcome != MoveOutcome::Continue {
            info!(session_id = %session.id(), ?outcome, "Game ended");
            self.registry.remove(session.id());
            self.attached = None;
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Helpers
    // ─────────────────────────────────────────────────────────────

    fn attach(&mut self, session_id: SessionId, mark: Mark) {
        self.attached = Some(Attachment::new(session_id, mark));
    }

    /// Tells the joiner its seat and everyone else who joined; starts the
    /// game for all when this seat was the last.
    fn announce_seat(&self, session: &Session<Outbox>, transition: &Transition<Mark, Outbox>) {
        let Transition {
            value: mark,
            snapshot,
            recipients,
        } = transition;
        let mark = *mark;

        self.reply(ServerEvent::Joined {
            session_id: session.id(),
            mark,
            capacity: session.capacity(),
            side: snapshot.board.side(),
        });

        let name = snapshot
            .player(mark)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        broadcast(
            recipients,
            &ServerEvent::PlayerJoined {
                name,
                mark,
                joined: snapshot.players.len(),
                capacity: session.capacity(),
            },
        );

        if snapshot.status == SessionStatus::InProgress {
            info!(session_id = %session.id(), "Game starting");
            broadcast(
                recipients,
                &ServerEvent::GameStarted {
                    session_id: session.id(),
                },
            );
            broadcast(recipients, &ServerEvent::state_changed(snapshot.clone()));
        }
    }

    fn leave(&mut self) {
        let Some(attachment) = self.attached.take() else {
            return;
        };
        let Ok(session) = self.registry.get(attachment.session_id) else {
            return;
        };

        session.abandon_then(attachment.mark, |transition| {
            broadcast(
                &transition.recipients,
                &ServerEvent::PeerAbandoned {
                    mark: transition.value.mark,
                    name: transition.value.name.clone(),
                },
            );
        });
        self.registry.remove(attachment.session_id);
    }

    /// The session, if it still exists and has not finished.
    fn live_session(&self, session_id: SessionId) -> Option<Arc<Session<Outbox>>> {
        self.registry
            .get(session_id)
            .ok()
            .filter(|s| !s.status().is_terminal())
    }

    /// Rejects the request if this connection is still seated in a running
    /// session; forgets a stale seat otherwise.
    fn seated_elsewhere(&mut self) -> bool {
        let Some(attachment) = self.attached else {
            return false;
        };
        if self.live_session(attachment.session_id).is_some() {
            warn!(session_id = %attachment.session_id, "Already seated");
            self.reject(
                ErrorKind::Validation,
                format!("Already seated in session {}", attachment.session_id),
            );
            return true;
        }
        debug!(session_id = %attachment.session_id, "Dropping finished seat");
        self.attached = None;
        false
    }

    fn reply(&self, event: ServerEvent) {
        self.outbox.deliver(event);
    }

    fn reject(&self, kind: ErrorKind, reason: impl ToString) {
        let reason = reason.to_string();
        debug!(%kind, %reason, "Rejecting request");
        self.reply(ServerEvent::rejected(kind, reason));
    }
}

/// Final announcement for a move that ended the game.
fn game_ended(transition: &Transition<MoveOutcome, Outbox>) -> Option<ServerEvent> {
    match transition.value {
        MoveOutcome::Continue => None,
        MoveOutcome::Win => {
            let winner = transition.snapshot.winner();
            Some(ServerEvent::GameEnded {
                result: GameResult::Win,
                winner_name: winner.map(|w| w.name.clone()),
                winner_mark: winner.map(|w| w.mark),
            })
        }
        MoveOutcome::Draw => Some(ServerEvent::GameEnded {
            result: GameResult::Draw,
            winner_name: None,
            winner_mark: None,
        }),
    }
}
