//! Wire messages exchanged with clients.
//!
//! Each message is one JSON object on its own line, tagged by `"type"`.

use serde::{Deserialize, Serialize};
use strictly_gridtoe::{ErrorKind, Mark, SessionId, SessionSnapshot, SessionSummary};

/// Request sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Create a session for `capacity` players and take the first seat.
    CreateSession {
        /// Number of players (2-8).
        capacity: usize,
        /// Display name of the requester.
        name: String,
    },
    /// List sessions with free seats.
    ListSessions,
    /// Take a seat in an existing session.
    JoinSession {
        /// Session to join.
        session_id: SessionId,
        /// Display name of the requester.
        name: String,
    },
    /// Place this connection's mark.
    Move {
        /// Square index in row-major order.
        index: usize,
    },
    /// Leave the current session (if any) and close the connection.
    Quit,
}

/// Outcome reported in [`ServerEvent::GameEnded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// Someone completed a line.
    Win,
    /// The board filled without a line.
    Draw,
}

/// Event sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// This connection took a seat.
    Joined {
        /// Session joined.
        session_id: SessionId,
        /// Mark assigned to this connection.
        mark: Mark,
        /// Seats in the session.
        capacity: usize,
        /// Board side.
        side: usize,
    },
    /// Someone took a seat in this connection's session.
    PlayerJoined {
        /// Newcomer's name.
        name: String,
        /// Newcomer's mark.
        mark: Mark,
        /// Seats taken so far.
        joined: usize,
        /// Seats in the session.
        capacity: usize,
    },
    /// The last seat was taken; play begins.
    GameStarted {
        /// Session that started.
        session_id: SessionId,
    },
    /// Sessions with free seats.
    SessionList {
        /// Joinable sessions ordered by id.
        sessions: Vec<SessionSummary>,
    },
    /// Board, turn or status changed.
    StateChanged {
        /// New state.
        state: SessionSnapshot,
        /// Human-readable rendering of the board.
        board_text: String,
    },
    /// The game finished with a win or draw.
    GameEnded {
        /// How it ended.
        result: GameResult,
        /// Winner's name, for a win.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_name: Option<String>,
        /// Winner's mark, for a win.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_mark: Option<Mark>,
    },
    /// A participant left and the session is over.
    PeerAbandoned {
        /// Leaver's mark.
        mark: Mark,
        /// Leaver's name.
        name: String,
    },
    /// The last request was refused; nothing changed.
    Rejected {
        /// Rejection class.
        kind: ErrorKind,
        /// Explanation.
        reason: String,
    },
    /// Reply to [`ClientIntent::Quit`].
    Goodbye,
}

impl ServerEvent {
    /// Builds a rejection from any classified error.
    pub fn rejected(kind: ErrorKind, reason: impl ToString) -> Self {
        ServerEvent::Rejected {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Builds a state update, rendering the board for thin clients.
    pub fn state_changed(state: SessionSnapshot) -> Self {
        let board_text = state.board.to_string();
        ServerEvent::StateChanged { state, board_text }
    }
}
