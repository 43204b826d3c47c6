//! Game sessions: one board, its participants, and the turn state machine.
//!
//! A [`Session`] is shared between the connections of all its participants.
//! Every mutation runs under the session's own lock for the whole
//! check-then-act sequence, so two participants racing for the same turn or
//! the same square can never both succeed. Mutations hand back a
//! [`Transition`] captured under that same lock: the resulting snapshot plus
//! the handles to notify. The `*_then` variants also run a publish callback
//! before the lock is released, so notifications leave in the order the
//! mutations were applied.

use crate::rules::has_win;
use crate::{Board, Mark, SessionError};
use derive_getters::Getters;
use derive_more::{Display, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game session. Allocated by the registry and never
/// reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "mark", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for participants.
    Filling,
    /// All seats taken; moves accepted.
    InProgress,
    /// Ended with three in a row for this mark.
    Won(Mark),
    /// Ended with a full board and no winner.
    Drawn,
    /// Ended because the participant with this mark left.
    Abandoned(Mark),
}

impl SessionStatus {
    /// Won, Drawn and Abandoned are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Won(_) | SessionStatus::Drawn | SessionStatus::Abandoned(_)
        )
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Play passes to the next participant.
    Continue,
    /// The mover completed a line.
    Win,
    /// The board filled without a line.
    Draw,
}

/// A participant seated in a session.
#[derive(Debug, Clone, Getters, new)]
pub struct Participant<H> {
    /// Display name.
    name: String,
    /// Assigned mark, fixed for the session.
    mark: Mark,
    /// Handle used to reach this participant's connection.
    handle: H,
}

/// Public view of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct PlayerInfo {
    /// Display name.
    pub name: String,
    /// Assigned mark.
    pub mark: Mark,
}

/// A participant to notify after a mutation.
#[derive(Debug, Clone)]
pub struct Recipient<H> {
    /// Recipient's mark.
    pub mark: Mark,
    /// Recipient's connection handle.
    pub handle: H,
}

/// Point-in-time copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session id.
    pub session_id: SessionId,
    /// Number of seats.
    pub capacity: usize,
    /// The board.
    pub board: Board,
    /// Participants in join (and turn) order.
    pub players: Vec<PlayerInfo>,
    /// Mark whose turn it is, once the session has started.
    pub current_mark: Option<Mark>,
    /// Lifecycle status.
    pub status: SessionStatus,
}

impl SessionSnapshot {
    /// Looks up a participant by mark.
    pub fn player(&self, mark: Mark) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.mark == mark)
    }

    /// Returns the winning participant, if the session was won.
    pub fn winner(&self) -> Option<&PlayerInfo> {
        match self.status {
            SessionStatus::Won(mark) => self.player(mark),
            _ => None,
        }
    }
}

/// Lobby listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub id: SessionId,
    /// Number of seats.
    pub capacity: usize,
    /// Seats taken.
    pub joined: usize,
    /// Name of the participant who created the session.
    pub creator: String,
    /// Board side.
    pub side: usize,
}

/// Outcome of a mutation, captured under the session lock.
#[derive(Debug, Clone)]
pub struct Transition<T, H> {
    /// Operation result.
    pub value: T,
    /// State right after the mutation.
    pub snapshot: SessionSnapshot,
    /// Participants to notify.
    pub recipients: Vec<Recipient<H>>,
}

struct SessionState<H> {
    board: Board,
    participants: Vec<Participant<H>>,
    turn: Option<usize>,
    status: SessionStatus,
}

/// One game: a board, its participants in join order, and the turn pointer.
///
/// `H` is the connection handle stored for each participant; the session
/// never calls into it, it only hands clones back in [`Transition`]s.
pub struct Session<H> {
    id: SessionId,
    capacity: usize,
    creator: String,
    state: Mutex<SessionState<H>>,
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("creator", &self.creator)
            .finish_non_exhaustive()
    }
}

impl<H: Clone> Session<H> {
    /// Creates an empty session with a board of side `capacity + 1`.
    ///
    /// `capacity` must already be validated; see
    /// [`SessionRegistry::create`](crate::SessionRegistry::create).
    #[instrument(skip(creator))]
    pub fn new(id: SessionId, capacity: usize, creator: impl Into<String>) -> Self {
        debug_assert!((2..=Mark::alphabet_len()).contains(&capacity));
        let creator = creator.into();
        info!(session_id = %id, capacity, creator = %creator, "Creating new game session");
        Self {
            id,
            capacity,
            creator,
            state: Mutex::new(SessionState {
                board: Board::for_players(capacity),
                participants: Vec::with_capacity(capacity),
                turn: None,
                status: SessionStatus::Filling,
            }),
        }
    }

    /// Creates a session with `creator` already seated as [`Mark::X`].
    ///
    /// Returns the join transition alongside the session, so the creator
    /// can be announced before anyone else can reach the session.
    pub fn with_creator(
        id: SessionId,
        capacity: usize,
        creator: impl Into<String>,
        handle: H,
    ) -> (Self, Transition<Mark, H>) {
        let creator = creator.into();
        let session = Self::new(id, capacity, creator.clone());
        let transition = {
            let mut state = session.lock();
            state
                .participants
                .push(Participant::new(creator, Mark::X, handle));
            session.transition(&state, Mark::X, None)
        };
        info!(session_id = %id, mark = %Mark::X, "Creator seated");
        (session, transition)
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Number of seats.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Name given when the session was created.
    pub fn creator(&self) -> &str {
        &self.creator
    }

    // Mutations never leave the state half-applied: every check precedes the
    // first write, so a poisoned guard still protects consistent data.
    fn lock(&self) -> MutexGuard<'_, SessionState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────
    //  Mutations
    // ─────────────────────────────────────────────────────────────

    /// Seats a new participant and returns the assigned mark.
    ///
    /// The mark is the next unused one in alphabet order. When this join
    /// takes the last seat the session moves to `InProgress` with the first
    /// participant to move.
    ///
    /// # Errors
    ///
    /// [`SessionError::Full`] when every seat is taken,
    /// [`SessionError::GameOver`] when the session already ended.
    pub fn join(
        &self,
        name: impl AsRef<str>,
        handle: H,
    ) -> Result<Transition<Mark, H>, SessionError> {
        self.join_then(name, handle, |_| {})
    }

    /// [`join`](Self::join), running `publish` on the transition before the
    /// session lock is released.
    ///
    /// Observers notified from `publish` see transitions in the order they
    /// were applied. `publish` must not call back into this session.
    #[instrument(
        skip(self, name, handle, publish),
        fields(session_id = %self.id, name = %name.as_ref())
    )]
    pub fn join_then(
        &self,
        name: impl AsRef<str>,
        handle: H,
        publish: impl FnOnce(&Transition<Mark, H>),
    ) -> Result<Transition<Mark, H>, SessionError> {
        let mut state = self.lock();

        if state.status.is_terminal() {
            warn!(status = ?state.status, "Join attempted on finished session");
            return Err(SessionError::GameOver);
        }

        let seat = state.participants.len();
        if seat >= self.capacity {
            warn!(capacity = self.capacity, "Session already full");
            return Err(SessionError::Full);
        }
        let mark = Mark::for_seat(seat).ok_or(SessionError::Full)?;

        state
            .participants
            .push(Participant::new(name.as_ref().to_string(), mark, handle));
        info!(%mark, joined = seat + 1, capacity = self.capacity, "Participant joined");

        if state.participants.len() == self.capacity {
            state.status = SessionStatus::InProgress;
            state.turn = Some(0);
            info!("Session full, game started");
        }

        let transition = self.transition(&state, mark, None);
        publish(&transition);
        Ok(transition)
    }

    /// Places `mark` at `index` if it is that mark's turn.
    ///
    /// Checks run in order: game over, turn, bounds, occupancy. On success
    /// the win check runs before the draw check, so a move that fills the
    /// last square and completes a line is a win.
    ///
    /// # Errors
    ///
    /// Returns the first failed check; the session is unchanged.
    pub fn make_move(
        &self,
        mark: Mark,
        index: usize,
    ) -> Result<Transition<MoveOutcome, H>, SessionError> {
        self.make_move_then(mark, index, |_| {})
    }

    /// [`make_move`](Self::make_move), running `publish` on an accepted
    /// move's transition before the session lock is released.
    #[instrument(skip(self, publish), fields(session_id = %self.id))]
    pub fn make_move_then(
        &self,
        mark: Mark,
        index: usize,
        publish: impl FnOnce(&Transition<MoveOutcome, H>),
    ) -> Result<Transition<MoveOutcome, H>, SessionError> {
        let mut state = self.lock();

        if state.status.is_terminal() {
            warn!(status = ?state.status, "Move attempted after game over");
            return Err(SessionError::GameOver);
        }

        let current = Self::current_of(&state);
        if current != Some(mark) {
            warn!(expected = ?current, "Participant tried to move out of turn");
            return Err(SessionError::NotYourTurn);
        }

        let len = state.board.len();
        if index >= len {
            warn!(len, "Move off the board");
            return Err(SessionError::OutOfBounds { index, len });
        }

        if !state.board.is_vacant(index) {
            warn!("Square already occupied");
            return Err(SessionError::Occupied(index));
        }

        state.board.place(index, mark);

        let outcome = if has_win(&state.board, mark) {
            state.status = SessionStatus::Won(mark);
            info!(%mark, "Game won");
            MoveOutcome::Win
        } else if state.board.is_full() {
            state.status = SessionStatus::Drawn;
            info!("Game drawn");
            MoveOutcome::Draw
        } else {
            let turn = state.turn.map_or(0, |t| (t + 1) % state.participants.len());
            state.turn = Some(turn);
            debug!(next = %state.participants[turn].mark, "Turn advanced");
            MoveOutcome::Continue
        };

        let transition = self.transition(&state, outcome, None);
        publish(&transition);
        Ok(transition)
    }

    /// Ends the session because the participant holding `mark` left.
    ///
    /// Returns `None` when the session is already terminal or `mark` is not
    /// seated here. Otherwise the status becomes `Abandoned(mark)` and the
    /// returned transition carries the leaver's info and the remaining
    /// participants.
    pub fn abandon(&self, mark: Mark) -> Option<Transition<PlayerInfo, H>> {
        self.abandon_then(mark, |_| {})
    }

    /// [`abandon`](Self::abandon), running `publish` on the transition before
    /// the session lock is released.
    #[instrument(skip(self, publish), fields(session_id = %self.id))]
    pub fn abandon_then(
        &self,
        mark: Mark,
        publish: impl FnOnce(&Transition<PlayerInfo, H>),
    ) -> Option<Transition<PlayerInfo, H>> {
        let mut state = self.lock();

        if state.status.is_terminal() {
            debug!(status = ?state.status, "Session already finished");
            return None;
        }

        let leaver = state.participants.iter().find(|p| p.mark == mark)?;
        let leaver = PlayerInfo::new(leaver.name.clone(), leaver.mark);

        state.status = SessionStatus::Abandoned(mark);
        warn!(%mark, name = %leaver.name, "Session abandoned");

        let transition = self.transition(&state, leaver, Some(mark));
        publish(&transition);
        Some(transition)
    }

    // ─────────────────────────────────────────────────────────────
    //  Views
    // ─────────────────────────────────────────────────────────────

    /// Mark of the participant to move; `None` until the session starts.
    pub fn current_mark(&self) -> Option<Mark> {
        Self::current_of(&self.lock())
    }

    /// Lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    /// Number of seated participants.
    pub fn joined(&self) -> usize {
        self.lock().participants.len()
    }

    /// True while the session is filling and has a free seat.
    pub fn is_joinable(&self) -> bool {
        let state = self.lock();
        state.status == SessionStatus::Filling && state.participants.len() < self.capacity
    }

    /// Participants in join order.
    pub fn players(&self) -> Vec<PlayerInfo> {
        Self::players_of(&self.lock())
    }

    /// Copy of the board.
    pub fn board(&self) -> Board {
        self.lock().board.clone()
    }

    /// Copy of the full observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_of(&self.lock())
    }

    /// Lobby listing entry.
    pub fn summary(&self) -> SessionSummary {
        let state = self.lock();
        SessionSummary {
            id: self.id,
            capacity: self.capacity,
            joined: state.participants.len(),
            creator: self.creator.clone(),
            side: state.board.side(),
        }
    }

    fn current_of(state: &SessionState<H>) -> Option<Mark> {
        state.turn.map(|t| state.participants[t].mark)
    }

    fn players_of(state: &SessionState<H>) -> Vec<PlayerInfo> {
        state
            .participants
            .iter()
            .map(|p| PlayerInfo::new(p.name.clone(), p.mark))
            .collect()
    }

    fn snapshot_of(&self, state: &SessionState<H>) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            capacity: self.capacity,
            board: state.board.clone(),
            players: Self::players_of(state),
            current_mark: Self::current_of(state),
            status: state.status,
        }
    }

    fn transition<T>(
        &self,
        state: &SessionState<H>,
        value: T,
        exclude: Option<Mark>,
    ) -> Transition<T, H> {
        let recipients = state
            .participants
            .iter()
            .filter(|p| Some(p.mark) != exclude)
            .map(|p| Recipient {
                mark: p.mark,
                handle: p.handle.clone(),
            })
            .collect();
        Transition {
            value,
            snapshot: self.snapshot_of(state),
            recipients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Square;

    fn started(capacity: usize) -> Session<()> {
        let session = Session::new(SessionId::from(1), capacity, "alice");
        for seat in 0..capacity {
            session.join(format!("p{seat}"), ()).unwrap();
        }
        session
    }

    #[test]
    fn test_join_assigns_marks_in_order() {
        let session: Session<()> = Session::new(SessionId::from(1), 3, "alice");
        assert_eq!(session.join("alice", ()).unwrap().value, Mark::X);
        assert_eq!(session.status(), SessionStatus::Filling);
        assert_eq!(session.current_mark(), None);
        assert_eq!(session.join("bob", ()).unwrap().value, Mark::O);
        assert_eq!(session.join("carol", ()).unwrap().value, Mark::Delta);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.current_mark(), Some(Mark::X));
        assert_eq!(session.board().side(), 4);
        assert_eq!(session.board().len(), 16);
    }

    #[test]
    fn test_with_creator_seats_x() {
        let (session, transition) = Session::with_creator(SessionId::from(3), 2, "alice", 1u8);
        assert_eq!(transition.value, Mark::X);
        assert_eq!(transition.snapshot.players, vec![PlayerInfo::new("alice".into(), Mark::X)]);
        assert_eq!(transition.recipients.len(), 1);
        assert_eq!(session.status(), SessionStatus::Filling);
        assert!(session.is_joinable());
        assert_eq!(session.join("bob", 2).unwrap().value, Mark::O);
        assert_eq!(session.current_mark(), Some(Mark::X));
    }

    #[test]
    fn test_publish_sees_applied_transition() {
        let session = started(2);
        let mut seen = None;
        session
            .make_move_then(Mark::X, 4, |t| seen = Some(t.snapshot.clone()))
            .unwrap();
        let seen = seen.unwrap();
        assert_eq!(seen.board.cell(4), Square::Occupied(Mark::X));
        assert_eq!(seen.current_mark, Some(Mark::O));

        let mut called = false;
        session
            .make_move_then(Mark::X, 0, |_| called = true)
            .unwrap_err();
        assert!(!called, "rejected moves publish nothing");
    }

    #[test]
    fn test_join_full_session() {
        let session = started(2);
        assert_eq!(session.join("late", ()).unwrap_err(), SessionError::Full);
        assert_eq!(session.joined(), 2);
    }

    #[test]
    fn test_join_transition_names_everyone() {
        let session: Session<u8> = Session::new(SessionId::from(1), 2, "alice");
        session.join("alice", 1).unwrap();
        let transition = session.join("bob", 2).unwrap();
        let handles: Vec<u8> = transition.recipients.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![1, 2]);
        assert_eq!(transition.snapshot.status, SessionStatus::InProgress);
        assert_eq!(transition.snapshot.players.len(), 2);
    }

    #[test]
    fn test_move_before_start_is_not_your_turn() {
        let session: Session<()> = Session::new(SessionId::from(1), 2, "alice");
        session.join("alice", ()).unwrap();
        assert_eq!(
            session.make_move(Mark::X, 0).unwrap_err(),
            SessionError::NotYourTurn
        );
        assert_eq!(session.board().occupied(), 0);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let session = started(2);
        assert_eq!(
            session.make_move(Mark::X, 9).unwrap_err(),
            SessionError::OutOfBounds { index: 9, len: 9 }
        );
        assert_eq!(session.current_mark(), Some(Mark::X));
    }

    #[test]
    fn test_continue_advances_turn() {
        let session = started(2);
        let transition = session.make_move(Mark::X, 4).unwrap();
        assert_eq!(transition.value, MoveOutcome::Continue);
        assert_eq!(transition.snapshot.current_mark, Some(Mark::O));
        assert_eq!(transition.snapshot.board.cell(4), Square::Occupied(Mark::X));
    }

    #[test]
    fn test_abandon_excludes_leaver() {
        let session: Session<u8> = Session::new(SessionId::from(1), 3, "alice");
        for (name, handle) in [("alice", 1), ("bob", 2), ("carol", 3)] {
            session.join(name, handle).unwrap();
        }
        let transition = session.abandon(Mark::O).unwrap();
        assert_eq!(transition.value, PlayerInfo::new("bob".into(), Mark::O));
        let handles: Vec<u8> = transition.recipients.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![1, 3]);
        assert_eq!(session.status(), SessionStatus::Abandoned(Mark::O));
        assert_eq!(
            session.make_move(Mark::X, 0).unwrap_err(),
            SessionError::GameOver
        );
    }

    #[test]
    fn test_abandon_is_idempotent() {
        let session = started(2);
        assert!(session.abandon(Mark::X).is_some());
        assert!(session.abandon(Mark::O).is_none());
        assert_eq!(session.status(), SessionStatus::Abandoned(Mark::X));
    }

    #[test]
    fn test_abandon_unknown_mark_ignored() {
        let session = started(2);
        assert!(session.abandon(Mark::Club).is_none());
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn test_abandon_while_filling() {
        let session: Session<()> = Session::new(SessionId::from(1), 3, "alice");
        session.join("alice", ()).unwrap();
        assert!(session.abandon(Mark::X).unwrap().recipients.is_empty());
        assert_eq!(session.join("bob", ()).unwrap_err(), SessionError::GameOver);
        assert!(!session.is_joinable());
    }

    #[test]
    fn test_summary_reports_seats() {
        let session: Session<()> = Session::new(SessionId::from(7), 4, "alice");
        session.join("alice", ()).unwrap();
        let summary = session.summary();
        assert_eq!(summary.id, SessionId::from(7));
        assert_eq!(summary.joined, 1);
        assert_eq!(summary.capacity, 4);
        assert_eq!(summary.side, 5);
        assert_eq!(summary.creator, "alice");
    }

    #[test]
    fn test_status_serializes_tagged() {
        let json = serde_json::to_value(SessionStatus::Won(Mark::Delta)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "won", "mark": "∆"}));
        let json = serde_json::to_value(SessionStatus::InProgress).unwrap();
        assert_eq!(json, serde_json::json!({"state": "in_progress"}));
    }
}
