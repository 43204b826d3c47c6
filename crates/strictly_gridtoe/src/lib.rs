//! Strictly Gridtoe - N-player tic-tac-toe session engine
//!
//! Pure game logic with no I/O: boards that scale with the number of
//! players, three-in-a-row win detection, per-session turn enforcement, and a
//! registry that lets many sessions run side by side.
//!
//! # Architecture
//!
//! - **Board**: `(players + 1)²` squares in row-major order
//! - **Rules**: stateless win detection (three in a row on any board)
//! - **Session**: participants, turn pointer and status behind one lock
//! - **Registry**: id allocation and lookup of live sessions
//!
//! # Example
//!
//! ```
//! use strictly_gridtoe::{Mark, MoveOutcome, SessionRegistry};
//!
//! let registry: SessionRegistry<()> = SessionRegistry::new();
//! let session = registry.create(2, "alice").unwrap();
//! session.join("alice", ()).unwrap();
//! session.join("bob", ()).unwrap();
//!
//! let transition = session.make_move(Mark::X, 4).unwrap();
//! assert_eq!(transition.value, MoveOutcome::Continue);
//! assert_eq!(session.current_mark(), Some(Mark::O));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod mark;
mod registry;
pub mod rules;
mod session;

pub use board::{Board, MIN_SIDE, Square};
pub use error::{ErrorKind, RegistryError, SessionError};
pub use mark::Mark;
pub use registry::{MAX_PLAYERS, MIN_PLAYERS, SessionRegistry};
pub use session::{
    MoveOutcome, Participant, PlayerInfo, Recipient, Session, SessionId, SessionSnapshot,
    SessionStatus, SessionSummary, Transition,
};
