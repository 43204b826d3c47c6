//! Tests for the session turn state machine on concrete games.

use strictly_gridtoe::{
    Mark, MoveOutcome, RegistryError, Session, SessionError, SessionId, SessionRegistry,
    SessionStatus, Square,
};

fn two_player() -> Session<()> {
    let session = Session::new(SessionId::from(1), 2, "alice");
    session.join("alice", ()).unwrap();
    session.join("bob", ()).unwrap();
    session
}

/// Plays `(mark, index)` moves, asserting every move but the last continues.
fn play(session: &Session<()>, moves: &[(Mark, usize)]) -> MoveOutcome {
    let (last, rest) = moves.split_last().expect("at least one move");
    for &(mark, index) in rest {
        let outcome = session.make_move(mark, index).unwrap().value;
        assert_eq!(outcome, MoveOutcome::Continue, "{mark} at {index} ended the game early");
    }
    session.make_move(last.0, last.1).unwrap().value
}

#[test]
fn test_top_row_win() {
    let session = two_player();
    let outcome = play(
        &session,
        &[(Mark::X, 0), (Mark::O, 3), (Mark::X, 1), (Mark::O, 4), (Mark::X, 2)],
    );
    assert_eq!(outcome, MoveOutcome::Win);
    assert_eq!(session.status(), SessionStatus::Won(Mark::X));
    assert_eq!(session.snapshot().winner().unwrap().name, "alice");
}

#[test]
fn test_full_board_without_line_is_draw() {
    let session = two_player();
    let outcome = play(
        &session,
        &[
            (Mark::X, 0),
            (Mark::O, 1),
            (Mark::X, 2),
            (Mark::O, 4),
            (Mark::X, 3),
            (Mark::O, 5),
            (Mark::X, 7),
            (Mark::O, 6),
            (Mark::X, 8),
        ],
    );
    assert_eq!(outcome, MoveOutcome::Draw);
    assert_eq!(session.status(), SessionStatus::Drawn);
    assert!(session.board().is_full());
    assert!(session.snapshot().winner().is_none());
}

#[test]
fn test_last_square_completing_diagonal_is_win() {
    // X's final move at 8 fills the board and completes 0-4-8.
    let session = two_player();
    let outcome = play(
        &session,
        &[
            (Mark::X, 0),
            (Mark::O, 1),
            (Mark::X, 2),
            (Mark::O, 3),
            (Mark::X, 4),
            (Mark::O, 5),
            (Mark::X, 7),
            (Mark::O, 6),
            (Mark::X, 8),
        ],
    );
    assert!(session.board().is_full());
    assert_eq!(outcome, MoveOutcome::Win);
    assert_eq!(session.status(), SessionStatus::Won(Mark::X));
}

#[test]
fn test_win_checked_before_draw_on_other_line() {
    let session = two_player();
    let outcome = play(
        &session,
        &[
            (Mark::X, 0),
            (Mark::O, 2),
            (Mark::X, 1),
            (Mark::O, 3),
            (Mark::X, 4),
            (Mark::O, 6),
            (Mark::X, 5),
            (Mark::O, 7),
            (Mark::X, 8),
        ],
    );
    assert!(session.board().is_full());
    assert_eq!(outcome, MoveOutcome::Win);
}

#[test]
fn test_capacity_nine_rejected() {
    let registry: SessionRegistry<()> = SessionRegistry::new();
    let err = registry.create(9, "alice").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidCapacity { requested: 9, .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_out_of_turn_rejection_is_idempotent() {
    let session = two_player();
    let before = session.snapshot();

    assert_eq!(session.make_move(Mark::O, 4).unwrap_err(), SessionError::NotYourTurn);
    assert_eq!(session.make_move(Mark::O, 4).unwrap_err(), SessionError::NotYourTurn);

    assert_eq!(session.snapshot(), before);
    assert_eq!(session.current_mark(), Some(Mark::X));
}

#[test]
fn test_same_square_twice_is_occupied() {
    let session = two_player();
    session.make_move(Mark::X, 0).unwrap();
    session.make_move(Mark::O, 4).unwrap();
    let before = session.snapshot();

    assert_eq!(session.make_move(Mark::X, 0).unwrap_err(), SessionError::Occupied(0));
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.board().cell(0), Square::Occupied(Mark::X));
}

#[test]
fn test_rejections_never_mutate() {
    let session = two_player();
    session.make_move(Mark::X, 4).unwrap();
    let before = session.snapshot();

    assert!(matches!(
        session.make_move(Mark::O, 9),
        Err(SessionError::OutOfBounds { index: 9, len: 9 })
    ));
    assert_eq!(session.make_move(Mark::O, 4).unwrap_err(), SessionError::Occupied(4));
    assert_eq!(session.make_move(Mark::X, 0).unwrap_err(), SessionError::NotYourTurn);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn test_game_over_rejects_further_moves() {
    let session = two_player();
    play(
        &session,
        &[(Mark::X, 0), (Mark::O, 3), (Mark::X, 1), (Mark::O, 4), (Mark::X, 2)],
    );
    let before = session.snapshot();

    assert_eq!(session.make_move(Mark::O, 5).unwrap_err(), SessionError::GameOver);
    assert_eq!(session.make_move(Mark::X, 8).unwrap_err(), SessionError::GameOver);
    assert_eq!(session.snapshot(), before);
}

#[test]
fn test_three_player_session() {
    let registry: SessionRegistry<()> = SessionRegistry::new();
    let session = registry.create(3, "alice").unwrap();
    assert_eq!(session.board().side(), 4);
    assert_eq!(session.board().len(), 16);

    let marks: Vec<Mark> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| session.join(*name, ()).unwrap().value)
        .collect();

    assert_eq!(marks, vec![Mark::X, Mark::O, Mark::Delta]);
    assert_eq!(session.status(), SessionStatus::InProgress);
    assert_eq!(session.current_mark(), Some(Mark::X));
}

#[test]
fn test_three_player_rotation_and_win() {
    let session: Session<()> = Session::new(SessionId::from(1), 3, "alice");
    for name in ["alice", "bob", "carol"] {
        session.join(name, ()).unwrap();
    }

    // ∆ takes 5, 6, 7 on the 4×4 board (row 1, columns 1-3).
    let outcome = play(
        &session,
        &[
            (Mark::X, 0),
            (Mark::O, 15),
            (Mark::Delta, 5),
            (Mark::X, 12),
            (Mark::O, 3),
            (Mark::Delta, 6),
            (Mark::X, 9),
            (Mark::O, 14),
            (Mark::Delta, 7),
        ],
    );
    assert_eq!(outcome, MoveOutcome::Win);
    assert_eq!(session.status(), SessionStatus::Won(Mark::Delta));
    assert_eq!(session.snapshot().winner().unwrap().name, "carol");
}
