//! End-to-end scenarios driving a whole game through its command surface:
//! scripted piece stacking, the scoring bonuses and their interactions,
//! hold-gate semantics, lock-delay timing and the blocked-spawn game over.
//!
//! The piece sequence is pinned by restricting the allowed piece set (every
//! bag over a one-element set is that piece), so the scripts below are
//! deterministic for any seed.

use std::{cell::RefCell, rc::Rc, time::Duration};

use blockfall_engine::{Event, EventHandler, Game, GameBuilder, PieceType, ShiftDirection};

fn recorded(builder: &mut GameBuilder) -> (Game, Rc<RefCell<Vec<Event>>>) {
    let mut game = builder.build().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    game.add_handler(EventHandler::new("recorder", move |_time, event| {
        sink.borrow_mut().push(*event);
    }));
    (game, log)
}

fn i_only() -> GameBuilder {
    let mut builder = Game::builder();
    builder.seed(42).allowed_piece_types([PieceType::I]);
    builder
}

/// Moves the active piece's bounding box to the given column.
fn shift_to(game: &mut Game, x: i32) {
    let mut current = game.active_piece().unwrap().position.0;
    while current < x {
        assert!(game.move_right());
        current += 1;
    }
    while current > x {
        assert!(game.move_left());
        current -= 1;
    }
}

/// Hard-drops a flat I-piece whose cells land in columns `x..x + 4`.
fn drop_i_flat(game: &mut Game, x: i32) {
    assert_eq!(game.active_piece().unwrap().piece_type, PieceType::I);
    shift_to(game, x);
    assert!(game.hard_drop());
}

/// Hard-drops an upright I-piece whose cells land in column `column`.
fn drop_i_upright(game: &mut Game, column: i32) {
    assert_eq!(game.active_piece().unwrap().piece_type, PieceType::I);
    assert!(game.rotate_cw());
    shift_to(game, column - 2);
    assert!(game.hard_drop());
}

/// Stacks `rows` full-width-minus-two rows (columns 0..8), then fills the
/// two right columns of the top four of them with upright I-pieces,
/// clearing exactly four lines.
fn play_tetris(game: &mut Game, rows: usize) {
    for _ in 0..rows {
        drop_i_flat(game, 0);
        drop_i_flat(game, 4);
    }
    drop_i_upright(game, 8);
    drop_i_upright(game, 9);
}

fn awarded_points(log: &RefCell<Vec<Event>>) -> Vec<u32> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::ScoreAwarded { points } => Some(*points),
            _ => None,
        })
        .collect()
}

#[test]
fn plain_tetris_awards_the_table_entry_times_level() {
    let (mut game, log) = recorded(&mut i_only());
    // Five stacked rows so the clear leaves a remainder (no perfect clear).
    play_tetris(&mut game, 5);

    assert!(awarded_points(&log).contains(&800));
    assert!(log.borrow().contains(&Event::LinesCleared { count: 4 }));
    assert!(log.borrow().contains(&Event::Combo { count: 1 }));
    assert!(!log.borrow().contains(&Event::PerfectClear));
    assert_eq!(game.score_state().combo, 1);
    assert!(game.score_state().back_to_back);
}

#[test]
fn consecutive_tetrises_earn_back_to_back() {
    let (mut game, log) = recorded(&mut i_only());
    // Any placement clearing fewer than four lines drops the back-to-back
    // flag, so both Tetrises have to come from consecutive placements:
    // eight rows of columns 0..8 leave only the rightmost column open.
    for _ in 0..8 {
        drop_i_flat(&mut game, 0);
        drop_i_flat(&mut game, 4);
    }
    drop_i_upright(&mut game, 8);
    drop_i_upright(&mut game, 8);

    // First four-line clear arms the flag.
    drop_i_upright(&mut game, 9);
    assert!(awarded_points(&log).contains(&800));
    assert_eq!(game.score_state().combo, 1);
    assert!(game.score_state().back_to_back);

    // The remaining four rows fall; the next piece clears them with nothing
    // in between.
    log.borrow_mut().clear();
    let before = game.score_state().score;
    drop_i_upright(&mut game, 9);

    // (800 base + 50 combo) * 1.5 floored to 1275, plus the 3000 bonus for
    // emptying the board, plus 2 * 16 rows of hard-drop bonus.
    assert_eq!(game.score_state().score - before, 32 + 1275 + 3000);
    assert!(awarded_points(&log).contains(&(1275 + 3000)));
    assert!(log.borrow().contains(&Event::BackToBack));
    assert!(log.borrow().contains(&Event::PerfectClear));
    assert_eq!(game.score_state().combo, 2);
}

#[test]
fn non_clearing_placement_breaks_combo_and_back_to_back() {
    let (mut game, log) = recorded(&mut i_only());
    play_tetris(&mut game, 5);
    assert_eq!(game.score_state().combo, 1);
    log.borrow_mut().clear();

    drop_i_flat(&mut game, 0);

    assert_eq!(game.score_state().combo, 0);
    assert!(!game.score_state().back_to_back);
    assert!(!log.borrow().iter().any(|e| matches!(e, Event::Combo { .. })));
}

#[test]
fn clearing_the_whole_board_adds_the_perfect_clear_bonus() {
    let (mut game, log) = recorded(&mut i_only());
    // Four stacked rows and nothing else: the Tetris empties the board.
    play_tetris(&mut game, 4);

    assert!(game.board().is_empty());
    assert!(log.borrow().contains(&Event::PerfectClear));
    // 800 for the four-line clear plus the flat 3000 perfect-clear bonus.
    assert!(awarded_points(&log).contains(&3800));
}

#[test]
fn t_spin_with_three_blocked_corners_scores_without_lines() {
    let mut builder = Game::builder();
    builder
        .seed(7)
        .allowed_piece_types([PieceType::L])
        .preview_count(0);
    let (mut game, log) = recorded(&mut builder);

    // An L on the floor leaves a filled cell beside the left wall...
    shift_to(&mut game, 1);
    assert!(game.hard_drop());

    // The follow-up L spawned before the piece filter can change; park it
    // on the right, away from the wall slot.
    game.set_allowed_piece_types(&[PieceType::T]).unwrap();
    assert_eq!(game.active_piece().unwrap().piece_type, PieceType::L);
    shift_to(&mut game, 6);
    assert!(game.hard_drop());

    // ...so a T hugging the wall locks with two corners out of bounds and
    // one filled, clearing nothing.
    assert_eq!(game.active_piece().unwrap().piece_type, PieceType::T);
    assert!(game.rotate_cw());
    shift_to(&mut game, -1);
    log.borrow_mut().clear();
    assert!(game.hard_drop());

    assert!(log.borrow().contains(&Event::TSpin));
    assert!(awarded_points(&log).contains(&400));
    assert!(!log.borrow().iter().any(|e| matches!(e, Event::LinesCleared { .. })));
    assert_eq!(game.score_state().combo, 0);
}

#[test]
fn hold_swaps_once_per_spawn() {
    let mut builder = Game::builder();
    builder.seed(3);
    let (mut game, log) = recorded(&mut builder);

    let first = game.active_piece().unwrap().piece_type;
    let second = game.preview().next().unwrap();

    assert!(game.hold());
    assert_eq!(game.held_piece(), Some(first));
    assert_eq!(game.active_piece().unwrap().piece_type, second);

    // The gate is closed until the next piece comes from the queue.
    assert!(!game.hold());
    assert_eq!(log.borrow().iter().filter(|e| **e == Event::HoldUsed).count(), 1);

    assert!(game.hard_drop());
    // Fresh spawn: holding now swaps the stashed piece back in.
    let third = game.active_piece().unwrap().piece_type;
    assert!(game.hold());
    assert_eq!(game.active_piece().unwrap().piece_type, first);
    assert_eq!(game.held_piece(), Some(third));
}

#[test]
fn disabled_hold_is_a_no_op() {
    let mut builder = Game::builder();
    builder.seed(3).hold_disabled(true);
    let (mut game, log) = recorded(&mut builder);

    assert!(!game.hold());
    assert_eq!(game.held_piece(), None);
    assert!(log.borrow().is_empty());
}

#[test]
fn resting_piece_locks_within_the_lock_delay() {
    let mut builder = i_only();
    builder.drop_interval_multiplier(0.001);
    let (mut game, log) = recorded(&mut builder);

    // Gravity grounds the piece almost immediately.
    game.update(Duration::from_millis(30));
    assert!(!log.borrow().iter().any(|e| matches!(e, Event::PiecePlaced { .. })));

    // Left untouched, the piece locks no later than 500ms after grounding.
    for _ in 0..5 {
        game.update(Duration::from_millis(100));
    }
    assert!(log.borrow().iter().any(|e| matches!(e, Event::PiecePlaced { .. })));
}

#[test]
fn successful_movement_postpones_locking_indefinitely() {
    let mut builder = i_only();
    builder.drop_interval_multiplier(0.001);
    let (mut game, log) = recorded(&mut builder);

    game.update(Duration::from_millis(30));
    // Nudge the piece just before the delay would expire, many times over.
    for step in 0..8 {
        game.update(Duration::from_millis(400));
        let moved = if step % 2 == 0 {
            game.move_left()
        } else {
            game.move_right()
        };
        assert!(moved);
        assert!(
            !log.borrow().iter().any(|e| matches!(e, Event::PiecePlaced { .. })),
            "piece locked despite constant movement"
        );
    }

    // Once the input stops, the countdown runs out as usual.
    game.update(Duration::from_millis(600));
    assert!(log.borrow().iter().any(|e| matches!(e, Event::PiecePlaced { .. })));
}

#[test]
fn lock_reset_limit_caps_the_postponing() {
    let mut builder = i_only();
    builder
        .drop_interval_multiplier(0.001)
        .lock_reset_limit(Some(2));
    let (mut game, log) = recorded(&mut builder);

    game.update(Duration::from_millis(30));
    game.move_left(); // reset 1
    game.update(Duration::from_millis(400));
    game.move_right(); // reset 2
    game.update(Duration::from_millis(400));
    game.move_left(); // beyond the cap: no reset
    game.update(Duration::from_millis(150));

    assert!(log.borrow().iter().any(|e| matches!(e, Event::PiecePlaced { .. })));
}

#[test]
fn blocked_spawn_ends_the_session() {
    let mut builder = Game::builder();
    builder.seed(11).allowed_piece_types([PieceType::O]);
    let (mut game, log) = recorded(&mut builder);

    // O-pieces stack two rows at a time in the center columns; the tenth
    // spawn finds its cells occupied.
    let mut drops = 0;
    while !game.is_over() {
        assert!(game.hard_drop());
        drops += 1;
        assert!(drops <= 20, "game over never happened");
    }
    assert_eq!(drops, 9);
    assert_eq!(log.borrow().iter().filter(|e| **e == Event::GameOver).count(), 1);

    // Everything is inert afterwards.
    assert!(!game.hard_drop());
    assert!(!game.move_left());
    assert!(!game.hold());
    let time_before = game.state().time;
    game.update(Duration::from_secs(1));
    assert_eq!(game.state().time, time_before);
}

#[test]
fn soft_drop_speeds_gravity_and_awards_points() {
    let mut builder = i_only();
    let (mut game, log) = recorded(&mut builder);

    game.set_soft_dropping(true);
    // Default gravity is 1s per row; the divisor of 10 makes it 100ms.
    game.update(Duration::from_millis(350));

    assert_eq!(game.active_piece().unwrap().position.1, 3);
    assert_eq!(game.score_state().score, 3);
    assert!(log.borrow().contains(&Event::ScoreAwarded { points: 3 }));
}

#[test]
fn held_direction_auto_repeats_after_the_initial_delay() {
    let mut game = i_only().build().unwrap();

    game.set_auto_shift(Some(ShiftDirection::Left));
    // 167ms charge plus two 33ms repeats plus one more step's worth.
    game.update(Duration::from_millis(234));

    assert_eq!(game.active_piece().unwrap().position.0, 0);

    // Releasing stops the repetition.
    game.set_auto_shift(None);
    game.update(Duration::from_millis(500));
    assert_eq!(game.active_piece().unwrap().position.0, 0);
}

#[test]
fn ghost_row_reports_the_resting_row_without_moving_the_piece() {
    let mut game = i_only().build().unwrap();

    let before = *game.active_piece().unwrap();
    assert_eq!(game.ghost_row(), Some(18));
    assert_eq!(*game.active_piece().unwrap(), before);

    // A stacked piece raises the ghost row.
    assert!(game.hard_drop());
    assert_eq!(game.ghost_row(), Some(17));
}

#[test]
fn hard_drop_awards_two_points_per_row() {
    let mut game = i_only().build().unwrap();

    // The flat I rests at row 18, having fallen 18 rows from spawn.
    assert!(game.hard_drop());
    assert_eq!(game.score_state().score, 36);
}
