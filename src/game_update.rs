/*!
This module handles what happens when [`Game::update`] is called, as well as
the discrete commands a host may send between ticks.
*/

use super::*;

impl Game {
    /// The main function used to advance the game state.
    ///
    /// Advances all internal timers by `dt`: delayed auto shift, gravity
    /// (scaled by level, the configured multiplier and — while soft-dropping
    /// — the soft-drop divisor), and the lock-delay countdown once the piece
    /// rests on a surface. A piece whose lock delay expires is merged,
    /// full rows are cleared, the placement is scored and the next piece
    /// spawns, all within this call.
    ///
    /// Not calling `update` freezes every timer; there is no other clock.
    /// After the game has ended this is a no-op.
    pub fn update(&mut self, dt: Duration) {
        if self.is_over() {
            return;
        }
        self.state.time += dt;

        self.update_auto_shift(dt);
        self.update_gravity(dt);
        self.update_lock_delay(dt);
    }

    /// Tries to move the active piece one cell to the left.
    ///
    /// Returns whether the move succeeded. A successful move while the piece
    /// is counting down to lock resets the lock timer.
    pub fn move_left(&mut self) -> bool {
        self.try_shift(-1)
    }

    /// Tries to move the active piece one cell to the right.
    ///
    /// Returns whether the move succeeded. A successful move while the piece
    /// is counting down to lock resets the lock timer.
    pub fn move_right(&mut self) -> bool {
        self.try_shift(1)
    }

    /// Tries to rotate the active piece 90° clockwise, testing the in-place
    /// candidate first and then each wall-kick offset in table order.
    ///
    /// Either one candidate fits and the rotation is applied whole, or the
    /// piece is left exactly as it was and `false` is returned.
    pub fn rotate_cw(&mut self) -> bool {
        self.try_rotate(true)
    }

    /// Tries to rotate the active piece 90° counter-clockwise; otherwise
    /// like [`Game::rotate_cw`].
    pub fn rotate_ccw(&mut self) -> bool {
        self.try_rotate(false)
    }

    /// Engages or releases soft drop.
    ///
    /// While engaged, gravity runs `soft_drop_divisor` times faster and
    /// every successful downward step awards one point.
    pub fn set_soft_dropping(&mut self, soft_dropping: bool) {
        self.state.soft_dropping = soft_dropping;
    }

    /// Reports which horizontal direction is currently held, for delayed
    /// auto shift.
    ///
    /// A host typically calls [`Game::move_left`]/[`Game::move_right`] once
    /// on key-press for the immediate step and mirrors the held key here;
    /// `update` then repeats the movement after `delayed_auto_shift`, every
    /// `auto_repeat_rate`.
    pub fn set_auto_shift(&mut self, direction: Option<ShiftDirection>) {
        if self.state.auto_shift != direction {
            self.state.auto_shift = direction;
            self.state.auto_shift_timer = Duration::ZERO;
            self.state.auto_shift_charged = false;
        }
    }

    /// Drops the active piece straight down as far as it goes and locks it
    /// immediately, bypassing any remaining lock delay.
    ///
    /// Awards two points per row dropped, at drop time. Returns whether a
    /// piece was in play to drop.
    pub fn hard_drop(&mut self) -> bool {
        let Phase::PieceInPlay { piece_data } = &mut self.phase else {
            return false;
        };
        let dropped = piece_data.piece.dropped(&self.state.board);
        let distance = (dropped.position.1 - piece_data.piece.position.1) as u32;
        piece_data.piece = dropped;
        if distance > 0 {
            let points = self.state.score.award_hard_drop(distance);
            self.emit(Event::ScoreAwarded { points });
        }
        self.lock_active_piece(dropped);
        true
    }

    /// Stashes the active piece in the hold slot, swapping in the previously
    /// held piece if there is one (otherwise the next piece from the queue).
    ///
    /// At most one hold is allowed per spawn from the queue; the gate
    /// re-opens when the next piece after a placement comes into play.
    /// Returns whether the hold was performed.
    pub fn hold(&mut self) -> bool {
        if self.config.hold_disabled || !self.state.hold.can_hold_again {
            return false;
        }
        let Phase::PieceInPlay { piece_data } = self.phase else {
            return false;
        };
        let stashed = piece_data.piece.piece_type;
        if let Some(held) = self.state.hold.held {
            // Cause the next spawn to specially be the piece we held.
            self.state.queue.push_front(held);
        }
        self.state.hold.held = Some(stashed);
        self.state.hold.can_hold_again = false;
        self.emit(Event::HoldUsed);
        self.spawn_from_queue();
        true
    }

    /// Restricts the types future bags draw from, effective from the next
    /// generated bag.
    ///
    /// # Errors
    ///
    /// Rejects an empty set with [`ConfigError::EmptyPieceSet`] before any
    /// bag generation is attempted; the previous set stays in effect.
    pub fn set_allowed_piece_types(&mut self, allowed: &[PieceType]) -> Result<(), ConfigError> {
        self.state.queue.set_allowed_types(allowed)?;
        self.config.allowed_piece_types = self.state.queue.allowed_types().to_vec();
        Ok(())
    }

    /// Enables or disables the hold slot.
    pub fn set_hold_disabled(&mut self, hold_disabled: bool) {
        self.config.hold_disabled = hold_disabled;
    }

    /// Changes the lock-delay duration for subsequent locking.
    pub fn set_lock_delay(&mut self, lock_delay: Duration) {
        self.config.lock_delay = lock_delay;
    }

    /// Rescales the gravity interval.
    ///
    /// # Errors
    ///
    /// Rejects zero, negative or non-finite values, leaving the previous
    /// multiplier in effect.
    pub fn set_drop_interval_multiplier(&mut self, multiplier: f64) -> Result<(), ConfigError> {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(ConfigError::InvalidDropIntervalMultiplier);
        }
        self.config.drop_interval_multiplier = multiplier;
        Ok(())
    }

    fn try_shift(&mut self, dx: i32) -> bool {
        let Phase::PieceInPlay { piece_data } = &mut self.phase else {
            return false;
        };
        let Some(moved) = piece_data.piece.fits_at(&self.state.board, (dx, 0)) else {
            return false;
        };
        piece_data.piece = moved;
        refresh_lock_delay(piece_data, self.config.lock_reset_limit);
        true
    }

    fn try_rotate(&mut self, clockwise: bool) -> bool {
        let Phase::PieceInPlay { piece_data } = &mut self.phase else {
            return false;
        };
        let piece = piece_data.piece;
        let offsets = catalog::kick_offsets(piece.piece_type, piece.rotation, clockwise)
            .iter()
            .copied();
        let right_turns = if clockwise { 1 } else { -1 };
        let Some(rotated) = piece.first_fit(&self.state.board, offsets, right_turns) else {
            return false;
        };
        piece_data.piece = rotated;
        refresh_lock_delay(piece_data, self.config.lock_reset_limit);
        true
    }

    fn update_auto_shift(&mut self, dt: Duration) {
        let Some(direction) = self.state.auto_shift else {
            return;
        };
        if !matches!(self.phase, Phase::PieceInPlay { .. }) {
            return;
        }
        self.state.auto_shift_timer += dt;
        loop {
            let threshold = if self.state.auto_shift_charged {
                self.config.auto_repeat_rate
            } else {
                self.config.delayed_auto_shift
            };
            if threshold.is_zero() {
                // Instant repeat rate: the piece teleports against the wall.
                while self.try_shift(direction.dx()) {}
                self.state.auto_shift_timer = Duration::ZERO;
                self.state.auto_shift_charged = true;
                break;
            }
            if self.state.auto_shift_timer < threshold {
                break;
            }
            self.state.auto_shift_timer -= threshold;
            self.state.auto_shift_charged = true;
            self.try_shift(direction.dx());
        }
    }

    fn update_gravity(&mut self, dt: Duration) {
        let interval = self.drop_interval();
        let Phase::PieceInPlay { piece_data } = &mut self.phase else {
            return;
        };

        if interval.is_zero() {
            // Instant gravity: the piece falls to rest in one go.
            piece_data.piece = piece_data.piece.dropped(&self.state.board);
            if piece_data.lock_phase == LockPhase::Falling {
                piece_data.lock_phase = LockPhase::Locking;
                piece_data.lock_timer = Duration::ZERO;
            }
            piece_data.drop_timer = Duration::ZERO;
            return;
        }

        piece_data.drop_timer += dt;
        let mut soft_drop_points = 0;
        while piece_data.drop_timer >= interval {
            piece_data.drop_timer -= interval;
            if let Some(lower) = piece_data.piece.fits_at(&self.state.board, (0, 1)) {
                // A successful downward step returns the piece to free fall.
                piece_data.piece = lower;
                piece_data.lock_phase = LockPhase::Falling;
                piece_data.lock_timer = Duration::ZERO;
                if self.state.soft_dropping {
                    soft_drop_points += self.state.score.award_soft_drop();
                }
            } else {
                if piece_data.lock_phase == LockPhase::Falling {
                    piece_data.lock_phase = LockPhase::Locking;
                    piece_data.lock_timer = Duration::ZERO;
                }
                piece_data.drop_timer = Duration::ZERO;
                break;
            }
        }
        if soft_drop_points > 0 {
            self.emit(Event::ScoreAwarded {
                points: soft_drop_points,
            });
        }
    }

    fn update_lock_delay(&mut self, dt: Duration) {
        let Phase::PieceInPlay { piece_data } = &mut self.phase else {
            return;
        };
        if piece_data.lock_phase != LockPhase::Locking {
            return;
        }
        piece_data.lock_timer += dt;
        if piece_data.lock_timer >= self.config.lock_delay {
            let piece = piece_data.piece;
            self.lock_active_piece(piece);
        }
    }

    /// The merge → clear → score → respawn sequence at the instant of lock.
    fn lock_active_piece(&mut self, piece: Piece) {
        // T-spin classification happens before the piece joins the board.
        let t_spin = is_t_spin(&piece, &self.state.board);

        self.state.board.merge(&piece);
        self.emit(Event::PiecePlaced { piece });

        let cleared = self.state.board.clear_full_rows();
        if t_spin {
            self.emit(Event::TSpin);
        }
        if cleared > 0 {
            self.emit(Event::LinesCleared { count: cleared });
        }

        let board_empty = self.state.board.is_empty();
        let result = self.state.score.score_placement(cleared, t_spin, board_empty);
        if result.points > 0 {
            self.emit(Event::ScoreAwarded {
                points: result.points,
            });
        }
        if cleared > 0 {
            self.emit(Event::Combo {
                count: result.combo,
            });
        }
        if result.back_to_back_bonus {
            self.emit(Event::BackToBack);
        }
        if result.perfect_clear {
            self.emit(Event::PerfectClear);
        }

        // The hold gate re-opens with the piece spawning from the queue.
        self.state.hold.can_hold_again = true;

        self.spawn_from_queue();
    }

    /// Draws the next piece from the queue and tries to spawn it.
    pub(crate) fn spawn_from_queue(&mut self) {
        let piece_type = self.state.queue.next(&mut self.state.rng);
        self.state
            .queue
            .top_up(self.config.preview_count, &mut self.state.rng);
        self.spawn_piece(piece_type);
    }

    /// Places a new piece at its spawn position, or ends the session if the
    /// spawn cells overlap the stack.
    fn spawn_piece(&mut self, piece_type: PieceType) {
        let piece = Piece {
            piece_type,
            rotation: Rotation::R0,
            position: catalog::spawn_position(piece_type, self.config.board_width),
        };
        if piece.fits(&self.state.board) {
            self.phase = Phase::PieceInPlay {
                piece_data: PieceData {
                    piece,
                    lock_phase: LockPhase::Falling,
                    drop_timer: Duration::ZERO,
                    lock_timer: Duration::ZERO,
                    lock_resets: 0,
                },
            };
        } else {
            self.phase = Phase::GameEnd;
            self.emit(Event::GameOver);
        }
    }

    /// The current time a piece takes to fall one cell.
    fn drop_interval(&self) -> Duration {
        let mut secs = gravity_delay(self.state.score.level).as_secs_f64()
            * self.config.drop_interval_multiplier;
        if self.state.soft_dropping {
            secs /= self.config.soft_drop_divisor;
        }
        // Saturate rather than overflow for extreme configured factors.
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Resets the lock-delay countdown after a successful move or rotation,
/// honoring the optional per-piece reset cap.
fn refresh_lock_delay(piece_data: &mut PieceData, lock_reset_limit: Option<u32>) {
    if piece_data.lock_phase != LockPhase::Locking {
        return;
    }
    if lock_reset_limit.is_some_and(|cap| piece_data.lock_resets >= cap) {
        return;
    }
    piece_data.lock_timer = Duration::ZERO;
    piece_data.lock_resets += 1;
}

/// Whether a locking piece counts as a T-spin: a T-piece with at least three
/// of its bounding box corners occupied (filled or outside the board).
fn is_t_spin(piece: &Piece, board: &Board) -> bool {
    if piece.piece_type != PieceType::T {
        return false;
    }
    let (x, y) = piece.position;
    let corners = [(x, y), (x + 2, y), (x, y + 2), (x + 2, y + 2)];
    corners
        .iter()
        .filter(|&&(cx, cy)| board.cell_blocks(cx, cy))
        .count()
        >= 3
}

/// The amount of time a piece takes to fall one cell, purely dependent on
/// level.
#[rustfmt::skip]
fn gravity_delay(level: u32) -> Duration {
    Duration::from_nanos(match level {
        0 | 1 => 1_000_000_000,
        2 =>   793_000_000,
        3 =>   617_796_000,
        4 =>   472_729_139,
        5 =>   355_196_928,
        6 =>   262_003_550,
        7 =>   189_677_245,
        8 =>   134_734_731,
        9 =>    93_882_249,
       10 =>    64_151_585,
       11 =>    42_976_258,
       12 =>    28_217_678,
       13 =>    18_153_329,
       14 =>    11_439_342,
       15 =>     7_058_616,
       16 =>     4_263_557,
       17 =>     2_520_084,
       18 =>     1_457_139,
       19 =>       823_907, // NOTE: Close to 833'333ns = 1/120 s.
       20.. =>           0, // NOTE: We cap the formula here and call it INSTANT_GRAVITY.
    })
}
