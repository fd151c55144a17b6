/*!
This module computes the points awarded for a placement and keeps the
running score, level, line, combo and back-to-back bookkeeping.
*/

/// Base points for clearing 0..=4 lines at once, before the level
/// multiplier.
pub const LINE_CLEAR_POINTS: [u32; 5] = [0, 100, 300, 500, 800];

/// Points per level for a T-spin classification, awarded on top of any line
/// clear.
pub const T_SPIN_POINTS: u32 = 400;

/// Points per level for leaving the board completely empty.
pub const PERFECT_CLEAR_POINTS: u32 = 3000;

/// Lines that must be cleared in total to advance one level.
pub const LINES_PER_LEVEL: u32 = 10;

/// Running score bookkeeping for one round of play.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreState {
    /// The current total score.
    pub score: u32,
    /// The current level.
    pub level: u32,
    /// The total number of lines that have been cleared.
    pub lines_cleared: u32,
    /// The number of consecutive placements so far that each cleared at
    /// least one line.
    pub combo: u32,
    /// Whether the most recent clearing placement was a 4-line clear.
    pub back_to_back: bool,
}

/// What one scored placement amounted to, for event reporting.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementResult {
    /// Total points awarded for the placement, perfect clear included.
    pub points: u32,
    /// How many lines the placement cleared.
    pub lines_cleared: u32,
    /// The combo counter after the placement.
    pub combo: u32,
    /// Whether the back-to-back multiplier was applied.
    pub back_to_back_bonus: bool,
    /// Whether the placement was classified as a T-spin.
    pub t_spin: bool,
    /// Whether the placement left the board completely empty.
    pub perfect_clear: bool,
}

impl ScoreState {
    /// Fresh bookkeeping starting at the given level.
    pub const fn new(initial_level: u32) -> Self {
        Self {
            score: 0,
            level: initial_level,
            lines_cleared: 0,
            combo: 0,
            back_to_back: false,
        }
    }

    /// Scores one placement, in this exact order: T-spin bonus, base line
    /// points, combo bonus (using the pre-placement combo), back-to-back
    /// multiplier, combo update, perfect-clear bonus.
    ///
    /// `board_empty` is the board's emptiness after row removal.
    pub fn score_placement(
        &mut self,
        lines_cleared: u32,
        t_spin: bool,
        board_empty: bool,
    ) -> PlacementResult {
        let level = self.level;
        let mut points = 0;

        if t_spin {
            points += T_SPIN_POINTS * level;
        }

        points += LINE_CLEAR_POINTS[lines_cleared as usize] * level;

        // A placement clearing nothing awards nothing beyond a T-spin, so
        // the combo bonus only ever rides on a clearing placement.
        if lines_cleared > 0 && self.combo > 0 {
            points += 50 * self.combo * level;
        }

        let mut back_to_back_bonus = false;
        if lines_cleared == 4 {
            if self.back_to_back {
                points = points * 3 / 2;
                back_to_back_bonus = true;
            }
            self.back_to_back = true;
        } else {
            self.back_to_back = false;
        }

        if lines_cleared == 0 {
            self.combo = 0;
        } else {
            self.combo += 1;
        }

        let perfect_clear = board_empty && lines_cleared > 0;
        if perfect_clear {
            points += PERFECT_CLEAR_POINTS * level;
        }

        self.score += points;
        let lines_before = self.lines_cleared;
        self.lines_cleared += lines_cleared;
        self.level +=
            self.lines_cleared / LINES_PER_LEVEL - lines_before / LINES_PER_LEVEL;

        PlacementResult {
            points,
            lines_cleared,
            combo: self.combo,
            back_to_back_bonus,
            t_spin,
            perfect_clear,
        }
    }

    /// Awards the flat bonus for one successful soft-drop step.
    pub fn award_soft_drop(&mut self) -> u32 {
        self.score += 1;
        1
    }

    /// Awards the bonus for a hard drop over the given distance.
    pub fn award_hard_drop(&mut self, distance: u32) -> u32 {
        let points = 2 * distance;
        self.score += points;
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tetris_scores_the_table_entry() {
        let mut state = ScoreState::new(1);
        let result = state.score_placement(4, false, false);
        assert_eq!(result.points, 800);
        assert_eq!(state.combo, 1);
        assert!(state.back_to_back);
    }

    #[test]
    fn back_to_back_tetris_multiplies_after_the_combo_bonus() {
        let mut state = ScoreState::new(1);
        state.score_placement(4, false, false);
        let result = state.score_placement(4, false, false);
        // (800 + 50 * combo 1) * 1.5, floored.
        assert_eq!(result.points, 1275);
        assert!(result.back_to_back_bonus);
        assert_eq!(state.combo, 2);
    }

    #[test]
    fn non_clearing_placement_breaks_combo_and_back_to_back() {
        let mut state = ScoreState::new(1);
        state.score_placement(4, false, false);
        let result = state.score_placement(0, false, false);
        assert_eq!(result.points, 0);
        assert_eq!(state.combo, 0);
        assert!(!state.back_to_back);
    }

    #[test]
    fn single_after_tetris_clears_the_back_to_back_flag() {
        let mut state = ScoreState::new(1);
        state.score_placement(4, false, false);
        let result = state.score_placement(1, false, false);
        // 100 base + 50 combo bonus, no multiplier.
        assert_eq!(result.points, 150);
        assert!(!state.back_to_back);
    }

    #[test]
    fn t_spin_without_lines_scores_independently() {
        let mut state = ScoreState::new(3);
        let result = state.score_placement(0, true, false);
        assert_eq!(result.points, 400 * 3);
        // A zero-line T-spin still breaks the combo.
        assert_eq!(state.combo, 0);
    }

    #[test]
    fn perfect_clear_adds_its_bonus_after_everything_else() {
        let mut state = ScoreState::new(2);
        let result = state.score_placement(2, false, true);
        assert_eq!(result.points, 300 * 2 + 3000 * 2);
        assert!(result.perfect_clear);
    }

    #[test]
    fn perfect_clear_is_not_multiplied_by_back_to_back() {
        let mut state = ScoreState::new(1);
        state.score_placement(4, false, false);
        let result = state.score_placement(4, false, true);
        // (800 + 50) * 1.5 from back-to-back, then the flat 3000.
        assert_eq!(result.points, 1275 + 3000);
    }

    #[test]
    fn drop_bonuses_accumulate_outside_placements() {
        let mut state = ScoreState::new(1);
        assert_eq!(state.award_soft_drop(), 1);
        assert_eq!(state.award_hard_drop(7), 14);
        assert_eq!(state.score, 15);
    }

    #[test]
    fn level_advances_every_ten_lines() {
        let mut state = ScoreState::new(1);
        for _ in 0..4 {
            state.score_placement(2, false, false);
        }
        assert_eq!(state.level, 1);
        state.score_placement(2, false, false);
        assert_eq!(state.level, 2);
        assert_eq!(state.lines_cleared, 10);
    }

    #[test]
    fn level_progression_respects_the_initial_level() {
        let mut state = ScoreState::new(5);
        for _ in 0..5 {
            state.score_placement(2, false, false);
        }
        assert_eq!(state.level, 6);
    }
}
