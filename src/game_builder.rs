/*!
This module handles creation / initialization / building of [`Game`]s.
*/

use rand_chacha::rand_core::SeedableRng;

use super::*;

/// This builder exposes the ability to configure a new [`Game`] to varying
/// degrees.
///
/// Generally speaking, when using `GameBuilder`, you'll first call
/// [`GameBuilder::new`] or [`Game::builder`], then chain calls to methods to
/// set each field, then call [`GameBuilder::build`]. Configuration is
/// validated there, before any game state exists. The `GameBuilder` is not
/// used up and its configuration can be re-used to initialize more
/// [`Game`]s.
#[derive(PartialEq, PartialOrd, Clone, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameBuilder {
    /// Many of the configuration options that will be set for the game.
    pub config: Configuration,
    /// The value to seed the game's PRNG with. A random seed is drawn at
    /// build time if none is set.
    pub seed: Option<u64>,
}

impl GameBuilder {
    /// Creates a blank new template representing a yet-to-be-started
    /// [`Game`] ready for configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Game`] with the information specified by `self`.
    ///
    /// # Errors
    ///
    /// Fails fast with a [`ConfigError`] if any configured value is
    /// unusable, e.g. an empty allowed piece set.
    pub fn build(&self) -> Result<Game, ConfigError> {
        self.config.validate()?;
        let seed = self.seed.unwrap_or_else(rand::random);
        let queue = PieceQueue::new(&self.config.allowed_piece_types)?;

        let mut game = Game {
            state: State {
                time: Duration::ZERO,
                rng: GameRng::seed_from_u64(seed),
                queue,
                board: Board::new(self.config.board_width, self.config.board_height),
                hold: HoldSlot::new(),
                score: ScoreState::new(self.config.initial_level),
                soft_dropping: false,
                auto_shift: None,
                auto_shift_timer: Duration::ZERO,
                auto_shift_charged: false,
            },
            phase: Phase::GameEnd,
            handlers: Vec::new(),
            config: self.config.clone(),
            seed,
        };
        // The first spawn cannot fail on a freshly validated, empty board.
        game.spawn_from_queue();
        Ok(game)
    }

    /// Sets the [`Configuration`] that will be used by [`Game`] wholesale.
    pub fn config(&mut self, x: Configuration) -> &mut Self {
        self.config = x;
        self
    }

    /// The dimensions of the playing grid, fixed for the session.
    pub fn board_dimensions(&mut self, width: usize, height: usize) -> &mut Self {
        self.config.board_width = width;
        self.config.board_height = height;
        self
    }
    /// The piece types future bags draw from.
    pub fn allowed_piece_types(&mut self, x: impl Into<Vec<PieceType>>) -> &mut Self {
        self.config.allowed_piece_types = x.into();
        self
    }
    /// Whether the hold slot is disabled entirely.
    pub fn hold_disabled(&mut self, x: bool) -> &mut Self {
        self.config.hold_disabled = x;
        self
    }
    /// How many upcoming pieces should be pre-generated and visible.
    pub fn preview_count(&mut self, x: usize) -> &mut Self {
        self.config.preview_count = x;
        self
    }
    /// The level the game starts at.
    pub fn initial_level(&mut self, x: u32) -> &mut Self {
        self.config.initial_level = x;
        self
    }
    /// Scales the gravity interval; values below `1.0` speed the game up.
    pub fn drop_interval_multiplier(&mut self, x: f64) -> &mut Self {
        self.config.drop_interval_multiplier = x;
        self
    }
    /// How many times faster than normal a piece falls while soft-dropping.
    pub fn soft_drop_divisor(&mut self, x: f64) -> &mut Self {
        self.config.soft_drop_divisor = x;
        self
    }
    /// Grace period after a piece can no longer fall before it locks.
    pub fn lock_delay(&mut self, x: Duration) -> &mut Self {
        self.config.lock_delay = x;
        self
    }
    /// Optional cap on lock-delay resets per piece; `None` keeps the classic
    /// uncapped behavior.
    pub fn lock_reset_limit(&mut self, x: Option<u32>) -> &mut Self {
        self.config.lock_reset_limit = x;
        self
    }
    /// How long it takes for the active piece to start automatically
    /// shifting more to the side after a direction is first held.
    pub fn delayed_auto_shift(&mut self, x: Duration) -> &mut Self {
        self.config.delayed_auto_shift = x;
        self
    }
    /// How long it takes for automatic side movement to repeat once started.
    pub fn auto_repeat_rate(&mut self, x: Duration) -> &mut Self {
        self.config.auto_repeat_rate = x;
        self
    }
    /// The value to seed the game's PRNG with.
    pub fn seed(&mut self, x: u64) -> &mut Self {
        self.seed = Some(x);
        self
    }
}
