/*!
# Blockfall Engine

`blockfall_engine` is the core of a falling-block puzzle game: a bag
randomizer, an active piece with kick-table rotation, a lock-delay state
machine, line clearing and an ordered scoring formula with combo,
back-to-back, T-spin and perfect-clear bonuses.

The engine renders nothing and persists nothing. A host drives it with one
synchronous [`Game::update`] call per frame plus discrete commands, and
observes it through read-only state accessors and registered
[`EventHandler`]s.

# Examples

```
use blockfall_engine::*;
use std::time::Duration;

// Starting up a game - a fixed seed makes the piece sequence reproducible.
let mut game = Game::builder()
    .seed(42)
    /* ...Further optional configuration possible... */
    .build()
    .unwrap();

// Commands are applied immediately.
game.move_left();
game.rotate_cw();

// Each frame, advance all internal timers (gravity, auto-shift, lock delay).
game.update(Duration::from_millis(16));

// Read most recent game state;
// This is how a UI can know how to render the board, etc.
let board = game.board();
let score = game.score_state();
```
*/

#![warn(missing_docs)]

pub mod board;
pub mod catalog;
mod game_builder;
mod game_update;
pub mod piece_queue;
pub mod scoring;

use std::{fmt, num::NonZeroU8, time::Duration};

use rand_chacha::ChaCha12Rng;

pub use board::Board;
pub use game_builder::GameBuilder;
pub use piece_queue::PieceQueue;
pub use scoring::ScoreState;

/// Abstract identifier for which type of tile occupies a cell in the grid.
pub type TileTypeID = NonZeroU8;
/// Coordinates used to address cells, `(x, y)` with `x` growing rightward
/// and `y` growing downward; `y` may be negative for cells above the grid.
pub type Coord = (i32, i32);
/// Coordinate offsets that can be added to [`Coord`]inates.
pub type Offset = (i32, i32);

/// The type used to identify points in time in a game's internal timeline.
pub type InGameTime = Duration;
/// The internal RNG used by a game.
pub type GameRng = ChaCha12Rng;

/// Represents one of the seven falling piece shapes.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PieceType {
    /// 'O'-piece. Four squares connected as one big square.
    O = 0,
    /// 'I'-piece. Four squares connected as one straight line.
    I,
    /// 'S'-piece. Four squares connected in an 'S'-snaking manner.
    S,
    /// 'Z'-piece. Four squares connected in a 'Z'-snaking manner.
    Z,
    /// 'T'-piece. Four squares connected in a 'T'-junction shape.
    T,
    /// 'L'-piece. Four squares connected in an 'L'-shape.
    L,
    /// 'J'-piece. Four squares connected in a 'J'-shape.
    J,
}

/// An abstract display color associated with a [`PieceType`].
///
/// The engine never draws; this is the conventional guideline palette tag a
/// renderer can map to whatever color space it uses.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PieceColor {
    /// 'O' yellow.
    Yellow,
    /// 'I' cyan.
    Cyan,
    /// 'S' green.
    Green,
    /// 'Z' red.
    Red,
    /// 'T' purple.
    Purple,
    /// 'L' orange.
    Orange,
    /// 'J' blue.
    Blue,
}

/// Represents the rotation state an active piece can be in.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    /// Spawn state.
    R0 = 0,
    /// One clockwise turn from spawn.
    R1,
    /// Two turns from spawn.
    R2,
    /// One counter-clockwise turn from spawn.
    R3,
}

/// An active piece in play.
///
/// Notably, the [`Game`] additionally stores lock-delay timing data
/// corresponding to the main active piece outside this struct.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Piece {
    /// Type of piece this is.
    pub piece_type: PieceType,
    /// In which way the piece is rotated.
    pub rotation: Rotation,
    /// The top-left corner of the piece's bounding box on the grid.
    pub position: Coord,
}

/// The one-piece buffer a piece can be stashed into, at most once per spawn.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldSlot {
    /// The piece type currently held, if any.
    pub held: Option<PieceType>,
    /// Whether a hold may still be performed before the next spawn.
    pub can_hold_again: bool,
}

/// A horizontal direction the host reports as held, for delayed auto shift.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShiftDirection {
    /// Auto-shift the piece leftward.
    Left,
    /// Auto-shift the piece rightward.
    Right,
}

/// Configuration options of the game, validated when a [`Game`] is built.
#[derive(PartialEq, PartialOrd, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Configuration {
    /// Number of columns of the playing grid.
    pub board_width: usize,
    /// Number of rows of the playing grid.
    pub board_height: usize,
    /// The piece types future bags draw from.
    pub allowed_piece_types: Vec<PieceType>,
    /// Whether the hold slot is disabled entirely.
    pub hold_disabled: bool,
    /// How many upcoming pieces should be pre-generated and visible.
    pub preview_count: usize,
    /// The level the game starts at (gravity and scoring multiplier).
    pub initial_level: u32,
    /// Scales the gravity interval; values below `1.0` speed the game up.
    pub drop_interval_multiplier: f64,
    /// How many times faster than normal a piece falls while soft-dropping.
    pub soft_drop_divisor: f64,
    /// Grace period after a piece can no longer fall before it locks.
    pub lock_delay: Duration,
    /// Optional cap on how many successful moves/rotations may reset the
    /// lock-delay countdown per piece. `None` preserves the classic
    /// uncapped behavior ("infinite spin").
    pub lock_reset_limit: Option<u32>,
    /// How long it takes for the active piece to start automatically shifting
    /// more to the side after the initial time a direction is held.
    pub delayed_auto_shift: Duration,
    /// How long it takes for automatic side movement to repeat once started.
    pub auto_repeat_rate: Duration,
}

/// An error produced when a [`Game`] is configured with unusable values.
///
/// Configuration is validated fail-fast: the error surfaces at build or
/// reconfiguration time, before any bag generation or play is attempted.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
pub enum ConfigError {
    /// The allowed piece set was empty; no bag can be generated from it.
    EmptyPieceSet,
    /// The board was narrower than the widest piece or had no usable rows.
    BoardTooSmall,
    /// `drop_interval_multiplier` was zero, negative, or not finite.
    InvalidDropIntervalMultiplier,
    /// `soft_drop_divisor` was zero, negative, or not finite.
    InvalidSoftDropDivisor,
    /// `initial_level` was zero; levels start at 1.
    InvalidInitialLevel,
}

/// Struct storing internal game state that changes over the course of play.
#[derive(PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct State {
    /// Current in-game time.
    pub time: InGameTime,
    /// The internal pseudo random number generator used.
    pub rng: GameRng,
    /// Upcoming pieces to be played.
    pub queue: PieceQueue,
    /// The main playing grid storing empty and filled, fixed tiles.
    pub board: Board,
    /// Data about the piece being held.
    pub hold: HoldSlot,
    /// Score, level, line and combo bookkeeping.
    pub score: ScoreState,
    /// Whether soft drop is currently engaged.
    pub soft_dropping: bool,
    /// The horizontal direction currently held for auto-shift, if any.
    pub auto_shift: Option<ShiftDirection>,
    /// Accumulates toward the next automatic horizontal step.
    pub auto_shift_timer: Duration,
    /// Whether the initial auto-shift charge period has elapsed.
    pub auto_shift_charged: bool,
}

/// Lifecycle of the active piece with respect to locking.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LockPhase {
    /// The piece can still move down.
    Falling,
    /// The piece rests on a surface; the lock-delay countdown is running.
    Locking,
}

/// Timing details stored about an active piece in play.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PieceData {
    /// The game piece itself.
    pub piece: Piece,
    /// Whether the piece is falling or counting down to lock.
    pub lock_phase: LockPhase,
    /// Accumulates toward the next automatic downward step.
    pub drop_timer: Duration,
    /// Accumulates toward lock once the piece cannot move down.
    pub lock_timer: Duration,
    /// How many successful moves/rotations have reset the lock timer so far.
    pub lock_resets: u32,
}

/// The top-level lifecycle state the game is in.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// The state of the game having an active piece in-play, which can be
    /// controlled by a player.
    PieceInPlay {
        /// The data required to play a piece in this `Phase`.
        piece_data: PieceData,
    },
    /// The state of the game being irreversibly over, and not playable
    /// anymore. Reached when a new piece cannot spawn.
    GameEnd,
}

/// An event pushed to registered [`EventHandler`]s as play progresses.
///
/// These let external collaborators (renderer, achievements, story mode)
/// react without the engine depending on any of them.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// A piece was locked down in a certain configuration.
    PiecePlaced {
        /// Information about the [`Piece`] that was locked.
        piece: Piece,
    },
    /// A number of lines were completed and removed simultaneously.
    LinesCleared {
        /// How many rows were removed.
        count: u32,
    },
    /// Points were added to the score.
    ScoreAwarded {
        /// The number of points awarded.
        points: u32,
    },
    /// A clearing placement extended the running combo.
    Combo {
        /// The combo counter after this placement.
        count: u32,
    },
    /// A 4-line clear followed another 4-line clear with nothing between.
    BackToBack,
    /// The board was left completely empty by a clear.
    PerfectClear,
    /// A T-piece was locked with at least three of its corners occupied.
    TSpin,
    /// The hold slot was used (stash or swap).
    HoldUsed,
    /// A new piece could not spawn; the session is over.
    GameOver,
}

/// Convenient type alias to denote an [`Event`] associated with the
/// [`InGameTime`] at which it occurred.
pub type EventMsg = (InGameTime, Event);

/// A named observer attached to a [`Game`].
///
/// Any number of handlers can be registered; each is invoked synchronously,
/// in registration order, for every [`Event`] the engine emits.
pub struct EventHandler {
    /// Identifies the handler, e.g. for debugging or deregistration.
    pub descriptor: String,
    /// The function object which will be called at runtime.
    pub handler: Box<dyn FnMut(InGameTime, &Event)>,
}

impl EventHandler {
    /// Creates a named handler from any suitable closure.
    pub fn new(descriptor: impl Into<String>, handler: impl FnMut(InGameTime, &Event) + 'static) -> Self {
        Self {
            descriptor: descriptor.into(),
            handler: Box::new(handler),
        }
    }
}

/// Main game struct representing a round of play.
#[derive(Debug)]
pub struct Game {
    /// Some internal configuration options of the `Game`.
    pub(crate) config: Configuration,
    pub(crate) seed: u64,
    pub(crate) state: State,
    pub(crate) phase: Phase,
    pub(crate) handlers: Vec<EventHandler>,
}

impl PieceType {
    /// All `PieceType` enum variants in order.
    ///
    /// Note that `PieceType::VARIANTS[t as usize] == t` always holds.
    pub const VARIANTS: [Self; 7] = {
        use PieceType::*;
        [O, I, S, Z, T, L, J]
    };

    /// Returns the convened-on standard tile id corresponding to the type.
    pub const fn tile_type_id(&self) -> TileTypeID {
        use PieceType::*;
        let id = match self {
            O => 1,
            I => 2,
            S => 3,
            Z => 4,
            T => 5,
            L => 6,
            J => 7,
        };
        // SAFETY: `id > 0` in every arm.
        unsafe { NonZeroU8::new_unchecked(id) }
    }

    /// Returns the conventional display color of the type.
    pub const fn color(&self) -> PieceColor {
        match self {
            PieceType::O => PieceColor::Yellow,
            PieceType::I => PieceColor::Cyan,
            PieceType::S => PieceColor::Green,
            PieceType::Z => PieceColor::Red,
            PieceType::T => PieceColor::Purple,
            PieceType::L => PieceColor::Orange,
            PieceType::J => PieceColor::Blue,
        }
    }
}

impl Rotation {
    /// All `Rotation` enum variants in order.
    ///
    /// Note that `Rotation::VARIANTS[r as usize] == r` always holds.
    pub const VARIANTS: [Self; 4] = {
        use Rotation::*;
        [R0, R1, R2, R3]
    };

    /// Find a new rotation state by turning clockwise some number of times.
    ///
    /// This accepts negative values to allow for counter-clockwise turns.
    pub const fn turned_cw(&self, right_turns: i8) -> Self {
        Rotation::VARIANTS[((*self as i8 + right_turns) as isize).rem_euclid(4) as usize]
    }
}

impl ShiftDirection {
    /// The horizontal step this direction corresponds to.
    pub const fn dx(&self) -> i32 {
        match self {
            ShiftDirection::Left => -1,
            ShiftDirection::Right => 1,
        }
    }
}

impl Piece {
    /// Returns the coordinates and tile types of the piece on the grid.
    pub fn tiles(&self) -> [(Coord, TileTypeID); 4] {
        let Self {
            piece_type,
            rotation,
            position: (x, y),
        } = self;
        let tile_type_id = piece_type.tile_type_id();
        catalog::shape_cells(*piece_type, *rotation).map(|(dx, dy)| ((x + dx, y + dy), tile_type_id))
    }

    /// Checks whether the piece fits at its current location onto the board.
    ///
    /// Cells above the grid (`y < 0`) only need to stay within the board
    /// width; all others must be in bounds and unoccupied.
    pub fn fits(&self, board: &Board) -> bool {
        self.tiles().iter().all(|&((x, y), _)| board.cell_free(x, y))
    }

    /// Checks whether the piece fits a given offset from its current location
    /// onto the board.
    pub fn fits_at(&self, board: &Board, (dx, dy): Offset) -> Option<Piece> {
        let mut new_piece = *self;
        new_piece.position = (self.position.0 + dx, self.position.1 + dy);
        new_piece.fits(board).then_some(new_piece)
    }

    /// Given an iterator over some offsets, checks whether the turned piece
    /// fits at any offset location onto the board.
    pub fn first_fit(
        &self,
        board: &Board,
        offsets: impl IntoIterator<Item = Offset>,
        right_turns: i8,
    ) -> Option<Piece> {
        let mut new_piece = *self;
        new_piece.rotation = new_piece.rotation.turned_cw(right_turns);
        let (x, y) = self.position;
        offsets.into_iter().find_map(|(dx, dy)| {
            new_piece.position = (x + dx, y + dy);
            new_piece.fits(board).then_some(new_piece)
        })
    }

    /// Returns the position the piece would come to rest at if it kept
    /// moving down. For a resting piece this returns the piece unchanged.
    pub fn dropped(&self, board: &Board) -> Piece {
        let mut piece = *self;
        while let Some(new_piece) = piece.fits_at(board, (0, 1)) {
            piece = new_piece;
        }
        piece
    }
}

impl HoldSlot {
    /// A fresh, empty slot with the hold gate open.
    pub const fn new() -> Self {
        Self {
            held: None,
            can_hold_again: true,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            board_width: 10,
            board_height: 20,
            allowed_piece_types: PieceType::VARIANTS.to_vec(),
            hold_disabled: false,
            preview_count: 4,
            initial_level: 1,
            drop_interval_multiplier: 1.0,
            soft_drop_divisor: 10.0,
            lock_delay: Duration::from_millis(500),
            lock_reset_limit: None,
            delayed_auto_shift: Duration::from_millis(167),
            auto_repeat_rate: Duration::from_millis(33),
        }
    }
}

impl Configuration {
    /// Checks every field for usability, reporting the first offender.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_piece_types.is_empty() {
            return Err(ConfigError::EmptyPieceSet);
        }
        if self.board_width < 4 || self.board_height < 2 {
            return Err(ConfigError::BoardTooSmall);
        }
        if !(self.drop_interval_multiplier.is_finite() && self.drop_interval_multiplier > 0.0) {
            return Err(ConfigError::InvalidDropIntervalMultiplier);
        }
        if !(self.soft_drop_divisor.is_finite() && self.soft_drop_divisor > 0.0) {
            return Err(ConfigError::InvalidSoftDropDivisor);
        }
        if self.initial_level == 0 {
            return Err(ConfigError::InvalidInitialLevel);
        }
        Ok(())
    }
}

impl Phase {
    /// Read accessor to a `Phase`'s possible [`Piece`].
    pub fn piece(&self) -> Option<&Piece> {
        if let Phase::PieceInPlay {
            piece_data: PieceData { piece, .. },
        } = self
        {
            Some(piece)
        } else {
            None
        }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("EventHandler")
            .field("descriptor", &self.descriptor)
            .field("handler", &std::any::type_name_of_val(&self.handler))
            .finish()
    }
}

impl Game {
    /// Creates a blank new template representing a yet-to-be-started [`Game`]
    /// ready for configuration.
    pub fn builder() -> GameBuilder {
        GameBuilder::default()
    }

    /// Read accessor for the game's configuration.
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// The seed the game's PRNG was initialized with.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Read accessor for the current game state.
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Read accessor for the current lifecycle phase.
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Read accessor for the playing grid.
    pub const fn board(&self) -> &Board {
        &self.state.board
    }

    /// Read accessor for score, level, line and combo bookkeeping.
    pub const fn score_state(&self) -> &ScoreState {
        &self.state.score
    }

    /// The currently active piece, if one is in play.
    pub fn active_piece(&self) -> Option<&Piece> {
        self.phase.piece()
    }

    /// The piece type currently stashed in the hold slot, if any.
    pub const fn held_piece(&self) -> Option<PieceType> {
        self.state.hold.held
    }

    /// The upcoming piece types, in play order, up to the configured preview
    /// count.
    pub fn preview(&self) -> impl Iterator<Item = PieceType> + '_ {
        self.state.queue.queued().take(self.config.preview_count)
    }

    /// The row the active piece's bounding box would come to rest in if hard
    /// dropped now. Exposed for ghost-piece display only.
    pub fn ghost_row(&self) -> Option<i32> {
        let piece = self.phase.piece()?;
        Some(piece.dropped(&self.state.board).position.1)
    }

    /// Whether the session has irreversibly ended.
    pub const fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameEnd)
    }

    /// Registers an observer that is called for every future [`Event`].
    pub fn add_handler(&mut self, handler: EventHandler) {
        self.handlers.push(handler);
    }

    /// Removes all handlers with the given descriptor, returning how many
    /// were removed.
    pub fn remove_handlers(&mut self, descriptor: &str) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|h| h.descriptor != descriptor);
        before - self.handlers.len()
    }

    pub(crate) fn emit(&mut self, event: Event) {
        let time = self.state.time;
        for handler in &mut self.handlers {
            (handler.handler)(time, &event);
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigError::EmptyPieceSet => "allowed piece set is empty",
            ConfigError::BoardTooSmall => "board dimensions are too small to play on",
            ConfigError::InvalidDropIntervalMultiplier => {
                "drop interval multiplier must be finite and positive"
            }
            ConfigError::InvalidSoftDropDivisor => {
                "soft drop divisor must be finite and positive"
            }
            ConfigError::InvalidInitialLevel => "levels start at 1",
        };
        write!(f, "{s}")
    }
}

impl std::error::Error for ConfigError {}
