use core::fmt;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::*;

/// Valid transitions:
/// - Pending -> Active (first reveal places the mines)
/// - Active -> Won
/// - Active -> Lost
/// - any -> Pending (restart)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Board created, no mines placed, timer not started
    #[default]
    Pending,
    /// Mines placed and the timer is running
    Active,
    /// Every safe cell was revealed
    Won,
    /// A mine was revealed
    Lost,
}

impl GamePhase {
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// No moves are accepted until the next restart.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// State change pushed to subscribers after each intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged {
        phase: GamePhase,
    },
    CellsRevealed {
        cells: Vec<RevealedCell>,
    },
    FlagToggled {
        coords: Coord2,
        flagged: bool,
        flag_count: CellCount,
    },
    /// A chord was attempted on a number with too many flags around it.
    Overflagged {
        coords: Coord2,
    },
    /// A chord was attempted before enough flags were placed; `cells` would be opened.
    ChordHint {
        coords: Coord2,
        cells: Vec<Coord2>,
    },
    MineHit {
        mine: Coord2,
        mines: Vec<Coord2>,
        misplaced_flags: Vec<Coord2>,
    },
    /// Mines flagged automatically when the game is won.
    MinesFlagged {
        cells: Vec<Coord2>,
    },
    NewBoard {
        config: GameConfig,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&GameEvent)>;

/// Represents a game from first move to finish, and every game after it on restart.
pub struct GameSession {
    board: Board,
    phase: GamePhase,
    generator: Box<dyn MinefieldGenerator>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    triggered_mine: Option<Coord2>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: usize,
}

impl GameSession {
    /// Validates the dimensions and prepares a pending game with randomly placed mines.
    pub fn new(width: Coord, height: Coord, mines: CellCount) -> Result<Self> {
        Self::with_config(GameConfig::new(width, height, mines)?)
    }

    pub fn with_config(config: GameConfig) -> Result<Self> {
        Self::with_generator(config, RandomMinefieldGenerator::from_entropy())
    }

    /// Same seed, same sequence of layouts for the same first moves.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self> {
        Self::with_generator(config, RandomMinefieldGenerator::from_seed(seed))
    }

    pub fn with_generator<G>(config: GameConfig, generator: G) -> Result<Self>
    where
        G: MinefieldGenerator + 'static,
    {
        let config = GameConfig::new(config.width, config.height, config.mines)?;
        Ok(Self::from_parts(config, Box::new(generator)))
    }

    /// Replays a known layout. The layout is not checked against a safe zone.
    pub fn with_layout(layout: MineLayout) -> Self {
        let config = layout.game_config();
        Self::from_parts(config, Box::new(FixedMinefieldGenerator::new(layout)))
    }

    fn from_parts(config: GameConfig, generator: Box<dyn MinefieldGenerator>) -> Self {
        Self {
            board: Board::new(config),
            phase: GamePhase::Pending,
            generator,
            started_at: None,
            ended_at: None,
            triggered_mine: None,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    pub fn config(&self) -> GameConfig {
        self.board.config()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn cell_at(&self, coords: Coord2) -> Result<EngineCell> {
        let coords = self.board.validate_coords(coords)?;
        Ok(self.board.cell_at(coords))
    }

    pub fn mode_descriptor(&self) -> String {
        self.config().mode_descriptor()
    }

    pub fn flag_count(&self) -> CellCount {
        self.board.flag_count()
    }

    pub fn mine_count(&self) -> CellCount {
        self.board.mine_count()
    }

    /// Mines not yet accounted for by a flag; negative when over-flagged.
    pub fn mines_left(&self) -> i32 {
        i32::from(self.board.mine_count()) - i32::from(self.board.flag_count())
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Seconds since the first reveal, frozen once the game ends; zero while pending.
    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        match self.started_at {
            Some(started_at) => self
                .ended_at
                .unwrap_or(now)
                .saturating_duration_since(started_at)
                .as_secs_f64(),
            None => 0.0,
        }
    }

    /// The record to store for a won game.
    pub fn winning_record(&self) -> Option<Record> {
        match (self.phase, self.started_at, self.ended_at) {
            (GamePhase::Won, Some(started_at), Some(ended_at)) => Some(Record::new(
                self.mode_descriptor(),
                ended_at.saturating_duration_since(started_at).as_secs_f32(),
            )),
            _ => None,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        self.reveal_at(coords, Instant::now())
    }

    /// Reveals `coords`, placing the mines around it first if this is the opening move.
    pub fn reveal_at(&mut self, coords: Coord2, now: Instant) -> Result<RevealOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_finished()?;

        if self.phase.is_pending() {
            self.board.place_mines(coords, self.generator.as_mut())?;
            self.started_at = Some(now);
            log::debug!("Game {} started at {:?}", self.mode_descriptor(), coords);
            self.set_phase(GamePhase::Active);
        }

        let outcome = reveal(&mut self.board, coords)?;
        self.apply_outcome(&outcome, now);
        Ok(outcome)
    }

    pub fn chord(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        self.chord_at(coords, Instant::now())
    }

    pub fn chord_at(&mut self, coords: Coord2, now: Instant) -> Result<RevealOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_finished()?;

        if !matches!(self.phase, GamePhase::Active) {
            return Ok(RevealOutcome::NoChange);
        }

        let outcome = chord(&mut self.board, coords)?;
        match &outcome {
            RevealOutcome::Overflagged => self.emit(GameEvent::Overflagged { coords }),
            RevealOutcome::NoChange => {
                let cells = self.chord_hint_cells(coords)?;
                if !cells.is_empty() {
                    self.emit(GameEvent::ChordHint { coords, cells });
                }
            }
            _ => self.apply_outcome(&outcome, now),
        }
        Ok(outcome)
    }

    /// Cells a chord on `coords` would open, when it is an under-flagged number.
    pub fn chord_hint_cells(&self, coords: Coord2) -> Result<Vec<Coord2>> {
        let coords = self.board.validate_coords(coords)?;
        Ok(match self.board.cell_at(coords) {
            EngineCell::Revealed(count) if self.board.adjacent_flag_count(coords) < count => {
                chord_candidates(&self.board, coords)
            }
            _ => Vec::new(),
        })
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<FlagOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_finished()?;

        let outcome = self.board.toggle_flag(coords)?;
        if outcome.has_update() {
            self.emit(GameEvent::FlagToggled {
                coords,
                flagged: matches!(outcome, FlagOutcome::Flagged),
                flag_count: self.board.flag_count(),
            });
        }
        Ok(outcome)
    }

    /// Throws the current board away and starts over with the same configuration.
    pub fn restart(&mut self) {
        let config = self.config();
        self.reset(config);
    }

    /// Throws the current board away and starts over with a new configuration.
    pub fn new_game(&mut self, config: GameConfig) -> Result<()> {
        let config = GameConfig::new(config.width, config.height, config.mines)?;
        self.reset(config);
        Ok(())
    }

    fn reset(&mut self, config: GameConfig) {
        self.board = Board::new(config);
        self.started_at = None;
        self.ended_at = None;
        self.triggered_mine = None;
        log::debug!("New board {}", config);
        self.emit(GameEvent::NewBoard { config });
        self.set_phase(GamePhase::Pending);
    }

    fn apply_outcome(&mut self, outcome: &RevealOutcome, now: Instant) {
        match outcome {
            RevealOutcome::Revealed(cells) => {
                self.emit(GameEvent::CellsRevealed {
                    cells: cells.clone(),
                });
                if self.board.is_win() {
                    self.mark_ended(true, now);
                }
            }
            RevealOutcome::HitMine { mine, revealed } => {
                if !revealed.is_empty() {
                    self.emit(GameEvent::CellsRevealed {
                        cells: revealed.clone(),
                    });
                }
                self.triggered_mine = Some(*mine);
                self.mark_ended(false, now);
            }
            RevealOutcome::NoChange | RevealOutcome::Overflagged => {}
        }
    }

    fn mark_ended(&mut self, won: bool, now: Instant) {
        if self.phase.is_finished() {
            return;
        }

        self.ended_at = Some(now);
        if won {
            let cells = self.board.flag_remaining_mines();
            if !cells.is_empty() {
                self.emit(GameEvent::MinesFlagged { cells });
            }
            log::debug!("Game won in {:.2}s", self.elapsed_seconds(now));
            self.set_phase(GamePhase::Won);
        } else {
            let mine = self.triggered_mine.unwrap_or_default();
            self.emit(GameEvent::MineHit {
                mine,
                mines: self.board.mines(),
                misplaced_flags: self.board.misplaced_flags(),
            });
            log::debug!("Game lost at {:?}", mine);
            self.set_phase(GamePhase::Lost);
        }
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(GameEvent::PhaseChanged { phase });
        }
    }

    fn emit(&mut self, event: GameEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.phase.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("board", &self.board)
            .field("phase", &self.phase)
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .field("triggered_mine", &self.triggered_mine)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
