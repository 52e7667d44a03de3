use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Grid state for a single game: the mine layout once placed, plus what the player has
/// revealed and flagged.
///
/// A cell is never both revealed and flagged, and mines are placed at most once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    config: GameConfig,
    mine_layout: Option<MineLayout>,
    cells: Array2<EngineCell>,
    revealed_count: CellCount,
    flagged_count: CellCount,
}

impl Board {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            mine_layout: None,
            cells: Array2::default(config.bounds().to_nd_index()),
            revealed_count: 0,
            flagged_count: 0,
        }
    }

    /// Board whose mines are already known, skipping first-move placement.
    pub fn with_layout(mine_layout: MineLayout) -> Self {
        let mut board = Self::new(mine_layout.game_config());
        board.mine_layout = Some(mine_layout);
        board
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn bounds(&self) -> Coord2 {
        self.config.bounds()
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        self.config.validate_coords(coords)
    }

    pub fn has_mines(&self) -> bool {
        self.mine_layout.is_some()
    }

    pub fn mine_layout(&self) -> Option<&MineLayout> {
        self.mine_layout.as_ref()
    }

    /// Asks `generator` for a layout that keeps `start` and its neighbors safe.
    pub fn place_mines<G>(&mut self, start: Coord2, generator: &mut G) -> Result<()>
    where
        G: MinefieldGenerator + ?Sized,
    {
        let start = self.validate_coords(start)?;
        if self.has_mines() {
            return Err(GameError::MinesAlreadyPlaced);
        }

        let mine_layout = generator.generate(self.config, start)?;
        if mine_layout.game_config() != self.config {
            return Err(GameError::LayoutMismatch);
        }
        self.mine_layout = Some(mine_layout);
        Ok(())
    }

    pub fn cell_at(&self, coords: Coord2) -> EngineCell {
        self.cells[coords.to_nd_index()]
    }

    pub fn is_revealed(&self, coords: Coord2) -> bool {
        self.cell_at(coords).is_revealed()
    }

    pub fn is_flagged(&self, coords: Coord2) -> bool {
        self.cell_at(coords).is_flagged()
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self.mine_layout
            .as_ref()
            .is_some_and(|layout| layout.contains_mine(coords))
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.mine_layout
            .as_ref()
            .map_or(0, |layout| layout.adjacent_mine_count(coords))
    }

    pub fn adjacent_flag_count(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self.is_flagged(pos))
            .count() as u8
    }

    pub fn neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.bounds())
    }

    /// Flags or unflags a hidden cell. Revealed cells and boards without mines are left alone.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<FlagOutcome> {
        let coords = self.validate_coords(coords)?;
        if !self.has_mines() {
            return Ok(FlagOutcome::NoChange);
        }

        let cell = &mut self.cells[coords.to_nd_index()];
        Ok(match *cell {
            EngineCell::Hidden => {
                *cell = EngineCell::Flagged;
                self.flagged_count += 1;
                FlagOutcome::Flagged
            }
            EngineCell::Flagged => {
                *cell = EngineCell::Hidden;
                self.flagged_count -= 1;
                FlagOutcome::Unflagged
            }
            EngineCell::Revealed(_) => FlagOutcome::NoChange,
        })
    }

    pub fn is_win(&self) -> bool {
        self.revealed_count == self.config.safe_cells()
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn flag_count(&self) -> CellCount {
        self.flagged_count
    }

    pub fn mine_count(&self) -> CellCount {
        self.config.mines
    }

    pub fn mines(&self) -> Vec<Coord2> {
        self.mine_layout
            .as_ref()
            .map(MineLayout::mines)
            .unwrap_or_default()
    }

    pub fn flags(&self) -> Vec<Coord2> {
        self.coords_where(EngineCell::is_flagged)
    }

    pub fn revealed(&self) -> Vec<Coord2> {
        self.coords_where(EngineCell::is_revealed)
    }

    /// Flags sitting on cells without a mine.
    pub fn misplaced_flags(&self) -> Vec<Coord2> {
        self.flags()
            .into_iter()
            .filter(|&pos| !self.contains_mine(pos))
            .collect()
    }

    pub(crate) fn mark_revealed(&mut self, coords: Coord2, adjacent_mines: u8) {
        let cell = &mut self.cells[coords.to_nd_index()];
        debug_assert_eq!(*cell, EngineCell::Hidden);
        *cell = EngineCell::Revealed(adjacent_mines);
        self.revealed_count += 1;
    }

    /// Flags every mine the player left unflagged, returning those cells.
    pub(crate) fn flag_remaining_mines(&mut self) -> Vec<Coord2> {
        let unflagged: Vec<_> = self
            .mines()
            .into_iter()
            .filter(|&pos| self.cell_at(pos) == EngineCell::Hidden)
            .collect();
        for &pos in &unflagged {
            self.cells[pos.to_nd_index()] = EngineCell::Flagged;
            self.flagged_count += 1;
        }
        unflagged
    }

    fn coords_where(&self, predicate: impl Fn(EngineCell) -> bool) -> Vec<Coord2> {
        self.cells
            .indexed_iter()
            .filter(|&(_, &cell)| predicate(cell))
            .map(|((row, col), _)| (row as Coord, col as Coord))
            .collect()
    }
}
