use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use board::*;
pub use error::*;
pub use generator::*;
pub use records::*;
pub use reveal::*;
pub use session::*;
pub use tile::*;
pub use types::*;

mod board;
mod error;
mod generator;
mod records;
mod reveal;
mod session;
mod tile;
mod types;

/// Dimensions and mine count of one game, passed by value to everything that needs them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(width: Coord, height: Coord, mines: CellCount) -> Self {
        Self {
            width,
            height,
            mines,
        }
    }

    /// Validates a configuration so that mine placement can always succeed,
    /// wherever the first click lands.
    pub fn new(width: Coord, height: Coord, mines: CellCount) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::EmptyBoard);
        }
        if mines == 0 {
            return Err(GameError::NoMines);
        }

        let config = Self::new_unchecked(width, height, mines);
        let capacity = config.mine_capacity();
        if mines > capacity {
            return Err(GameError::TooManyMines {
                requested: mines,
                capacity,
            });
        }
        Ok(config)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.width, self.height)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells().saturating_sub(self.mines)
    }

    /// Grid bounds as `(height, width)`, matching `(row, col)` coordinates.
    pub const fn bounds(&self) -> Coord2 {
        (self.height, self.width)
    }

    /// Largest mine count that still fits beside the biggest possible safe zone.
    pub fn mine_capacity(&self) -> CellCount {
        let largest_safe_zone = mult(self.width.min(3), self.height.min(3));
        self.total_cells() - largest_safe_zone
    }

    pub fn contains(&self, (row, col): Coord2) -> bool {
        row < self.height && col < self.width
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if self.contains(coords) {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords(coords))
        }
    }

    /// Key that win records are stored and matched under, e.g. `"13x13 - 10 Mines"`.
    pub fn mode_descriptor(&self) -> String {
        self.to_string()
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        Difficulty::ALL
            .into_iter()
            .find(|difficulty| difficulty.config() == *self)
    }
}

impl fmt::Display for GameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} - {} Mines", self.width, self.height, self.mines)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub const fn config(self) -> GameConfig {
        match self {
            Self::Easy => GameConfig::new_unchecked(13, 13, 10),
            Self::Medium => GameConfig::new_unchecked(16, 16, 40),
            Self::Hard => GameConfig::new_unchecked(30, 16, 99),
        }
    }

    /// Display-only name; records are grouped by [`GameConfig::mode_descriptor`].
    pub const fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty {s:?}, expected easy, medium or hard"))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mine_count = mine_mask.iter().filter(|&&is_mine| is_mine).count();
        Self {
            mine_mask,
            mine_count: CellCount::try_from(mine_count).unwrap_or(CellCount::MAX),
        }
    }

    /// Builds a layout from explicit `(row, col)` positions inside `bounds` (`(height, width)`).
    pub fn from_mine_coords(bounds: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(bounds.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= bounds.0 || coords.1 >= bounds.1 {
                return Err(GameError::InvalidCoords(coords));
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn game_config(&self) -> GameConfig {
        let (height, width) = self.bounds();
        GameConfig::new_unchecked(width, height, self.mine_count)
    }

    pub fn bounds(&self) -> Coord2 {
        let (rows, cols) = self.mine_mask.dim();
        (
            Coord::try_from(rows).unwrap_or(Coord::MAX),
            Coord::try_from(cols).unwrap_or(Coord::MAX),
        )
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.iter_neighbors(coords).filter(|&pos| self[pos]).count() as u8
    }

    /// Mine positions in row-major order.
    pub fn mines(&self) -> Vec<Coord2> {
        self.mine_mask
            .indexed_iter()
            .filter(|&(_, &is_mine)| is_mine)
            .map(|((row, col), _)| (row as Coord, col as Coord))
            .collect()
    }

    pub(crate) fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.mine_mask.iter_neighbors(coords)
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, (row, col): Coord2) -> &Self::Output {
        &self.mine_mask[(row as usize, col as usize)]
    }
}

impl IndexMut<Coord2> for MineLayout {
    fn index_mut(&mut self, (row, col): Coord2) -> &mut Self::Output {
        &mut self.mine_mask[(row as usize, col as usize)]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    /// Nothing to do: the target was revealed, flagged, or an under-flagged number.
    NoChange,
    /// Newly uncovered cells in the order they were opened.
    Revealed(Vec<RevealedCell>),
    /// A mine was uncovered. `revealed` holds what a chord opened before the hit.
    HitMine {
        mine: Coord2,
        revealed: Vec<RevealedCell>,
    },
    /// A chord on a number with more flags around it than mines.
    Overflagged,
}

impl RevealOutcome {
    pub const fn has_update(&self) -> bool {
        matches!(self, Self::Revealed(_) | Self::HitMine { .. })
    }

    pub const fn is_loss(&self) -> bool {
        matches!(self, Self::HitMine { .. })
    }

    pub fn revealed_cells(&self) -> &[RevealedCell] {
        match self {
            Self::Revealed(cells) | Self::HitMine { revealed: cells, .. } => cells,
            Self::NoChange | Self::Overflagged => &[],
        }
    }
}
