use thiserror::Error;

use crate::{CellCount, Coord2};

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates {0:?}")]
    InvalidCoords(Coord2),
    #[error("Board must be at least 1x1")]
    EmptyBoard,
    #[error("Mine count must be positive")]
    NoMines,
    #[error("Too many mines: requested {requested} but only {capacity} fit outside the safe zone")]
    TooManyMines {
        requested: CellCount,
        capacity: CellCount,
    },
    #[error("Mines were already placed on this board")]
    MinesAlreadyPlaced,
    #[error("Mines have not been placed on this board yet")]
    MinesNotPlaced,
    #[error("Mine layout does not match the board configuration")]
    LayoutMismatch,
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
}

pub type Result<T> = core::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record store I/O failed")]
    Io(#[from] std::io::Error),
    #[error("Mode descriptor is {0} bytes, longer than a record can hold")]
    DescriptorTooLong(usize),
    #[error("Elapsed time {0} is not a valid record")]
    InvalidElapsed(f32),
}
