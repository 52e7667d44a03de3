use crate::*;
pub use random::*;

mod random;

/// Produces the mine layout for a game once the first reveal position is known.
pub trait MinefieldGenerator {
    fn generate(&mut self, config: GameConfig, start: Coord2) -> Result<MineLayout>;
}

/// Hands out the same predetermined layout every game, for replays and fixtures.
///
/// The layout is used as-is: no safe zone is carved around `start`.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedMinefieldGenerator {
    layout: MineLayout,
}

impl FixedMinefieldGenerator {
    pub fn new(layout: MineLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &MineLayout {
        &self.layout
    }
}

impl MinefieldGenerator for FixedMinefieldGenerator {
    fn generate(&mut self, config: GameConfig, start: Coord2) -> Result<MineLayout> {
        config.validate_coords(start)?;
        if self.layout.game_config() != config {
            return Err(GameError::LayoutMismatch);
        }
        Ok(self.layout.clone())
    }
}
