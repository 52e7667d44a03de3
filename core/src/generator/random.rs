use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::*;

/// Uniformly random placement that keeps the clipped 3×3 around the start cell mine-free.
#[derive(Clone, Debug)]
pub struct RandomMinefieldGenerator<R = SmallRng> {
    rng: R,
}

impl RandomMinefieldGenerator<SmallRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }
}

impl<R: Rng> RandomMinefieldGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> MinefieldGenerator for RandomMinefieldGenerator<R> {
    fn generate(&mut self, config: GameConfig, start: Coord2) -> Result<MineLayout> {
        let start = config.validate_coords(start)?;
        let bounds = config.bounds();

        let mut safe_zone: Array2<bool> = Array2::default(bounds.to_nd_index());
        let mut safe_zone_size: CellCount = 0;
        for pos in iter_neighborhood(start, bounds) {
            safe_zone[pos.to_nd_index()] = true;
            safe_zone_size += 1;
        }

        let capacity = config.total_cells() - safe_zone_size;
        if config.mines > capacity {
            return Err(GameError::TooManyMines {
                requested: config.mines,
                capacity,
            });
        }

        let mines = if config.mines > capacity / 2 {
            self.place_by_free_index(config, safe_zone, capacity)
        } else {
            self.place_by_rejection(config, &safe_zone)
        };

        let layout = MineLayout::from_mine_mask(mines);
        log::debug!(
            "Placed {} mines on {}x{} avoiding {} cells around {:?}",
            layout.mine_count(),
            config.width,
            config.height,
            safe_zone_size,
            start
        );
        Ok(layout)
    }
}

impl<R: Rng> RandomMinefieldGenerator<R> {
    /// Samples cells until enough land outside the safe zone and off existing mines.
    fn place_by_rejection(&mut self, config: GameConfig, safe_zone: &Array2<bool>) -> Array2<bool> {
        let mut mines: Array2<bool> = Array2::default(config.bounds().to_nd_index());
        let mut mines_placed: CellCount = 0;

        while mines_placed < config.mines {
            let pos: Coord2 = (
                self.rng.random_range(0..config.height),
                self.rng.random_range(0..config.width),
            );
            if safe_zone[pos.to_nd_index()] || mines[pos.to_nd_index()] {
                continue;
            }
            mines[pos.to_nd_index()] = true;
            mines_placed += 1;
        }

        mines
    }

    /// Dense boards pick the n-th still free cell directly so every draw places a mine.
    fn place_by_free_index(
        &mut self,
        config: GameConfig,
        mut taken: Array2<bool>,
        mut free_cells: CellCount,
    ) -> Array2<bool> {
        let mut mines: Array2<bool> = Array2::default(config.bounds().to_nd_index());

        for _ in 0..config.mines {
            let mut remaining = self.rng.random_range(0..free_cells);
            let free = taken
                .indexed_iter_mut()
                .filter(|(_, cell)| !**cell)
                .find(|_| {
                    let found = remaining == 0;
                    remaining = remaining.saturating_sub(1);
                    found
                });
            if let Some((index, cell)) = free {
                *cell = true;
                mines[index] = true;
                free_cells -= 1;
            }
        }

        mines
    }
}
