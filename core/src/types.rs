use ndarray::Array2;

/// Single coordinate axis used for board width, height, and positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(row, col)`.
///
/// Grid bounds use the same shape: `(height, width)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

/// Cell count of an `a` by `b` grid.
pub const fn mult(a: Coord, b: Coord) -> CellCount {
    (a as CellCount).saturating_mul(b as CellCount)
}

/// Neighbor lookup for any grid stored as an `Array2`.
pub trait NeighborIterExt {
    fn iter_neighbors(&self, center: Coord2) -> NeighborIter;
}

impl<T> NeighborIterExt for Array2<T> {
    fn iter_neighbors(&self, center: Coord2) -> NeighborIter {
        let (rows, cols) = self.dim();
        let clamp = |len: usize| Coord::try_from(len).unwrap_or(Coord::MAX);
        NeighborIter::new(center, (clamp(rows), clamp(cols)))
    }
}

/// The up-to-eight in-bounds cells around `center`, excluding `center` itself.
///
/// Cells come out in row-major order, so a caller that stops early (a chord running into a
/// mine) always stops at the same cell.
#[derive(Debug, Clone)]
pub struct NeighborIter {
    center: Coord2,
    bounds: Coord2,
    // position in the 3x3 scan, 0..9, with 4 being the center
    step: u8,
}

impl NeighborIter {
    const CENTER_STEP: u8 = 4;
    const LAST_STEP: u8 = 9;

    pub fn new(center: Coord2, bounds: Coord2) -> Self {
        Self {
            center,
            bounds,
            step: 0,
        }
    }

    fn offset(center: Coord, delta: u8, limit: Coord) -> Option<Coord> {
        let moved = center.checked_add(delta)?.checked_sub(1)?;
        (moved < limit).then_some(moved)
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        while self.step < Self::LAST_STEP {
            let step = self.step;
            self.step += 1;
            if step == Self::CENTER_STEP {
                continue;
            }

            let (row, col) = self.center;
            let (rows, cols) = self.bounds;
            let Some(row) = Self::offset(row, step / 3, rows) else {
                continue;
            };
            let Some(col) = Self::offset(col, step % 3, cols) else {
                continue;
            };
            return Some((row, col));
        }
        None
    }
}

/// The clipped 3x3 block centered on `center`, the center included.
pub fn iter_neighborhood(center: Coord2, bounds: Coord2) -> impl Iterator<Item = Coord2> {
    core::iter::once(center).chain(NeighborIter::new(center, bounds))
}
