use std::collections::VecDeque;

use crate::*;

/// Uncovers `coords`, flooding outward through zero-count cells.
///
/// Revealed and flagged targets are left untouched. Hitting a mine does not change the
/// board; the caller decides how to end the game.
pub fn reveal(board: &mut Board, coords: Coord2) -> Result<RevealOutcome> {
    let coords = board.validate_coords(coords)?;
    if !board.has_mines() {
        return Err(GameError::MinesNotPlaced);
    }

    if board.cell_at(coords) != EngineCell::Hidden {
        return Ok(RevealOutcome::NoChange);
    }

    if board.contains_mine(coords) {
        log::debug!("Mine hit at {:?}", coords);
        return Ok(RevealOutcome::HitMine {
            mine: coords,
            revealed: Vec::new(),
        });
    }

    Ok(RevealOutcome::Revealed(flood_fill(board, coords)))
}

/// Opens every unflagged neighbor of a revealed number once enough flags surround it.
///
/// Neighbors are opened in row-major order; the first mine stops the chord and the
/// remaining neighbors stay hidden.
pub fn chord(board: &mut Board, coords: Coord2) -> Result<RevealOutcome> {
    let coords = board.validate_coords(coords)?;

    let EngineCell::Revealed(adjacent_mines) = board.cell_at(coords) else {
        return Ok(RevealOutcome::NoChange);
    };

    let adjacent_flags = board.adjacent_flag_count(coords);
    if adjacent_flags > adjacent_mines {
        return Ok(RevealOutcome::Overflagged);
    }
    if adjacent_flags < adjacent_mines {
        return Ok(RevealOutcome::NoChange);
    }

    let mut opened = Vec::new();
    for neighbor in board.neighbors(coords) {
        if board.cell_at(neighbor) != EngineCell::Hidden {
            continue;
        }

        match reveal(board, neighbor)? {
            RevealOutcome::Revealed(cells) => opened.extend(cells),
            RevealOutcome::HitMine { mine, .. } => {
                return Ok(RevealOutcome::HitMine {
                    mine,
                    revealed: opened,
                });
            }
            RevealOutcome::NoChange | RevealOutcome::Overflagged => {}
        }
    }

    Ok(if opened.is_empty() {
        RevealOutcome::NoChange
    } else {
        RevealOutcome::Revealed(opened)
    })
}

/// Hidden, unflagged neighbors of `coords`: what a chord would open.
pub fn chord_candidates(board: &Board, coords: Coord2) -> Vec<Coord2> {
    board
        .neighbors(coords)
        .filter(|&pos| board.cell_at(pos) == EngineCell::Hidden)
        .collect()
}

/// Breadth-first reveal from a known-safe `start`.
///
/// A cell may be queued from several directions; the hidden check on dequeue makes sure
/// it is only opened once.
fn flood_fill(board: &mut Board, start: Coord2) -> Vec<RevealedCell> {
    let mut opened = Vec::new();
    let mut to_visit = VecDeque::from([start]);

    while let Some(visit_coords) = to_visit.pop_front() {
        if board.cell_at(visit_coords) != EngineCell::Hidden {
            continue;
        }

        let adjacent_mines = board.adjacent_mine_count(visit_coords);
        board.mark_revealed(visit_coords, adjacent_mines);
        opened.push(RevealedCell {
            coords: visit_coords,
            adjacent_mines,
        });
        log::trace!(
            "Opened {:?}, adjacent mines: {}",
            visit_coords,
            adjacent_mines
        );

        // numbered cells border the region and are not expanded
        if adjacent_mines == 0 {
            to_visit.extend(
                board
                    .neighbors(visit_coords)
                    .filter(|&pos| board.cell_at(pos) == EngineCell::Hidden),
            );
        }
    }

    opened
}
