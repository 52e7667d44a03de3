use std::fmt::Write;
use std::path::Path;

use minegrid_core::*;

const HIDDEN: char = '#';
const FLAG: char = 'F';
const EMPTY: char = '.';
const MINE: char = '*';
const TRIGGERED: char = 'X';
const WRONG_FLAG: char = 'x';

fn cell_char(board: &Board, coords: Coord2, phase: GamePhase, triggered: Option<Coord2>) -> char {
    let cell = board.cell_at(coords);
    if phase == GamePhase::Lost {
        if triggered == Some(coords) {
            return TRIGGERED;
        }
        match cell {
            EngineCell::Flagged if !board.contains_mine(coords) => return WRONG_FLAG,
            EngineCell::Hidden if board.contains_mine(coords) => return MINE,
            _ => {}
        }
    }

    match cell {
        EngineCell::Hidden => HIDDEN,
        EngineCell::Flagged => FLAG,
        EngineCell::Revealed(0) => EMPTY,
        EngineCell::Revealed(n) => char::from_digit(n as u32, 10).unwrap_or('?'),
    }
}

/// Draws the grid with row and column indices; mines are only shown once the game is lost.
pub fn render_board(board: &Board, phase: GamePhase, triggered: Option<Coord2>) -> String {
    let (height, width) = board.bounds();
    let mut out = String::new();

    out.push_str("    ");
    for col in 0..width {
        let _ = write!(out, "{:>3}", col);
    }
    out.push('\n');

    for row in 0..height {
        let _ = write!(out, "{:>3} ", row);
        for col in 0..width {
            let _ = write!(out, "{:>3}", cell_char(board, (row, col), phase, triggered));
        }
        out.push('\n');
    }
    out
}

pub fn render_status(session: &GameSession, elapsed_secs: f64) -> String {
    format!(
        "{} | mines left: {} | time: {} | {:?}",
        session.mode_descriptor(),
        session.mines_left(),
        format_elapsed(elapsed_secs),
        session.phase()
    )
}

pub fn render_times(mode: &str, times: &[f32]) -> String {
    let mut out = format!("{mode}:\n");
    if times.is_empty() {
        out.push_str("  no record\n");
    }
    for (rank, time) in times.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", rank + 1, format_elapsed(*time as f64));
    }
    out
}

/// Times for one mode, or for every preset when `mode` is `None`, with a note when the
/// record file had to be partly ignored.
pub fn render_records(log: &RecordLog, path: &Path, mode: Option<&str>, limit: usize) -> String {
    let mut out = String::new();
    if log.is_damaged() {
        let _ = writeln!(
            out,
            "warning: {} is damaged, ignored {} unreadable entries and {} trailing bytes",
            path.display(),
            log.skipped,
            log.truncated_bytes
        );
    }

    match mode {
        Some(mode) => out.push_str(&render_times(mode, &log.top_times(mode, limit))),
        None => {
            for entry in log.leaderboard(limit) {
                out.push_str(entry.difficulty.label());
                out.push(' ');
                out.push_str(&render_times(&entry.mode, &entry.times));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(rendered: &str) -> Vec<String> {
        rendered
            .lines()
            .skip(1)
            .map(|line| line.split_whitespace().skip(1).collect())
            .collect()
    }

    #[test]
    fn hides_mines_while_playing() {
        let mut board = Board::with_layout(MineLayout::from_mine_coords((3, 3), &[(2, 2)]).unwrap());
        reveal(&mut board, (1, 1)).unwrap();
        board.toggle_flag((2, 2)).unwrap();

        let rendered = render_board(&board, GamePhase::Active, None);

        assert!(rendered.starts_with("      0  1  2\n"));
        assert_eq!(rows(&rendered), vec!["###", "#1#", "##F"]);
    }

    #[test]
    fn exposes_mines_and_wrong_flags_after_loss() {
        let mut board =
            Board::with_layout(MineLayout::from_mine_coords((3, 3), &[(0, 0), (2, 2)]).unwrap());
        reveal(&mut board, (0, 2)).unwrap();
        board.toggle_flag((1, 0)).unwrap();

        let rendered = render_board(&board, GamePhase::Lost, Some((2, 2)));

        assert_eq!(rows(&rendered), vec!["*1.", "x21", "##X"]);
    }

    #[test]
    fn zero_cells_render_as_dots() {
        let mut board = Board::with_layout(MineLayout::from_mine_coords((3, 3), &[(2, 2)]).unwrap());
        reveal(&mut board, (0, 0)).unwrap();

        let rendered = render_board(&board, GamePhase::Won, None);

        assert_eq!(rows(&rendered), vec!["...", ".11", ".1#"]);
    }

    #[test]
    fn lists_times_or_placeholder() {
        assert_eq!(
            render_times("13x13 - 10 Mines", &[]),
            "13x13 - 10 Mines:\n  no record\n"
        );
        assert_eq!(
            render_times("13x13 - 10 Mines", &[5.0, 75.25]),
            "13x13 - 10 Mines:\n  1. 5.00s\n  2. 1m 15.25s\n"
        );
    }

    #[test]
    fn records_report_warns_about_damage() {
        let log = RecordLog {
            records: vec![Record::new("13x13 - 10 Mines", 12.5)],
            skipped: 1,
            truncated_bytes: 7,
        };

        let report = render_records(&log, Path::new("scores.wins"), Some("13x13 - 10 Mines"), 5);

        assert_eq!(
            report,
            "warning: scores.wins is damaged, ignored 1 unreadable entries and 7 trailing bytes\n\
             13x13 - 10 Mines:\n  1. 12.50s\n"
        );
    }

    #[test]
    fn records_report_lists_every_preset() {
        let log = RecordLog {
            records: vec![Record::new("16x16 - 40 Mines", 30.0)],
            ..RecordLog::default()
        };

        let report = render_records(&log, Path::new("scores.wins"), None, 5);

        assert!(!report.contains("warning"));
        assert_eq!(
            report,
            "Easy 13x13 - 10 Mines:\n  no record\n\
             Medium 16x16 - 40 Mines:\n  1. 30.00s\n\
             Hard 30x16 - 99 Mines:\n  no record\n"
        );
    }
}
