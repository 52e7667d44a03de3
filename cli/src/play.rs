use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Context, Result};
use minegrid_core::*;
use web_time::Instant;

use crate::render::{render_board, render_status, render_times};

const TOP_TIMES: usize = 5;

const HELP: &str = "\
commands:
  r ROW COL   reveal a cell (on a number: chord)
  f ROW COL   toggle a flag
  c ROW COL   chord a number
  n           new game
  q           quit";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Reveal(Coord2),
    Flag(Coord2),
    Chord(Coord2),
    Restart,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let mut coords = || -> Result<Coord2, String> {
            let mut next = |name: &str| -> Result<Coord, String> {
                words
                    .next()
                    .ok_or_else(|| format!("missing {name}"))?
                    .parse::<Coord>()
                    .map_err(|err| format!("bad {name}: {err}"))
            };
            let row = next("row")?;
            let col = next("column")?;
            Ok((row, col))
        };

        match verb.to_ascii_lowercase().as_str() {
            "r" | "reveal" => coords().map(Self::Reveal),
            "f" | "flag" => coords().map(Self::Flag),
            "c" | "chord" => coords().map(Self::Chord),
            "n" | "new" => Ok(Self::Restart),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" => Ok(Self::Quit),
            other => Err(format!("unknown command {other:?}")),
        }
    }
}

/// Terminal game loop: one command per input line, board redrawn after each one.
pub struct Play {
    session: GameSession,
    store: RecordStore,
    events: Option<Rc<RefCell<Vec<GameEvent>>>>,
}

impl Play {
    pub fn new(mut session: GameSession, store: RecordStore, json_events: bool) -> Self {
        let events = json_events.then(|| {
            let events = Rc::new(RefCell::new(Vec::new()));
            let sink = events.clone();
            session.subscribe(move |event| sink.borrow_mut().push(event.clone()));
            events
        });
        Self {
            session,
            store,
            events,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "{HELP}")?;
        self.draw(out)?;

        for line in input.lines() {
            let line = line.context("Could not read command")?;
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => writeln!(out, "{HELP}")?,
                Ok(command) => {
                    self.execute(command, out)?;
                    self.flush_events(out)?;
                    self.draw(out)?;
                }
                Err(err) => writeln!(out, "{err}, type h for help")?,
            }
        }
        Ok(())
    }

    fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        log::debug!("{:?}", command);
        let phase = self.session.phase();

        let result = match command {
            Command::Reveal(coords) => match self.session.cell_at(coords) {
                Ok(EngineCell::Revealed(_)) => self.session.chord(coords).map(drop),
                _ => self.session.reveal(coords).map(drop),
            },
            Command::Flag(coords) => self.session.toggle_flag(coords).map(drop),
            Command::Chord(coords) => self.session.chord(coords).map(drop),
            Command::Restart => {
                self.session.restart();
                Ok(())
            }
            Command::Help | Command::Quit => Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(GameError::AlreadyEnded) => writeln!(out, "The game is over, n starts a new one")?,
            Err(err) => writeln!(out, "{err}")?,
        }

        if phase != self.session.phase() {
            match self.session.phase() {
                GamePhase::Won => self.on_win(out)?,
                GamePhase::Lost => writeln!(out, "Boom! You hit a mine")?,
                GamePhase::Pending | GamePhase::Active => {}
            }
        }
        Ok(())
    }

    fn on_win<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let Some(record) = self.session.winning_record() else {
            return Ok(());
        };
        writeln!(
            out,
            "You won in {}!",
            format_elapsed(record.elapsed_secs as f64)
        )?;

        // a failing store should not end the game loop
        if let Err(err) = self.store.append(&record) {
            log::error!("Could not save record to {}: {}", self.store.path().display(), err);
            writeln!(out, "Could not save your time: {err}")?;
            return Ok(());
        }

        match self.store.top_records(&record.mode, TOP_TIMES) {
            Ok(times) => write!(out, "{}", render_times(&record.mode, &times))?,
            Err(err) => log::warn!("Could not read records back: {}", err),
        }
        Ok(())
    }

    fn flush_events<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let Some(events) = &self.events else {
            return Ok(());
        };
        for event in events.borrow_mut().drain(..) {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
        Ok(())
    }

    fn draw<W: Write>(&self, out: &mut W) -> Result<()> {
        write!(
            out,
            "{}",
            render_board(
                self.session.board(),
                self.session.phase(),
                self.session.triggered_mine()
            )
        )?;
        writeln!(
            out,
            "{}",
            render_status(&self.session, self.session.elapsed_seconds(Instant::now()))
        )?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use std::time::Duration;

    fn temp_store(name: &str) -> RecordStore {
        let path = std::env::temp_dir().join(format!(
            "minegrid-cli-{}-{}.wins",
            std::process::id(),
            name
        ));
        let _ = fs::remove_file(&path);
        RecordStore::new(path)
    }

    fn session(mines: &[Coord2]) -> GameSession {
        GameSession::with_layout(MineLayout::from_mine_coords((3, 3), mines).unwrap())
    }

    fn play(play: &mut Play, script: &str) -> String {
        let mut out = Vec::new();
        play.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn status_reads_the_session_clock() {
        let mut session = session(&[(0, 0), (2, 2)]);
        let start = Instant::now();
        session.reveal_at((1, 1), start).unwrap();

        let status = render_status(
            &session,
            session.elapsed_seconds(start + Duration::from_secs(75)),
        );

        assert_eq!(status, "3x3 - 2 Mines | mines left: 2 | time: 1m 15.00s | Active");
    }

    #[test]
    fn parses_commands() {
        assert_eq!("r 1 2".parse::<Command>(), Ok(Command::Reveal((1, 2))));
        assert_eq!("  F 0 4 ".parse::<Command>(), Ok(Command::Flag((0, 4))));
        assert_eq!("chord 3 3".parse::<Command>(), Ok(Command::Chord((3, 3))));
        assert_eq!("n".parse::<Command>(), Ok(Command::Restart));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "r 1".parse::<Command>(),
            Err("missing column".to_string())
        );
        assert!("r -1 0".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
    }

    #[test]
    fn winning_stores_the_record() {
        let store = temp_store("win");
        let mut game = Play::new(session(&[(2, 2)]), store.clone(), false);

        let output = play(&mut game, "r 0 0\nq\n");

        assert!(output.contains("You won in"));
        assert!(output.contains("3x3 - 1 Mines:\n  1. "));
        assert_eq!(game.session().phase(), GamePhase::Won);
        let records = store.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mode, "3x3 - 1 Mines");
        fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn revealing_a_number_chords() {
        let store = temp_store("chord");
        let mut game = Play::new(session(&[(0, 1), (2, 1)]), store.clone(), false);

        play(&mut game, "r 1 1\nf 0 1\nf 2 1\nr 1 1\n");

        assert_eq!(game.session().phase(), GamePhase::Won);
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn losing_reports_and_blocks_moves() {
        let store = temp_store("loss");
        let mut game = Play::new(session(&[(0, 0), (2, 2)]), store.clone(), false);

        let output = play(&mut game, "r 1 1\nr 2 2\nf 0 1\n");

        assert!(output.contains("Boom!"));
        assert!(output.contains("The game is over"));
        assert_eq!(game.session().phase(), GamePhase::Lost);
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn bad_input_is_reported() {
        let mut game = Play::new(session(&[(2, 2)]), temp_store("bad-input"), false);

        let output = play(&mut game, "x\nr 7 7\n");

        assert!(output.contains("unknown command \"x\""));
        assert!(output.contains("(7, 7)"));
        assert_eq!(game.session().phase(), GamePhase::Pending);
    }

    #[test]
    fn json_events_are_streamed() {
        let store = temp_store("json");
        let mut game = Play::new(session(&[(2, 2)]), store.clone(), true);

        let output = play(&mut game, "r 1 1\n");

        assert!(output.contains(r#"{"event":"phase_changed","phase":"Active"}"#));
        assert!(output.contains(r#""event":"cells_revealed""#));
        let _ = fs::remove_file(store.path());
    }
}
