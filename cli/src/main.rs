use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minegrid_core::*;
use tracing::level_filters::LevelFilter;

use crate::play::Play;
use crate::render::render_records;
use crate::settings::{GameArgs, Settings};

mod play;
mod render;
mod settings;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a game on the terminal
    Play {
        #[command(flatten)]
        game: GameArgs,

        /// Force a seed instead of random
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print every game event as a JSON line
        #[arg(long)]
        json_events: bool,
    },
    /// Show the best times
    Records {
        #[command(flatten)]
        game: GameArgs,

        /// Only show this mode, e.g. "13x13 - 10 Mines"
        #[arg(long)]
        mode: Option<String>,

        /// How many times to list per mode
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },
}

fn tracing_level(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // log records from minegrid-core are forwarded into the subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing_level(args.verbose.log_level_filter()))
        .with_writer(io::stderr)
        .init();

    match args.command {
        Command::Play {
            game,
            seed,
            json_events,
        } => {
            let settings = Settings::load(game.config.as_deref())?;
            let config = game.game_config(&settings)?;
            let store = game.record_store(&settings);
            log::debug!("seed: {:?}", seed);

            let session = match seed {
                Some(seed) => GameSession::with_seed(config, seed),
                None => GameSession::with_config(config),
            }
            .context("Could not start the game")?;

            let mut play = Play::new(session, store, json_events || settings.json_events);
            play.run(io::stdin().lock(), &mut io::stdout().lock())
        }
        Command::Records { game, mode, limit } => {
            let settings = Settings::load(game.config.as_deref())?;
            let store = game.record_store(&settings);

            let log = store
                .load()
                .with_context(|| format!("Could not read {}", store.path().display()))?;
            let out = render_records(&log, store.path(), mode.as_deref(), limit);
            print!("{out}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_play_options() {
        let args = Args::try_parse_from([
            "minegrid", "-v", "play", "--width", "20", "--height", "10", "--mines", "30", "-s",
            "7",
        ])
        .unwrap();

        assert_eq!(args.verbose.log_level_filter(), log::LevelFilter::Warn);
        let Command::Play { game, seed, .. } = args.command else {
            panic!("expected play");
        };
        assert_eq!(seed, Some(7));
        assert_eq!(
            game.game_config(&Settings::default()).unwrap(),
            GameConfig::new_unchecked(20, 10, 30)
        );
    }

    #[test]
    fn custom_size_needs_all_three_values() {
        assert!(Args::try_parse_from(["minegrid", "play", "--width", "20"]).is_err());
        assert!(
            Args::try_parse_from([
                "minegrid", "play", "-d", "hard", "--width", "9", "--height", "9", "--mines", "10",
            ])
            .is_err()
        );
    }

    #[test]
    fn parses_records_options() {
        let args =
            Args::try_parse_from(["minegrid", "records", "--mode", "16x16 - 40 Mines", "-n", "3"])
                .unwrap();

        let Command::Records { mode, limit, .. } = args.command else {
            panic!("expected records");
        };
        assert_eq!(mode.as_deref(), Some("16x16 - 40 Mines"));
        assert_eq!(limit, 3);
    }

    #[test]
    fn maps_log_levels() {
        assert_eq!(tracing_level(log::LevelFilter::Off), LevelFilter::OFF);
        assert_eq!(tracing_level(log::LevelFilter::Debug), LevelFilter::DEBUG);
    }
}
