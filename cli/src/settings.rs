use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use minegrid_core::*;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "minegrid.toml";

/// Optional settings file, e.g.
///
/// ```toml
/// records_path = "/home/me/.minegrid.wins"
/// difficulty = "medium"
/// json_events = false
///
/// [custom]
/// width = 20
/// height = 12
/// mines = 35
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub records_path: Option<PathBuf>,
    pub difficulty: Option<Difficulty>,
    pub custom: Option<CustomSize>,
    pub json_events: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CustomSize {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
}

impl Settings {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid settings")
    }

    /// Loads `path` when given, otherwise `minegrid.toml` in the working directory if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_SETTINGS_FILE), false),
        };

        if !required && !path.exists() {
            log::debug!("No settings file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read settings from {}", path.display()))?;
        let settings = Self::parse(&text)
            .with_context(|| format!("Could not load settings from {}", path.display()))?;
        log::debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }
}

/// Options shared by every subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct GameArgs {
    /// Preset to play (easy, medium, hard)
    #[arg(short, long)]
    pub difficulty: Option<Difficulty>,

    /// Custom board width
    #[arg(long, requires_all = ["height", "mines"], conflicts_with = "difficulty")]
    pub width: Option<Coord>,

    /// Custom board height
    #[arg(long, requires_all = ["width", "mines"], conflicts_with = "difficulty")]
    pub height: Option<Coord>,

    /// Custom mine count
    #[arg(long, requires_all = ["width", "height"], conflicts_with = "difficulty")]
    pub mines: Option<CellCount>,

    /// Where winning times are stored
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Settings file (defaults to ./minegrid.toml when it exists)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl GameArgs {
    /// Command-line flags first, then the settings file, then the Easy preset.
    pub fn game_config(&self, settings: &Settings) -> Result<GameConfig> {
        if let (Some(width), Some(height), Some(mines)) = (self.width, self.height, self.mines) {
            return GameConfig::new(width, height, mines)
                .with_context(|| format!("Invalid board {width}x{height} with {mines} mines"));
        }
        if let Some(difficulty) = self.difficulty {
            return Ok(difficulty.config());
        }
        if let Some(CustomSize {
            width,
            height,
            mines,
        }) = settings.custom
        {
            return GameConfig::new(width, height, mines)
                .with_context(|| format!("Invalid custom board {width}x{height} with {mines} mines"));
        }
        Ok(settings.difficulty.unwrap_or_default().config())
    }

    pub fn record_store(&self, settings: &Settings) -> RecordStore {
        let path = self
            .records
            .clone()
            .or_else(|| settings.records_path.clone())
            .unwrap_or_else(|| PathBuf::from(RecordStore::DEFAULT_FILE_NAME));
        RecordStore::new(path)
    }
}
