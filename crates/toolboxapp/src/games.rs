//! # Game State
//!
//! Per-game settings and statistics live in the flat-key store, one key each.
//! The set of games is closed: [`Game`] maps every variant to its keys through
//! an explicit `match`, so there is no key built from a runtime game-name
//! string anywhere.
//!
//! Older releases stored game state under un-namespaced prefixes
//! (`snake-highScore`, `minesweeper-stats`, ...). [`Game::legacy_prefix`]
//! names them so migration can back them up.

use crate::clock::Clock;
use crate::error::Result;
use crate::model::FlatKeys;
use crate::store::flat::FlatStore;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Snake,
    Tetris,
    #[serde(rename = "2048")]
    Merge2048,
    Minesweeper,
}

impl Game {
    pub const ALL: [Game; 4] = [Game::Snake, Game::Tetris, Game::Merge2048, Game::Minesweeper];

    pub fn slug(self) -> &'static str {
        match self {
            Game::Snake => "snake",
            Game::Tetris => "tetris",
            Game::Merge2048 => "2048",
            Game::Minesweeper => "minesweeper",
        }
    }

    pub fn legacy_prefix(self) -> &'static str {
        match self {
            Game::Snake => "snake-",
            Game::Tetris => "tetris-",
            Game::Merge2048 => "game2048-",
            Game::Minesweeper => "minesweeper-",
        }
    }

    /// The game whose legacy prefix `key` carries, if any.
    pub fn from_legacy_key(key: &str) -> Option<Game> {
        Game::ALL
            .into_iter()
            .find(|game| key.starts_with(game.legacy_prefix()))
    }

    pub fn settings_key(self, keys: &FlatKeys) -> String {
        format!("{}game-{}-settings", keys.namespace, self.slug())
    }

    pub fn stats_key(self, keys: &FlatKeys) -> String {
        format!("{}game-{}-stats", keys.namespace, self.slug())
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Game {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Game::ALL
            .into_iter()
            .find(|game| game.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown game '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    pub sound_enabled: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            sound_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStats {
    pub games_played: u32,
    pub games_won: u32,
    pub best_score: u64,
    pub total_score: u64,
    pub last_played: i64,
}

impl GameStats {
    pub fn average_score(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.total_score as f64 / f64::from(self.games_played)
        }
    }
}

pub struct GameStore<F: FlatStore> {
    flat: Rc<F>,
    keys: FlatKeys,
    clock: Rc<dyn Clock>,
}

impl<F: FlatStore> GameStore<F> {
    pub fn new(flat: Rc<F>, keys: FlatKeys, clock: Rc<dyn Clock>) -> Self {
        Self { flat, keys, clock }
    }

    pub fn settings(&self, game: Game) -> Result<GameSettings> {
        self.read_or_default(&game.settings_key(&self.keys))
    }

    pub fn save_settings(&self, game: Game, settings: &GameSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.flat.set_item(&game.settings_key(&self.keys), &json)
    }

    pub fn stats(&self, game: Game) -> Result<GameStats> {
        self.read_or_default(&game.stats_key(&self.keys))
    }

    /// Fold one finished game into the stats and persist them.
    pub fn record_result(&self, game: Game, score: u64, won: bool) -> Result<GameStats> {
        let mut stats = self.stats(game)?;
        stats.games_played += 1;
        if won {
            stats.games_won += 1;
        }
        stats.total_score += score;
        stats.best_score = stats.best_score.max(score);
        stats.last_played = self.clock.now_ms();

        let json = serde_json::to_string(&stats)?;
        self.flat.set_item(&game.stats_key(&self.keys), &json)?;
        Ok(stats)
    }

    pub fn reset_stats(&self, game: Game) -> Result<()> {
        self.flat.remove_item(&game.stats_key(&self.keys))
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.flat.get_item(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Malformed game state at '{}', using defaults: {}", key, e);
                Ok(T::default())
            }
        }
    }
}
