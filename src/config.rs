//! Configuration loading.
//!
//! Precedence, highest first:
//! 1. Environment variables (`VOCAB_REVIEW_DB`, `VOCAB_REVIEW_USER`, `VOCAB_REVIEW_MAX_CARDS`)
//! 2. Config file (`--config`, else `$VOCAB_REVIEW_HOME/config.toml`,
//!    else `~/.vocab-review/config.toml`)
//! 3. Defaults
//!
//! Every section is optional. Invalid environment values are logged and ignored.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ReviewError};
use crate::models::review_state::LEARNED_THRESHOLD_DAYS;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
    pub stats: StatsConfig,
    pub storage: StorageConfig,
}

/// Tuning constants of the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval (days) given to a fresh word on its first successful grade.
    pub first_interval: f64,
    /// Interval ceiling after a Forgot grade.
    pub relearn_interval: f64,
    pub forgot_ease_penalty: f64,
    pub struggled_multiplier: f64,
    pub struggled_ease_penalty: f64,
    pub perfect_ease_bonus: f64,
    pub learned_threshold: f64,
    pub maximum_interval: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            first_interval: 1.0,
            relearn_interval: 1.0,
            forgot_ease_penalty: 0.2,
            struggled_multiplier: 1.2,
            struggled_ease_penalty: 0.15,
            perfect_ease_bonus: 0.1,
            learned_threshold: LEARNED_THRESHOLD_DAYS,
            maximum_interval: 36500.0,
        }
    }
}

impl SchedulerConfig {
    /// Rejects values that would let a schedule break the state invariants.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("first_interval", self.first_interval),
            ("relearn_interval", self.relearn_interval),
            ("forgot_ease_penalty", self.forgot_ease_penalty),
            ("struggled_multiplier", self.struggled_multiplier),
            ("struggled_ease_penalty", self.struggled_ease_penalty),
            ("perfect_ease_bonus", self.perfect_ease_bonus),
            ("learned_threshold", self.learned_threshold),
            ("maximum_interval", self.maximum_interval),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ReviewError::config(format!(
                    "scheduler.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.first_interval <= 0.0 {
            return Err(ReviewError::config("scheduler.first_interval must be positive"));
        }
        if self.struggled_multiplier < 1.0 {
            return Err(ReviewError::config(format!(
                "scheduler.struggled_multiplier must be at least 1.0, got {}",
                self.struggled_multiplier
            )));
        }
        if self.maximum_interval < self.first_interval {
            return Err(ReviewError::config(
                "scheduler.maximum_interval must not be below first_interval",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Show words graded below Remembered again in a later round.
    pub retry_forgotten: bool,
    /// Cap on the session queue. `None` reviews every due word.
    pub max_cards: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_forgotten: true,
            max_cards: Some(50),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    /// Fixed UTC offset used for calendar days in streaks.
    pub utc_offset_minutes: i32,
}

impl StatsConfig {
    pub fn is_valid_offset(minutes: i32) -> bool {
        (-14 * 60..=14 * 60).contains(&minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub user_id: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("vocab_review.sqlite3"),
            user_id: "default".to_string(),
        }
    }
}

impl Config {
    /// Loads defaults, then the config file if it exists, then environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| app_home().map(|home| home.join("config.toml")));

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if explicit_path.is_some() => {
                return Err(ReviewError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok());
        config.scheduler.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReviewError::storage(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ReviewError::config(e.to_string()))?;
        config.scheduler.validate()?;
        if !StatsConfig::is_valid_offset(config.stats.utc_offset_minutes) {
            return Err(ReviewError::config(format!(
                "stats.utc_offset_minutes out of range: {}",
                config.stats.utc_offset_minutes
            )));
        }
        Ok(config)
    }

    /// Applies overrides read through `lookup` (the process environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("VOCAB_REVIEW_DB") {
            if val.is_empty() {
                tracing::warn!(
                    "VOCAB_REVIEW_DB is empty, keeping {}",
                    self.storage.database_path.display()
                );
            } else {
                self.storage.database_path = PathBuf::from(val);
            }
        }

        if let Some(val) = lookup("VOCAB_REVIEW_USER") {
            if val.trim().is_empty() {
                tracing::warn!("VOCAB_REVIEW_USER is empty, keeping '{}'", self.storage.user_id);
            } else {
                self.storage.user_id = val.trim().to_string();
            }
        }

        if let Some(val) = lookup("VOCAB_REVIEW_MAX_CARDS") {
            match val.parse::<usize>() {
                Ok(0) => self.session.max_cards = None,
                Ok(n) => self.session.max_cards = Some(n),
                Err(_) => tracing::warn!(
                    "Invalid VOCAB_REVIEW_MAX_CARDS value '{}'. Expected a non-negative integer.",
                    val
                ),
            }
        }
    }
}

/// Directory holding the user config: `$VOCAB_REVIEW_HOME`, else `~/.vocab-review`.
pub fn app_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("VOCAB_REVIEW_HOME") {
        if home.is_empty() {
            tracing::warn!("VOCAB_REVIEW_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }
    dirs::home_dir().map(|home| home.join(".vocab-review"))
}
