//! Per-user scheduling state of a word.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::WordId;
use crate::error::{Result, ReviewError};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Interval (days) from which a word counts as learned.
pub const LEARNED_THRESHOLD_DAYS: f64 = 7.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    #[default]
    Learning,
    Learned,
    Archived,
}

impl WordStatus {
    /// Status implied by an interval alone.
    pub fn derive(interval: f64, learned_threshold: f64) -> Self {
        if interval >= learned_threshold {
            WordStatus::Learned
        } else {
            WordStatus::Learning
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WordStatus::Learning => "learning",
            WordStatus::Learned => "learned",
            WordStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for WordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WordStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "learning" => Ok(WordStatus::Learning),
            "learned" => Ok(WordStatus::Learned),
            "archived" => Ok(WordStatus::Archived),
            other => Err(ReviewError::invalid_state(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub word_id: WordId,
    /// Days until the next review. Zero for words never recalled successfully.
    pub interval: f64,
    pub ease_factor: f64,
    pub review_count: u32,
    pub next_review_date: Option<DateTime<Utc>>,
    pub last_review_date: Option<DateTime<Utc>>,
    pub status: WordStatus,
}

impl ReviewState {
    /// State of a word that just became trackable.
    pub fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            interval: 0.0,
            ease_factor: DEFAULT_EASE_FACTOR,
            review_count: 0,
            next_review_date: None,
            last_review_date: None,
            status: WordStatus::Learning,
        }
    }

    pub fn is_new(&self) -> bool {
        self.next_review_date.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.status == WordStatus::Archived
    }

    /// Checks the interval and ease invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.interval.is_finite() || self.interval < 0.0 {
            return Err(ReviewError::invalid_state(format!(
                "word {}: interval must be a non-negative number, got {}",
                self.word_id, self.interval
            )));
        }
        if !self.ease_factor.is_finite() || self.ease_factor < MIN_EASE_FACTOR {
            return Err(ReviewError::invalid_state(format!(
                "word {}: ease factor must be at least {}, got {}",
                self.word_id, MIN_EASE_FACTOR, self.ease_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ReviewState::new(WordId(3));
        assert_eq!(state.interval, 0.0);
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.review_count, 0);
        assert!(state.is_new());
        assert_eq!(state.status, WordStatus::Learning);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_interval() {
        let mut state = ReviewState::new(WordId(1));
        state.interval = -0.5;
        assert!(matches!(
            state.validate(),
            Err(ReviewError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_low_ease() {
        let mut state = ReviewState::new(WordId(1));
        state.ease_factor = 1.29;
        assert!(state.validate().is_err());

        state.ease_factor = f64::NAN;
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_status_derive_threshold() {
        assert_eq!(WordStatus::derive(6.99, 7.0), WordStatus::Learning);
        assert_eq!(WordStatus::derive(7.0, 7.0), WordStatus::Learned);
        assert_eq!(WordStatus::derive(0.0, 7.0), WordStatus::Learning);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("learned".parse::<WordStatus>().unwrap(), WordStatus::Learned);
        assert!("mastered".parse::<WordStatus>().is_err());
        assert_eq!(WordStatus::Archived.to_string(), "archived");
    }
}
