//! Spaced repetition scheduler.
//!
//! An SM-2 style variant driven by four review buttons instead of SM-2's 0-5 scale:
//! - Forgot: interval drops to the relearn floor, ease shrinks
//! - Struggled: interval grows slowly, ease shrinks a little
//! - Remembered: interval is multiplied by the ease factor
//! - Perfect: ease grows, then the interval is multiplied by it
//!
//! The first successful grade of a fresh word (interval 0) always moves it to the
//! initial step. Ease never falls below 1.3 and status is recomputed from the interval
//! after every grade.

use super::{Grade, MIN_EASE_FACTOR, ReviewState, WordStatus};
use crate::config::SchedulerConfig;
use crate::error::{Result, ReviewError};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Stateless scheduler holding only its tuning constants.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Computes the state that follows `grade` given at `now`.
    pub fn schedule(
        &self,
        state: &ReviewState,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        state.validate()?;
        let cfg = &self.config;
        let prev = state.interval;

        let (ease, interval) = match grade {
            Grade::Forgot => (
                state.ease_factor - cfg.forgot_ease_penalty,
                prev.min(cfg.relearn_interval),
            ),
            Grade::Struggled => (
                state.ease_factor - cfg.struggled_ease_penalty,
                self.grow(prev, cfg.struggled_multiplier),
            ),
            Grade::Remembered => (state.ease_factor, self.grow(prev, state.ease_factor)),
            Grade::Perfect => {
                let ease = state.ease_factor + cfg.perfect_ease_bonus;
                (ease, self.grow(prev, ease.max(MIN_EASE_FACTOR)))
            }
        };
        let ease = ease.max(MIN_EASE_FACTOR);
        let interval = interval.clamp(0.0, cfg.maximum_interval);

        let offset = Duration::seconds((interval * SECONDS_PER_DAY).round() as i64);
        let next_review_date = now.checked_add_signed(offset).ok_or_else(|| {
            ReviewError::invalid_state(format!(
                "word {}: next review date overflows ({now} + {interval} days)",
                state.word_id
            ))
        })?;

        let status = if state.is_archived() {
            WordStatus::Archived
        } else {
            WordStatus::derive(interval, cfg.learned_threshold)
        };

        let next = ReviewState {
            word_id: state.word_id,
            interval,
            ease_factor: ease,
            review_count: state.review_count.saturating_add(1),
            next_review_date: Some(next_review_date),
            last_review_date: Some(now),
            status,
        };
        next.validate()?;

        debug!(
            word_id = %next.word_id,
            %grade,
            interval = next.interval,
            ease_factor = next.ease_factor,
            status = %next.status,
            "scheduled word"
        );
        Ok(next)
    }

    fn grow(&self, prev: f64, multiplier: f64) -> f64 {
        if prev == 0.0 {
            self.config.first_interval
        } else {
            prev * multiplier
        }
    }
}

/// Schedules with the default tuning constants.
pub fn schedule(state: &ReviewState, grade: Grade, now: DateTime<Utc>) -> Result<ReviewState> {
    Scheduler::default().schedule(state, grade, now)
}
