//! Streak and weekly statistics over the review-event log.
//!
//! Events whose timestamp cannot be represented are skipped with a warning so one
//! corrupt row never hides the rest of a user's history.

use super::ReviewEvent;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub this_week: u32,
    pub last_week: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub reviews: u32,
}

/// Aggregates events using calendar days of a fixed UTC offset.
#[derive(Clone, Copy, Debug)]
pub struct StatsAggregator {
    offset: FixedOffset,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::utc()
    }
}

impl StatsAggregator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Builds an aggregator from an offset in minutes, falling back to UTC when out of range.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => Self::new(offset),
            None => {
                warn!("utc offset of {} minutes is out of range, using UTC", minutes);
                Self::utc()
            }
        }
    }

    fn timestamps<'a>(
        &self,
        events: &'a [ReviewEvent],
    ) -> impl Iterator<Item = DateTime<Utc>> + 'a {
        events.iter().filter_map(|event| {
            let at = event.graded_at_utc();
            if at.is_none() {
                warn!(
                    user_id = %event.user_id,
                    word_id = %event.word_id,
                    graded_at = event.graded_at,
                    "skipping review event with malformed timestamp"
                );
            }
            at
        })
    }

    fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Counts events in `[now-7d, now)` and `[now-14d, now-7d)`.
    pub fn weekly_stats(&self, events: &[ReviewEvent], now: DateTime<Utc>) -> WeeklyStats {
        let week_start = now - Duration::days(7);
        let last_week_start = now - Duration::days(14);

        let mut stats = WeeklyStats::default();
        for at in self.timestamps(events) {
            if at >= week_start && at < now {
                stats.this_week += 1;
            } else if at >= last_week_start && at < week_start {
                stats.last_week += 1;
            }
        }
        stats
    }

    /// Consecutive days with at least one review, ending today or yesterday.
    pub fn streak(&self, events: &[ReviewEvent], now: DateTime<Utc>) -> u32 {
        let today = self.local_date(now);
        let days: BTreeSet<NaiveDate> = self
            .timestamps(events)
            .map(|at| self.local_date(at))
            .filter(|date| *date <= today)
            .collect();

        let mut cursor = if days.contains(&today) {
            today
        } else {
            match today.pred_opt() {
                Some(yesterday) if days.contains(&yesterday) => yesterday,
                _ => return 0,
            }
        };

        let mut streak = 0;
        while days.contains(&cursor) {
            streak += 1;
            cursor = match cursor.pred_opt() {
                Some(previous) => previous,
                None => break,
            };
        }
        streak
    }

    /// Review counts for each of the last `days` days, oldest first, today included.
    pub fn daily_counts(
        &self,
        events: &[ReviewEvent],
        now: DateTime<Utc>,
        days: u32,
    ) -> Vec<DailyCount> {
        let today = self.local_date(now);
        let mut counts: Vec<DailyCount> = (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_days(chrono::Days::new(back as u64)))
            .map(|date| DailyCount { date, reviews: 0 })
            .collect();

        for at in self.timestamps(events) {
            let date = self.local_date(at);
            if let Some(slot) = counts.iter_mut().find(|c| c.date == date) {
                slot.reviews += 1;
            }
        }
        counts
    }
}

/// Weekly counts with UTC day boundaries.
pub fn weekly_stats(events: &[ReviewEvent], now: DateTime<Utc>) -> WeeklyStats {
    StatsAggregator::utc().weekly_stats(events, now)
}

/// Review streak with UTC calendar days.
pub fn streak(events: &[ReviewEvent], now: DateTime<Utc>) -> u32 {
    StatsAggregator::utc().streak(events, now)
}
