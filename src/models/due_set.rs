//! Selection of the words due for review.
//!
//! `is_due` is the one place that decides whether a word is due. The week/month
//! views reuse it with a shifted horizon instead of comparing dates themselves.

use super::{ReviewState, WordId, WordStatus};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// A word is due when it was never scheduled or its review time has arrived.
/// Archived words are never due.
pub fn is_due(state: &ReviewState, now: DateTime<Utc>) -> bool {
    if state.is_archived() {
        return false;
    }
    match state.next_review_date {
        None => true,
        Some(next) => next <= now,
    }
}

/// Unscheduled words first, then oldest due date, then word id.
fn due_order(a: &ReviewState, b: &ReviewState) -> Ordering {
    match (a.next_review_date, b.next_review_date) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
    .then_with(|| a.word_id.cmp(&b.word_id))
}

/// Returns the ids of due words in review order, capped at `limit`.
pub fn select_due(states: &[ReviewState], now: DateTime<Utc>, limit: Option<usize>) -> Vec<WordId> {
    let mut due: Vec<&ReviewState> = states.iter().filter(|s| is_due(s, now)).collect();
    due.sort_by(|a, b| due_order(a, b));

    due.into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|s| s.word_id)
        .collect()
}

/// Number of due words, ignoring any session cap.
pub fn count_due(states: &[ReviewState], now: DateTime<Utc>) -> usize {
    states.iter().filter(|s| is_due(s, now)).count()
}

/// List views over a user's words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewFilter {
    DueNow,
    ThisWeek,
    ThisMonth,
    Learned,
    Archived,
}

impl ReviewFilter {
    fn horizon(self) -> Option<Duration> {
        match self {
            ReviewFilter::DueNow => Some(Duration::zero()),
            ReviewFilter::ThisWeek => Some(Duration::days(7)),
            ReviewFilter::ThisMonth => Some(Duration::days(30)),
            ReviewFilter::Learned | ReviewFilter::Archived => None,
        }
    }
}

/// Words matching `filter`, in the same order as `select_due`.
pub fn filter_words(
    states: &[ReviewState],
    now: DateTime<Utc>,
    filter: ReviewFilter,
) -> Vec<WordId> {
    let mut matched: Vec<&ReviewState> = states
        .iter()
        .filter(|s| match filter.horizon() {
            Some(horizon) => is_due(s, now + horizon),
            None if filter == ReviewFilter::Learned => s.status == WordStatus::Learned,
            None => s.status == WordStatus::Archived,
        })
        .collect();
    matched.sort_by(|a, b| due_order(a, b));
    matched.into_iter().map(|s| s.word_id).collect()
}
