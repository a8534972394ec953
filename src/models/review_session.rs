//! Review session management.
//! Walks a queue of due words in rounds and persists every grade through the store.

use super::{Grade, ReviewState, Scheduler, WordId};
use crate::database::db;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::info;

/// A review session over the words that were due when it started.
///
/// `total` is captured once at start and never changes, so progress only moves
/// forward even if more words become due during the session. With
/// `retry_forgotten`, words graded below Remembered come back in the next round.
pub struct ReviewSession {
    pub user_id: String,
    queue: Vec<WordId>,
    current_round: Vec<WordId>,
    failed_this_round: Vec<WordId>,
    current_index: usize,
    passed: HashSet<WordId>,
    total: usize,
    round_number: usize,
    retry_forgotten: bool,
}

impl ReviewSession {
    /// Starts a session from the ids returned by `select_due`.
    pub fn start(user_id: impl Into<String>, due: Vec<WordId>, retry_forgotten: bool) -> Self {
        let user_id = user_id.into();
        let total = due.len();
        info!(%user_id, total, "review session started");
        Self {
            user_id,
            current_round: due.clone(),
            queue: due,
            failed_this_round: Vec::new(),
            current_index: 0,
            passed: HashSet::new(),
            total,
            round_number: 1,
            retry_forgotten,
        }
    }

    pub fn current(&self) -> Option<WordId> {
        self.current_round.get(self.current_index).copied()
    }

    /// Records `grade` for the current word and moves to the next one.
    pub fn grade_current(
        &mut self,
        grade: Grade,
        now: DateTime<Utc>,
        scheduler: &Scheduler,
        conn: &Connection,
    ) -> Result<Option<ReviewState>> {
        let Some(word_id) = self.current() else {
            return Ok(None);
        };

        let next = db::grade_word(&self.user_id, word_id, grade, now, scheduler, conn)?;
        self.apply(word_id, grade);
        Ok(Some(next))
    }

    /// Session bookkeeping for one grade, without touching the store.
    fn apply(&mut self, word_id: WordId, grade: Grade) {
        if grade.is_pass() || !self.retry_forgotten {
            self.passed.insert(word_id);
        } else {
            self.failed_this_round.push(word_id);
        }
        self.next_card();
    }

    fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the words that failed in this one.
    /// If none failed, the session is complete.
    fn start_next_round(&mut self) {
        self.current_round = std::mem::take(&mut self.failed_this_round);
        self.current_index = 0;
        if !self.current_round.is_empty() {
            self.round_number += 1;
        }
    }

    /// `(completed, total)` where `completed` counts distinct words that passed.
    pub fn progress(&self) -> (usize, usize) {
        (self.passed.len(), self.total)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining_count(&self) -> usize {
        self.total - self.passed.len()
    }

    pub fn round_number(&self) -> usize {
        self.round_number
    }

    /// Words queued at session start, in review order.
    pub fn queue(&self) -> &[WordId] {
        &self.queue
    }

    pub fn is_completed(&self) -> bool {
        self.current_round.is_empty()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} words", self.round_number, self.current_round.len())
        } else {
            format!(
                "Round {} (Retry): {} words to retry",
                self.round_number,
                self.current_round.len()
            )
        }
    }
}
