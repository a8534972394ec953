//! Append-only record of one submitted grade.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Grade, WordId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub user_id: String,
    pub word_id: WordId,
    /// Unix seconds, the resolution the event log stores.
    pub graded_at: i64,
    pub grade: Grade,
}

impl ReviewEvent {
    pub fn new(
        user_id: impl Into<String>,
        word_id: WordId,
        graded_at: DateTime<Utc>,
        grade: Grade,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            word_id,
            graded_at: graded_at.timestamp(),
            grade,
        }
    }

    /// `None` when the stored timestamp is outside chrono's range.
    pub fn graded_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.graded_at, 0)
    }
}
