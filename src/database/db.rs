//! Database operations for the review engine
//!
//! Handles SQLite initialization, the word registry, the per-user word-progress store
//! and the append-only review-event log. A graded review is written as one transaction
//! covering both the progress upsert and the event append.

use crate::error::{Result, ReviewError};
use crate::models::{Grade, ReviewEvent, ReviewState, Scheduler, Word, WordId, WordStatus};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{debug, info, warn};

/// Opens (or creates) the database file and makes sure all tables exist.
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    info!(path = %path.display(), "opened review database");
    Ok(conn)
}

/// In-memory database with the full schema, used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    // Cascading deletes from `words` rely on this.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term TEXT NOT NULL UNIQUE,
            translation TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS word_progress (
            user_id TEXT NOT NULL,
            word_id INTEGER NOT NULL,
            interval REAL NOT NULL DEFAULT 0,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            review_count INTEGER NOT NULL DEFAULT 0,
            next_review_date INTEGER,
            last_review_date INTEGER,
            status TEXT NOT NULL DEFAULT 'learning',
            PRIMARY KEY (user_id, word_id),
            FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            word_id INTEGER NOT NULL,
            graded_at INTEGER NOT NULL,
            grade INTEGER NOT NULL,
            FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_events_user_time
         ON review_events (user_id, graded_at)",
        (),
    )?;

    // Simulated clock, advanced with `advance_day`.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp().to_string()],
    )?;

    Ok(())
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ReviewError::invalid_state(format!("timestamp out of range: {secs}")))
}

// ========== Clock ==========

/// Retrieves the current simulated date from the database
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = value.parse::<i64>().map_err(|_| {
        ReviewError::invalid_state(format!("stored current date '{value}' is not a timestamp"))
    })?;
    from_timestamp(secs)
}

/// The instant reviews are graded and due words are picked at.
///
/// This is the later of the stored simulated date and the wall clock, so `advance_day`
/// can move time forward while real days still pass. Whole seconds, like the store.
pub fn review_clock(conn: &Connection) -> Result<DateTime<Utc>> {
    let stored = get_current_date(conn)?;
    let wall = from_timestamp(Utc::now().timestamp())?;
    Ok(stored.max(wall))
}

/// Exclusive upper bound for statistics taken at `now`.
///
/// Events are stored in whole seconds, so one second past `now` covers every review
/// graded at `now` while the weekly windows stay half-open.
pub fn stats_horizon(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(1)
}

pub fn set_current_date(date: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES ('current_date', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![date.timestamp().to_string()],
    )?;
    Ok(())
}

/// Advances the current date by 24 hours
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::days(1);
    set_current_date(next_day, conn)?;
    info!(date = %next_day, "advanced simulated date");
    Ok(next_day)
}

// ========== Words ==========

/// Adds a word to the registry and returns its id.
///
/// If a word with the same term already exists, its id is returned and the
/// translation is left untouched.
pub fn add_word(term: &str, translation: &str, conn: &Connection) -> Result<WordId> {
    conn.execute(
        "INSERT OR IGNORE INTO words (term, translation) VALUES (?1, ?2)",
        params![term, translation],
    )?;

    let id: i64 = conn.query_row(
        "SELECT id FROM words WHERE term = ?1",
        params![term],
        |row| row.get(0),
    )?;

    Ok(WordId(id))
}

/// Initializes the review state of a word for a user. Existing progress is kept.
pub fn track_word(user_id: &str, word_id: WordId, conn: &Connection) -> Result<()> {
    let initial = ReviewState::new(word_id);
    conn.execute(
        "INSERT OR IGNORE INTO word_progress
            (user_id, word_id, interval, ease_factor, review_count,
             next_review_date, last_review_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6)",
        params![
            user_id,
            word_id.0,
            initial.interval,
            initial.ease_factor,
            initial.review_count,
            initial.status.as_str()
        ],
    )?;
    Ok(())
}

/// Adds a word and makes it trackable for `user_id` in one step.
pub fn add_word_for_user(
    user_id: &str,
    term: &str,
    translation: &str,
    conn: &Connection,
) -> Result<WordId> {
    let tx = conn.unchecked_transaction()?;
    let word_id = add_word(term, translation, &tx)?;
    track_word(user_id, word_id, &tx)?;
    tx.commit()?;
    debug!(user_id, %word_id, term, "word added");
    Ok(word_id)
}

fn word_from_row(row: &Row) -> rusqlite::Result<Word> {
    Ok(Word {
        id: WordId(row.get(0)?),
        term: row.get(1)?,
        translation: row.get(2)?,
    })
}

pub fn get_word(word_id: WordId, conn: &Connection) -> Result<Option<Word>> {
    let word = conn
        .query_row(
            "SELECT id, term, translation FROM words WHERE id = ?1",
            params![word_id.0],
            word_from_row,
        )
        .optional()?;
    Ok(word)
}

/// All words tracked by a user, ordered by id.
pub fn get_words_for_user(user_id: &str, conn: &Connection) -> Result<Vec<Word>> {
    let mut stmt = conn.prepare(
        "SELECT w.id, w.term, w.translation
         FROM words w
         JOIN word_progress p ON p.word_id = w.id
         WHERE p.user_id = ?1
         ORDER BY w.id ASC",
    )?;

    let words = stmt
        .query_map(params![user_id], word_from_row)?
        .collect::<rusqlite::Result<Vec<Word>>>()?;
    Ok(words)
}

/// Deletes a word together with every user's progress and events for it.
pub fn delete_word(word_id: WordId, conn: &Connection) -> Result<()> {
    let deleted = conn.execute("DELETE FROM words WHERE id = ?1", params![word_id.0])?;
    if deleted == 0 {
        return Err(ReviewError::word_not_found(word_id));
    }
    info!(%word_id, "word deleted");
    Ok(())
}

// ========== Word progress ==========

struct ProgressRow {
    word_id: i64,
    interval: f64,
    ease_factor: f64,
    review_count: u32,
    next_review_date: Option<i64>,
    last_review_date: Option<i64>,
    status: String,
}

impl ProgressRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            word_id: row.get(0)?,
            interval: row.get(1)?,
            ease_factor: row.get(2)?,
            review_count: row.get(3)?,
            next_review_date: row.get(4)?,
            last_review_date: row.get(5)?,
            status: row.get(6)?,
        })
    }

    fn into_state(self) -> Result<ReviewState> {
        let state = ReviewState {
            word_id: WordId(self.word_id),
            interval: self.interval,
            ease_factor: self.ease_factor,
            review_count: self.review_count,
            next_review_date: self.next_review_date.map(from_timestamp).transpose()?,
            last_review_date: self.last_review_date.map(from_timestamp).transpose()?,
            status: self.status.parse::<WordStatus>()?,
        };
        state.validate()?;
        Ok(state)
    }
}

const PROGRESS_COLUMNS: &str =
    "word_id, interval, ease_factor, review_count, next_review_date, last_review_date, status";

/// Review state of every word the user tracks.
pub fn get_progress_for_user(user_id: &str, conn: &Connection) -> Result<Vec<ReviewState>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM word_progress WHERE user_id = ?1 ORDER BY word_id ASC"
    ))?;

    let rows = stmt
        .query_map(params![user_id], ProgressRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(ProgressRow::into_state).collect()
}

pub fn get_progress(
    user_id: &str,
    word_id: WordId,
    conn: &Connection,
) -> Result<Option<ReviewState>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {PROGRESS_COLUMNS} FROM word_progress WHERE user_id = ?1 AND word_id = ?2"
            ),
            params![user_id, word_id.0],
            ProgressRow::from_row,
        )
        .optional()?;

    row.map(ProgressRow::into_state).transpose()
}

/// Inserts or replaces the review state of a word for a user.
pub fn upsert_progress(user_id: &str, state: &ReviewState, conn: &Connection) -> Result<()> {
    state.validate()?;
    conn.execute(
        "INSERT INTO word_progress
            (user_id, word_id, interval, ease_factor, review_count,
             next_review_date, last_review_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id, word_id) DO UPDATE SET
            interval = excluded.interval,
            ease_factor = excluded.ease_factor,
            review_count = excluded.review_count,
            next_review_date = excluded.next_review_date,
            last_review_date = excluded.last_review_date,
            status = excluded.status",
        params![
            user_id,
            state.word_id.0,
            state.interval,
            state.ease_factor,
            state.review_count,
            state.next_review_date.map(|d| d.timestamp()),
            state.last_review_date.map(|d| d.timestamp()),
            state.status.as_str()
        ],
    )?;
    Ok(())
}

/// Archives a word or brings it back. Unarchiving recomputes the status from the interval.
pub fn set_archived(
    user_id: &str,
    word_id: WordId,
    archived: bool,
    learned_threshold: f64,
    conn: &Connection,
) -> Result<ReviewState> {
    let mut state = get_progress(user_id, word_id, conn)?
        .ok_or_else(|| ReviewError::not_tracked(user_id, word_id))?;

    state.status = if archived {
        WordStatus::Archived
    } else {
        WordStatus::derive(state.interval, learned_threshold)
    };
    upsert_progress(user_id, &state, conn)?;
    info!(user_id, %word_id, status = %state.status, "archive flag changed");
    Ok(state)
}

// ========== Review events ==========

pub fn append_event(event: &ReviewEvent, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO review_events (user_id, word_id, graded_at, grade) VALUES (?1, ?2, ?3, ?4)",
        params![
            event.user_id,
            event.word_id.0,
            event.graded_at,
            event.grade.value()
        ],
    )?;
    Ok(())
}

/// Appends `event` unless the log already holds as many identical events as `copies`.
///
/// Used by restores so that loading the same backup twice leaves one copy of each
/// review. Returns true when the event was written.
pub fn append_event_once(event: &ReviewEvent, copies: usize, conn: &Connection) -> Result<bool> {
    let existing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM review_events
         WHERE user_id = ?1 AND word_id = ?2 AND graded_at = ?3 AND grade = ?4",
        params![
            event.user_id,
            event.word_id.0,
            event.graded_at,
            event.grade.value()
        ],
        |row| row.get(0),
    )?;
    if usize::try_from(existing).unwrap_or(usize::MAX) >= copies {
        return Ok(false);
    }
    append_event(event, conn)?;
    Ok(true)
}

fn query_events(
    sql: &str,
    params: impl rusqlite::Params,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let events = rows
        .into_iter()
        .filter_map(|(user_id, word_id, graded_at, grade)| match Grade::try_from(grade) {
            Ok(grade) => Some(ReviewEvent {
                user_id,
                word_id: WordId(word_id),
                graded_at,
                grade,
            }),
            Err(err) => {
                warn!(%user_id, word_id, graded_at, "skipping review event: {}", err);
                None
            }
        })
        .collect();
    Ok(events)
}

/// Every event of a user, oldest first.
pub fn get_events_for_user(user_id: &str, conn: &Connection) -> Result<Vec<ReviewEvent>> {
    query_events(
        "SELECT user_id, word_id, graded_at, grade FROM review_events
         WHERE user_id = ?1
         ORDER BY graded_at ASC, id ASC",
        params![user_id],
        conn,
    )
}

/// Events of a user graded in `[from, to)`, oldest first.
pub fn get_events_between(
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    query_events(
        "SELECT user_id, word_id, graded_at, grade FROM review_events
         WHERE user_id = ?1 AND graded_at >= ?2 AND graded_at < ?3
         ORDER BY graded_at ASC, id ASC",
        params![user_id, from.timestamp(), to.timestamp()],
        conn,
    )
}

/// Persists the outcome of one grade: progress upsert and event append, atomically.
pub fn record_grade(
    user_id: &str,
    state: &ReviewState,
    event: &ReviewEvent,
    conn: &Connection,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    upsert_progress(user_id, state, &tx)?;
    append_event(event, &tx)?;
    tx.commit()?;
    Ok(())
}

/// Loads a word's state, schedules it for `grade` and records the result.
pub fn grade_word(
    user_id: &str,
    word_id: WordId,
    grade: Grade,
    now: DateTime<Utc>,
    scheduler: &Scheduler,
    conn: &Connection,
) -> Result<ReviewState> {
    let current = get_progress(user_id, word_id, conn)?
        .ok_or_else(|| ReviewError::not_tracked(user_id, word_id))?;

    let next = scheduler.schedule(&current, grade, now)?;
    let event = ReviewEvent::new(user_id, word_id, now, grade);
    record_grade(user_id, &next, &event, conn)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatsAggregator;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_init_database_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("review.sqlite3");
        let conn = init_database(&path).unwrap();
        add_word_for_user("anna", "kot", "cat", &conn).unwrap();
        drop(conn);

        let conn = init_database(&path).unwrap();
        assert_eq!(get_words_for_user("anna", &conn).unwrap().len(), 1);
    }

    #[test]
    fn test_add_word_initializes_progress() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "pies", "dog", &conn).unwrap();

        let state = get_progress("anna", id, &conn).unwrap().unwrap();
        assert_eq!(state, ReviewState::new(id));
        assert!(get_progress("ben", id, &conn).unwrap().is_none());
    }

    #[test]
    fn test_add_word_is_idempotent_on_term() {
        let conn = open_in_memory().unwrap();
        let first = add_word("dom", "house", &conn).unwrap();
        let second = add_word("dom", "home", &conn).unwrap();
        assert_eq!(first, second);
        assert_eq!(get_word(first, &conn).unwrap().unwrap().translation, "house");
    }

    #[test]
    fn test_track_word_keeps_existing_progress() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "okno", "window", &conn).unwrap();
        grade_word("anna", id, Grade::Perfect, now(), &Scheduler::default(), &conn).unwrap();

        track_word("anna", id, &conn).unwrap();
        let state = get_progress("anna", id, &conn).unwrap().unwrap();
        assert_eq!(state.review_count, 1);
    }

    #[test]
    fn test_grade_word_writes_state_and_event() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "woda", "water", &conn).unwrap();

        let next =
            grade_word("anna", id, Grade::Perfect, now(), &Scheduler::default(), &conn).unwrap();
        assert_eq!(next.review_count, 1);
        assert_eq!(get_progress("anna", id, &conn).unwrap().unwrap(), next);

        let events = get_events_for_user("anna", &conn).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].grade, Grade::Perfect);
        assert_eq!(events[0].graded_at_utc(), Some(now()));
    }

    #[test]
    fn test_grade_untracked_word_fails() {
        let conn = open_in_memory().unwrap();
        let id = add_word("chleb", "bread", &conn).unwrap();
        let err = grade_word("anna", id, Grade::Remembered, now(), &Scheduler::default(), &conn)
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotTracked { .. }));
        assert!(get_events_for_user("anna", &conn).unwrap().is_empty());
    }

    #[test]
    fn test_record_grade_is_atomic() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "ser", "cheese", &conn).unwrap();
        let next = Scheduler::default()
            .schedule(&ReviewState::new(id), Grade::Remembered, now())
            .unwrap();

        // Event for a word that does not exist violates the foreign key.
        let bad_event = ReviewEvent::new("anna", WordId(999), now(), Grade::Remembered);
        assert!(record_grade("anna", &next, &bad_event, &conn).is_err());

        let stored = get_progress("anna", id, &conn).unwrap().unwrap();
        assert_eq!(stored.review_count, 0);
    }

    #[test]
    fn test_upsert_rejects_invalid_state() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "mleko", "milk", &conn).unwrap();
        let mut state = ReviewState::new(id);
        state.ease_factor = 0.9;
        assert!(upsert_progress("anna", &state, &conn).is_err());
    }

    #[test]
    fn test_delete_word_cascades() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "jabłko", "apple", &conn).unwrap();
        grade_word("anna", id, Grade::Forgot, now(), &Scheduler::default(), &conn).unwrap();

        delete_word(id, &conn).unwrap();
        assert!(get_progress("anna", id, &conn).unwrap().is_none());
        assert!(get_events_for_user("anna", &conn).unwrap().is_empty());

        assert!(matches!(
            delete_word(id, &conn),
            Err(ReviewError::WordNotFound { .. })
        ));
    }

    #[test]
    fn test_events_between_is_half_open() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "sok", "juice", &conn).unwrap();
        for hours in [0, 5, 10] {
            let at = now() + Duration::hours(hours);
            append_event(&ReviewEvent::new("anna", id, at, Grade::Remembered), &conn).unwrap();
        }

        let events =
            get_events_between("anna", now(), now() + Duration::hours(10), &conn).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unknown_grade_rows_are_skipped() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "kawa", "coffee", &conn).unwrap();
        conn.execute(
            "INSERT INTO review_events (user_id, word_id, graded_at, grade)
             VALUES ('anna', ?1, 0, 9)",
            params![id.0],
        )
        .unwrap();
        append_event(&ReviewEvent::new("anna", id, now(), Grade::Perfect), &conn).unwrap();

        let events = get_events_for_user("anna", &conn).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].grade, Grade::Perfect);
    }

    #[test]
    fn test_set_archived_roundtrip() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "herbata", "tea", &conn).unwrap();

        let archived = set_archived("anna", id, true, 7.0, &conn).unwrap();
        assert_eq!(archived.status, WordStatus::Archived);

        let restored = set_archived("anna", id, false, 7.0, &conn).unwrap();
        assert_eq!(restored.status, WordStatus::Learning);
    }

    #[test]
    fn test_advance_day() {
        let conn = open_in_memory().unwrap();
        set_current_date(now(), &conn).unwrap();
        let next = advance_day(&conn).unwrap();
        assert_eq!(next, now() + Duration::days(1));
        assert_eq!(get_current_date(&conn).unwrap(), next);
    }

    #[test]
    fn test_review_clock_follows_wall_time() {
        let conn = open_in_memory().unwrap();
        set_current_date(now(), &conn).unwrap();
        let before = Utc::now() - Duration::seconds(1);
        assert!(review_clock(&conn).unwrap() >= before);

        let ahead = Utc::now() + Duration::days(30);
        set_current_date(ahead, &conn).unwrap();
        assert_eq!(review_clock(&conn).unwrap(), get_current_date(&conn).unwrap());
    }

    #[test]
    fn test_review_graded_now_counts_this_week() {
        let conn = open_in_memory().unwrap();
        set_current_date(Utc::now() + Duration::days(3), &conn).unwrap();
        let id = add_word_for_user("anna", "chmura", "cloud", &conn).unwrap();

        let graded_at = get_current_date(&conn).unwrap();
        grade_word("anna", id, Grade::Remembered, graded_at, &Scheduler::default(), &conn)
            .unwrap();

        let events = get_events_for_user("anna", &conn).unwrap();
        let now = review_clock(&conn).unwrap();
        let weekly = StatsAggregator::utc().weekly_stats(&events, stats_horizon(now));
        assert_eq!(weekly.this_week, 1);
        assert_eq!(weekly.last_week, 0);
    }

    #[test]
    fn test_append_event_once_skips_existing_copies() {
        let conn = open_in_memory().unwrap();
        let id = add_word_for_user("anna", "rzeka", "river", &conn).unwrap();
        let event = ReviewEvent::new("anna", id, now(), Grade::Struggled);

        assert!(append_event_once(&event, 1, &conn).unwrap());
        assert!(!append_event_once(&event, 1, &conn).unwrap());
        assert!(append_event_once(&event, 2, &conn).unwrap());
        assert_eq!(get_events_for_user("anna", &conn).unwrap().len(), 2);
    }
}
