//! JSON import/export of a user's review progress.
//! Saves the words, their review states and the event log so a user can back up
//! or move their history.

use crate::database::db;
use crate::error::{Result, ReviewError};
use crate::models::{ReviewEvent, ReviewState, Word};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressExport {
    pub user_id: String,
    pub exported_at: DateTime<Utc>,
    pub words: Vec<Word>,
    pub progress: Vec<ReviewState>,
    pub events: Vec<ReviewEvent>,
}

/// Collects everything the store holds for `user_id`.
pub fn collect_progress(
    user_id: &str,
    exported_at: DateTime<Utc>,
    conn: &Connection,
) -> Result<ProgressExport> {
    Ok(ProgressExport {
        user_id: user_id.to_string(),
        exported_at,
        words: db::get_words_for_user(user_id, conn)?,
        progress: db::get_progress_for_user(user_id, conn)?,
        events: db::get_events_for_user(user_id, conn)?,
    })
}

/// Writes an export to a JSON file at the specified path.
pub fn export_progress_to_path(export: &ProgressExport, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(export)?;
    fs::write(path, json_string).map_err(|e| ReviewError::storage(path, e))?;
    info!(
        user_id = %export.user_id,
        words = export.words.len(),
        events = export.events.len(),
        path = %path.display(),
        "progress exported"
    );
    Ok(())
}

/// Reads an export file and checks that every review state is valid and that
/// progress and events only refer to words the file contains.
pub fn import_progress(path: &Path) -> Result<ProgressExport> {
    let contents = fs::read_to_string(path).map_err(|e| ReviewError::storage(path, e))?;
    let export: ProgressExport = serde_json::from_str(&contents)?;

    for state in &export.progress {
        state.validate()?;
        if !export.words.iter().any(|w| w.id == state.word_id) {
            return Err(ReviewError::serde(format!(
                "progress for word {} has no matching word entry",
                state.word_id
            )));
        }
    }
    for event in &export.events {
        if !export.words.iter().any(|w| w.id == event.word_id) {
            return Err(ReviewError::serde(format!(
                "review event for word {} at {} has no matching word entry",
                event.word_id, event.graded_at
            )));
        }
    }
    Ok(export)
}

/// Writes an import into the store for `user_id` in one transaction.
///
/// Words are matched by term, so ids in the file do not need to match local ids.
/// Events already in the log are not written again, so restoring the same file twice
/// is harmless. Returns the number of words restored.
pub fn restore_progress(
    export: &ProgressExport,
    user_id: &str,
    conn: &Connection,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut restored = 0;

    for word in &export.words {
        let local_id = db::add_word(&word.term, &word.translation, &tx)?;
        db::track_word(user_id, local_id, &tx)?;

        if let Some(state) = export.progress.iter().find(|s| s.word_id == word.id) {
            let mut state = state.clone();
            state.word_id = local_id;
            db::upsert_progress(user_id, &state, &tx)?;
        }

        let events: Vec<&ReviewEvent> =
            export.events.iter().filter(|e| e.word_id == word.id).collect();
        for (i, event) in events.iter().enumerate() {
            // Identical reviews in the file each keep their own row.
            let copies = events[..=i]
                .iter()
                .filter(|e| e.graded_at == event.graded_at && e.grade == event.grade)
                .count();
            let mut event = (*event).clone();
            event.user_id = user_id.to_string();
            event.word_id = local_id;
            db::append_event_once(&event, copies, &tx)?;
        }
        restored += 1;
    }

    tx.commit()?;
    info!(user_id, restored, "progress imported");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Scheduler, WordId};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 20, 12, 0, 0).unwrap()
    }

    fn populated_store() -> Connection {
        let conn = db::open_in_memory().unwrap();
        let scheduler = Scheduler::default();
        let cat = db::add_word_for_user("anna", "kot", "cat", &conn).unwrap();
        db::add_word_for_user("anna", "pies", "dog", &conn).unwrap();
        db::grade_word("anna", cat, Grade::Perfect, now(), &scheduler, &conn).unwrap();
        conn
    }

    #[test]
    fn test_export_and_restore_into_fresh_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anna.json");

        let source = populated_store();
        let export = collect_progress("anna", now(), &source).unwrap();
        export_progress_to_path(&export, &path).unwrap();

        let imported = import_progress(&path).unwrap();
        assert_eq!(imported, export);

        let target = db::open_in_memory().unwrap();
        // Occupy id 1 so restored ids differ from the file's.
        db::add_word("dom", "house", &target).unwrap();
        let restored = restore_progress(&imported, "anna", &target).unwrap();
        assert_eq!(restored, 2);

        let states = db::get_progress_for_user("anna", &target).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states.iter().map(|s| s.review_count).sum::<u32>(), 1);
        assert_eq!(db::get_events_for_user("anna", &target).unwrap().len(), 1);
    }

    #[test]
    fn test_restoring_twice_keeps_one_copy_of_each_event() {
        let source = populated_store();
        let cat = db::get_words_for_user("anna", &source).unwrap()[0].id;
        // Same second, same grade: two real reviews that must both survive.
        let again = ReviewEvent::new("anna", cat, now(), Grade::Perfect);
        db::append_event(&again, &source).unwrap();
        let export = collect_progress("anna", now(), &source).unwrap();
        assert_eq!(export.events.len(), 2);

        let target = db::open_in_memory().unwrap();
        restore_progress(&export, "anna", &target).unwrap();
        restore_progress(&export, "anna", &target).unwrap();

        assert_eq!(db::get_events_for_user("anna", &target).unwrap().len(), 2);
        assert_eq!(db::get_progress_for_user("anna", &target).unwrap().len(), 2);
    }

    #[test]
    fn test_import_rejects_event_without_word() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orphan_event.json");

        let source = populated_store();
        let mut export = collect_progress("anna", now(), &source).unwrap();
        export.events[0].word_id = WordId(404);
        fs::write(&path, serde_json::to_string(&export).unwrap()).unwrap();

        let err = import_progress(&path).unwrap_err();
        assert!(matches!(err, ReviewError::Serde { .. }));
        assert!(err.to_string().contains("word 404"));
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_progress(Path::new("nonexistent_file_xyz123.json"));
        assert!(matches!(result, Err(ReviewError::Storage { .. })));
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(matches!(
            import_progress(&path),
            Err(ReviewError::Serde { .. })
        ));
    }

    #[test]
    fn test_import_rejects_invalid_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_state.json");

        let source = populated_store();
        let mut export = collect_progress("anna", now(), &source).unwrap();
        export.progress[0].interval = -3.0;
        fs::write(&path, serde_json::to_string(&export).unwrap()).unwrap();

        assert!(matches!(
            import_progress(&path),
            Err(ReviewError::InvalidState { .. })
        ));
    }
}
