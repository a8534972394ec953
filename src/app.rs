//! Terminal review loop.
//! Shows each due word, reveals the translation on Enter and reads a grade.

use crate::config::Config;
use crate::database::db;
use crate::error::{Result, ReviewError};
use crate::models::{Grade, ReviewSession, Scheduler, select_due};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::io::{BufRead, Write};

/// Outcome of one interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub completed: usize,
    pub total: usize,
    pub graded: usize,
    /// True when input ended or the user quit before the queue was finished.
    pub aborted: bool,
}

/// Reads one trimmed line. `None` at end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Runs a review session for `user_id` over the words due at `now`.
pub fn run_review(
    conn: &Connection,
    config: &Config,
    user_id: &str,
    now: DateTime<Utc>,
    mut input: impl BufRead,
    mut output: impl Write,
) -> Result<SessionSummary> {
    let scheduler = Scheduler::new(config.scheduler.clone())?;
    let states = db::get_progress_for_user(user_id, conn)?;
    let due = select_due(&states, now, config.session.max_cards);

    let mut session = ReviewSession::start(user_id, due, config.session.retry_forgotten);
    let mut graded = 0;

    if session.is_completed() {
        writeln!(output, "Nothing to review right now.")?;
        return Ok(SessionSummary {
            completed: 0,
            total: 0,
            graded,
            aborted: false,
        });
    }

    let mut last_round = 0;
    let mut aborted = false;

    'session: while let Some(word_id) = session.current() {
        if session.round_number() != last_round {
            last_round = session.round_number();
            writeln!(output, "{}", session.phase_message())?;
        }

        let word = db::get_word(word_id, conn)?
            .ok_or_else(|| ReviewError::word_not_found(word_id))?;
        let (completed, total) = session.progress();

        writeln!(output, "[{completed}/{total}] {}", word.term)?;
        write!(output, "(Enter to reveal, q to quit) ")?;
        output.flush()?;

        match read_line(&mut input)? {
            None => {
                aborted = true;
                break;
            }
            Some(cmd) if cmd.eq_ignore_ascii_case("q") => {
                aborted = true;
                break;
            }
            Some(_) => {}
        }
        writeln!(output, "  -> {}", word.translation)?;

        let grade = loop {
            write!(output, "Grade [0 forgot, 1 struggled, 2 remembered, 3 perfect]: ")?;
            output.flush()?;

            let Some(answer) = read_line(&mut input)? else {
                aborted = true;
                break 'session;
            };
            if answer.eq_ignore_ascii_case("q") {
                aborted = true;
                break 'session;
            }
            match answer.parse::<Grade>() {
                Ok(grade) => break grade,
                Err(err) => writeln!(output, "  {err}")?,
            }
        };

        if let Some(next) = session.grade_current(grade, now, &scheduler, conn)? {
            graded += 1;
            let when = next
                .next_review_date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            writeln!(output, "  next review {when} ({})", next.status)?;
        }
    }

    let (completed, total) = session.progress();
    if session.is_completed() {
        writeln!(output, "Session complete: {completed}/{total} words.")?;
    } else {
        writeln!(output, "Session stopped at {completed}/{total} words.")?;
    }

    Ok(SessionSummary {
        completed,
        total,
        graded,
        aborted,
    })
}
