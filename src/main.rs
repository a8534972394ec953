use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use vocab_review::app::run_review;
use vocab_review::database::db;
use vocab_review::export::json::{
    collect_progress, export_progress_to_path, import_progress, restore_progress,
};
use vocab_review::models::{ReviewFilter, StatsAggregator, count_due, filter_words};
use vocab_review::{Config, Result, WordId};

/// Spaced-repetition vocabulary review
#[derive(Parser)]
#[command(name = "vocab-review")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.vocab-review/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// User whose progress is used
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word and start tracking it
    Add { term: String, translation: String },
    /// Delete a word with all of its progress and history
    Delete { word_id: i64 },
    /// List words matching a view
    List {
        #[arg(value_enum, default_value_t = ListView::All)]
        view: ListView,
    },
    /// Show how many words are due now
    Due,
    /// Review the due words interactively
    Review,
    /// Show streak and weekly review counts
    Stats,
    /// Hide a word from reviews
    Archive { word_id: i64 },
    /// Bring an archived word back into reviews
    Unarchive { word_id: i64 },
    /// Advance the simulated date by one day
    NextDay,
    /// Export progress to a JSON file
    Export { path: PathBuf },
    /// Import progress from a JSON file
    Import { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListView {
    All,
    Due,
    ThisWeek,
    ThisMonth,
    Learned,
    Archived,
}

impl ListView {
    fn filter(self) -> Option<ReviewFilter> {
        match self {
            ListView::All => None,
            ListView::Due => Some(ReviewFilter::DueNow),
            ListView::ThisWeek => Some(ReviewFilter::ThisWeek),
            ListView::ThisMonth => Some(ReviewFilter::ThisMonth),
            ListView::Learned => Some(ReviewFilter::Learned),
            ListView::Archived => Some(ReviewFilter::Archived),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.database_path = db;
    }
    if let Some(user) = cli.user {
        config.storage.user_id = user;
    }

    let conn = db::init_database(&config.storage.database_path)?;
    let user = config.storage.user_id.clone();
    let now = db::review_clock(&conn)?;

    match cli.command {
        Commands::Add { term, translation } => {
            let id = db::add_word_for_user(&user, &term, &translation, &conn)?;
            println!("Added '{term}' (id {id})");
        }
        Commands::Delete { word_id } => {
            db::delete_word(WordId(word_id), &conn)?;
            println!("Deleted word {word_id}");
        }
        Commands::List { view } => {
            let states = db::get_progress_for_user(&user, &conn)?;
            let words = db::get_words_for_user(&user, &conn)?;
            let ids: Vec<WordId> = match view.filter() {
                Some(filter) => filter_words(&states, now, filter),
                None => states.iter().map(|s| s.word_id).collect(),
            };

            for id in ids {
                let (Some(word), Some(state)) = (
                    words.iter().find(|w| w.id == id),
                    states.iter().find(|s| s.word_id == id),
                ) else {
                    continue;
                };
                let next = state
                    .next_review_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "new".to_string());
                println!(
                    "{:>4}  {:<20} {:<20} {:<9} interval {:>6.1}d  next {}",
                    id.0,
                    word.term,
                    word.translation,
                    state.status.as_str(),
                    state.interval,
                    next
                );
            }
        }
        Commands::Due => {
            let states = db::get_progress_for_user(&user, &conn)?;
            println!("{} words due on {}", count_due(&states, now), now.format("%Y-%m-%d"));
        }
        Commands::Review => {
            let stdin = io::stdin();
            run_review(&conn, &config, &user, now, stdin.lock(), io::stdout())?;
        }
        Commands::Stats => {
            let events = db::get_events_for_user(&user, &conn)?;
            let aggregator = StatsAggregator::from_offset_minutes(config.stats.utc_offset_minutes);
            let weekly = aggregator.weekly_stats(&events, db::stats_horizon(now));

            println!("Streak: {} days", aggregator.streak(&events, now));
            println!("This week: {} reviews", weekly.this_week);
            println!("Last week: {} reviews", weekly.last_week);
            for day in aggregator.daily_counts(&events, now, 7) {
                println!("  {}  {}", day.date, "#".repeat(day.reviews as usize));
            }
        }
        Commands::Archive { word_id } => {
            let state = db::set_archived(
                &user,
                WordId(word_id),
                true,
                config.scheduler.learned_threshold,
                &conn,
            )?;
            println!("Word {} is now {}", state.word_id, state.status);
        }
        Commands::Unarchive { word_id } => {
            let state = db::set_archived(
                &user,
                WordId(word_id),
                false,
                config.scheduler.learned_threshold,
                &conn,
            )?;
            println!("Word {} is now {}", state.word_id, state.status);
        }
        Commands::NextDay => {
            let date = db::advance_day(&conn)?;
            println!("{}", date.format("%Y-%m-%d"));
        }
        Commands::Export { path } => {
            let export = collect_progress(&user, now, &conn)?;
            export_progress_to_path(&export, &path)?;
            println!("Exported {} words to {}", export.words.len(), path.display());
        }
        Commands::Import { path } => {
            let export = import_progress(&path)?;
            let restored = restore_progress(&export, &user, &conn)?;
            println!("Imported {restored} words for {user}");
        }
    }

    Ok(())
}
