pub mod due_set;
pub mod grade;
pub mod review_event;
pub mod review_session;
pub mod review_state;
pub mod scheduler;
pub mod stats;
pub mod word;

pub use due_set::{ReviewFilter, count_due, filter_words, is_due, select_due};
pub use grade::Grade;
pub use review_event::ReviewEvent;
pub use review_session::ReviewSession;
pub use review_state::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR, ReviewState, WordStatus};
pub use scheduler::{Scheduler, schedule};
pub use stats::{DailyCount, StatsAggregator, WeeklyStats, streak, weekly_stats};
pub use word::{Word, WordId};
