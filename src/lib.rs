pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use config::Config;
pub use error::{Result, ReviewError};
pub use models::{
    Grade, ReviewEvent, ReviewSession, ReviewState, Scheduler, StatsAggregator, WeeklyStats, Word,
    WordId, WordStatus,
};
