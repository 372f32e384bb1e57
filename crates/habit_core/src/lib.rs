//! Core domain logic for Habit Journey.
//! This crate is the single source of truth for habit, progress and diary
//! invariants.

pub mod calendar;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use calendar::{
    days_of_month, start_of_day, start_of_week, BucketError, Clock, DayBucket, FixedClock,
    SystemClock, WeekBucket,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::diary::{DiaryEntry, DiaryEntryId, DiaryValidationError};
pub use model::habit::{
    Habit, HabitCategory, HabitId, HabitValidationError, SubHabit, SubHabitId,
    MAX_HABITS_PER_WEEK,
};
pub use model::progress::{ProgressRecord, ProgressStatus, ProgressValidationError};
pub use repo::diary_repo::{DiaryRepository, SqliteDiaryRepository};
pub use repo::habit_repo::{HabitRepository, SqliteHabitRepository};
pub use repo::{RepoError, RepoResult};
pub use service::diary_store::{DiaryStore, DiaryStoreError};
pub use service::habit_store::{DayCompletion, HabitStore, HabitStoreError, NewHabit, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
