//! Daily progress records and derived completion status.
//!
//! # Responsibility
//! - Define the per-(sub-habit, day) progress row.
//! - Derive completion status as a pure function of progress, target and day.
//!
//! # Invariants
//! - Progress attaches to sub-habits only; habit progress is an aggregate.
//! - Status is never persisted.
//! - Completeness dominates recency: a completed past day is never `Missed`.

use crate::calendar::DayBucket;
use crate::model::habit::{HabitId, SubHabitId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stored completion count for one sub-habit on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub habit_id: HabitId,
    pub sub_habit_id: SubHabitId,
    pub day: DayBucket,
    /// Not clamped to the sub-habit target.
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressValidationError {
    NilId,
    NilHabitId,
    NilSubHabitId,
}

impl Display for ProgressValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "progress id must not be nil"),
            Self::NilHabitId => write!(f, "progress habit id must not be nil"),
            Self::NilSubHabitId => write!(f, "progress sub-habit id must not be nil"),
        }
    }
}

impl Error for ProgressValidationError {}

impl ProgressRecord {
    pub fn new(habit_id: HabitId, sub_habit_id: SubHabitId, day: DayBucket, count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            habit_id,
            sub_habit_id,
            day,
            count,
        }
    }

    pub fn validate(&self) -> Result<(), ProgressValidationError> {
        if self.id.is_nil() {
            return Err(ProgressValidationError::NilId);
        }
        if self.habit_id.is_nil() {
            return Err(ProgressValidationError::NilHabitId);
        }
        if self.sub_habit_id.is_nil() {
            return Err(ProgressValidationError::NilSubHabitId);
        }
        Ok(())
    }
}

/// Derived completion state for a sub-habit or habit on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Completed,
    InProgress,
    Missed,
}

impl ProgressStatus {
    /// Status of one sub-habit: complete once `progress >= target`, otherwise
    /// missed when `day` is strictly before `today`.
    pub fn derive(progress: u32, target: u32, day: DayBucket, today: DayBucket) -> Self {
        if progress >= target {
            Self::Completed
        } else if day < today {
            Self::Missed
        } else {
            Self::InProgress
        }
    }

    /// Status of a habit from the statuses of its sub-habits.
    pub fn combine(
        statuses: impl IntoIterator<Item = ProgressStatus>,
        day: DayBucket,
        today: DayBucket,
    ) -> Self {
        let all_completed = statuses
            .into_iter()
            .all(|status| status == Self::Completed);
        if all_completed {
            Self::Completed
        } else if day < today {
            Self::Missed
        } else {
            Self::InProgress
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::Missed => "missed",
        }
    }
}
