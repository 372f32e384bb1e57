//! Habit and sub-habit domain model.
//!
//! # Responsibility
//! - Define the weekly habit aggregate and its owned sub-habits.
//! - Provide validation shared by constructors and persistence paths.
//!
//! # Invariants
//! - A habit always owns at least one sub-habit.
//! - Sub-habit ids are unique inside their parent habit.
//! - Titles are normalized and never blank; targets are `>= 1`.
//! - `week_of` is the Monday bucket the habit belongs to.

use crate::calendar::WeekBucket;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a habit.
pub type HabitId = Uuid;
/// Stable identifier of a sub-habit.
pub type SubHabitId = Uuid;

/// Maximum number of habits a single week bucket may hold.
pub const MAX_HABITS_PER_WEEK: usize = 3;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Broad grouping used by the habit picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCategory {
    Learning,
    BodySport,
    #[default]
    Other,
}

impl HabitCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::BodySport => "body_sport",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "learning" => Some(Self::Learning),
            "body_sport" => Some(Self::BodySport),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Display for HabitCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for habit aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    NilId,
    BlankTitle,
    ZeroTarget,
    NoSubHabits(HabitId),
    DuplicateSubHabit(SubHabitId),
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "id must not be nil"),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::ZeroTarget => write!(f, "target must be at least 1"),
            Self::NoSubHabits(id) => write!(f, "habit {id} has no sub-habits"),
            Self::DuplicateSubHabit(id) => write!(f, "sub-habit {id} appears more than once"),
        }
    }
}

impl Error for HabitValidationError {}

/// Individually trackable component of a habit with its own daily target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubHabit {
    pub id: SubHabitId,
    pub title: String,
    /// Daily count required for the sub-habit to be completed.
    pub target: u32,
}

impl SubHabit {
    /// Creates a sub-habit with a generated id and a normalized title.
    pub fn new(title: &str, target: u32) -> Result<Self, HabitValidationError> {
        let sub_habit = Self {
            id: Uuid::new_v4(),
            title: normalize_title(title)?,
            target,
        };
        sub_habit.validate()?;
        Ok(sub_habit)
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.id.is_nil() {
            return Err(HabitValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(HabitValidationError::BlankTitle);
        }
        if self.target == 0 {
            return Err(HabitValidationError::ZeroTarget);
        }
        Ok(())
    }
}

/// Recurring weekly goal composed of one or more sub-habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub category: HabitCategory,
    /// Append-ordered; never empty once created.
    pub sub_habits: Vec<SubHabit>,
    pub week_of: WeekBucket,
}

impl Habit {
    /// Creates a habit together with its first sub-habit.
    pub fn new(
        title: &str,
        category: HabitCategory,
        first_sub_habit: SubHabit,
        week_of: WeekBucket,
    ) -> Result<Self, HabitValidationError> {
        let habit = Self {
            id: Uuid::new_v4(),
            title: normalize_title(title)?,
            category,
            sub_habits: vec![first_sub_habit],
            week_of,
        };
        habit.validate()?;
        Ok(habit)
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.id.is_nil() {
            return Err(HabitValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(HabitValidationError::BlankTitle);
        }
        if self.sub_habits.is_empty() {
            return Err(HabitValidationError::NoSubHabits(self.id));
        }

        let mut seen = HashSet::with_capacity(self.sub_habits.len());
        for sub_habit in &self.sub_habits {
            sub_habit.validate()?;
            if !seen.insert(sub_habit.id) {
                return Err(HabitValidationError::DuplicateSubHabit(sub_habit.id));
            }
        }
        Ok(())
    }

    pub fn sub_habit(&self, id: SubHabitId) -> Option<&SubHabit> {
        self.sub_habits.iter().find(|sub_habit| sub_habit.id == id)
    }
}

/// Trims and collapses inner whitespace; rejects titles that end up blank.
pub fn normalize_title(title: &str) -> Result<String, HabitValidationError> {
    let collapsed = WHITESPACE_RE.replace_all(title.trim(), " ");
    if collapsed.is_empty() {
        return Err(HabitValidationError::BlankTitle);
    }
    Ok(collapsed.into_owned())
}
