//! Diary entry model.
//!
//! # Invariants
//! - At most one entry exists per day bucket (enforced by the diary store
//!   and a unique index in storage).
//! - Text fields are stored verbatim; empty strings are allowed.

use crate::calendar::DayBucket;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DiaryEntryId = Uuid;

/// Free-text reflection for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: DiaryEntryId,
    pub day: DayBucket,
    pub thoughts: String,
    pub emotions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiaryValidationError {
    NilId,
}

impl Display for DiaryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "diary entry id must not be nil"),
        }
    }
}

impl Error for DiaryValidationError {}

impl DiaryEntry {
    pub fn new(day: DayBucket, thoughts: impl Into<String>, emotions: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            day,
            thoughts: thoughts.into(),
            emotions: emotions.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DiaryValidationError> {
        if self.id.is_nil() {
            return Err(DiaryValidationError::NilId);
        }
        Ok(())
    }
}
