//! Calendar bucketing and clock abstraction.
//!
//! # Responsibility
//! - Map arbitrary dates to canonical day and week bucket keys.
//! - Provide the injectable notion of "today" used by status derivation.
//!
//! # Invariants
//! - Weeks always start on Monday, independent of locale.
//! - `start_of_week(start_of_week(d)) == start_of_week(d)`.
//! - A `WeekBucket` always wraps a Monday.
//! - Storage text form is `YYYY-MM-DD` for both bucket kinds.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BUCKET_TEXT_FORMAT: &str = "%Y-%m-%d";

/// Midnight-truncated calendar day used to key progress and diary rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayBucket(NaiveDate);

/// Monday that starts the ISO week containing a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct WeekBucket(NaiveDate);

/// Error returned when bucket text or values cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketError {
    /// Text is not a `YYYY-MM-DD` calendar date.
    Malformed(String),
    /// Week bucket value does not fall on a Monday.
    NotMonday(NaiveDate),
}

impl Display for BucketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(f, "malformed calendar date `{value}`"),
            Self::NotMonday(date) => write!(f, "week bucket {date} is not a Monday"),
        }
    }
}

impl Error for BucketError {}

impl DayBucket {
    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Returns the week bucket that contains this day.
    pub fn week(self) -> WeekBucket {
        let offset = self.0.weekday().num_days_from_monday();
        // Days before the first representable Monday clamp forward to it.
        let monday = self
            .0
            .checked_sub_days(Days::new(u64::from(offset)))
            .or_else(|| self.0.checked_add_days(Days::new(u64::from(7 - offset))))
            .unwrap_or(self.0);
        WeekBucket(monday)
    }

    /// Parses the `YYYY-MM-DD` storage form.
    pub fn parse(value: &str) -> Result<Self, BucketError> {
        NaiveDate::parse_from_str(value, BUCKET_TEXT_FORMAT)
            .map(Self)
            .map_err(|_| BucketError::Malformed(value.to_string()))
    }

    pub fn to_db_text(self) -> String {
        self.0.format(BUCKET_TEXT_FORMAT).to_string()
    }
}

impl WeekBucket {
    /// Builds a week bucket from a date that must already be a Monday.
    pub fn from_monday(date: NaiveDate) -> Result<Self, BucketError> {
        if date.weekday() != Weekday::Mon {
            return Err(BucketError::NotMonday(date));
        }
        Ok(Self(date))
    }

    pub fn monday(self) -> NaiveDate {
        self.0
    }

    /// Returns the seven day buckets of this week, Monday first.
    pub fn days(self) -> Vec<DayBucket> {
        self.0
            .iter_days()
            .take(7)
            .map(DayBucket)
            .collect()
    }

    pub fn contains(self, day: DayBucket) -> bool {
        day.week() == self
    }

    /// Parses the `YYYY-MM-DD` storage form and rejects non-Monday values.
    pub fn parse(value: &str) -> Result<Self, BucketError> {
        let day = DayBucket::parse(value)?;
        Self::from_monday(day.date())
    }

    pub fn to_db_text(self) -> String {
        self.0.format(BUCKET_TEXT_FORMAT).to_string()
    }
}

impl Display for DayBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(BUCKET_TEXT_FORMAT))
    }
}

impl Display for WeekBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(BUCKET_TEXT_FORMAT))
    }
}

impl From<NaiveDate> for DayBucket {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl From<NaiveDateTime> for DayBucket {
    fn from(value: NaiveDateTime) -> Self {
        Self(value.date())
    }
}

/// Buckets the instant by the local calendar, whatever zone it carries.
impl<Tz: TimeZone> From<DateTime<Tz>> for DayBucket {
    fn from(value: DateTime<Tz>) -> Self {
        Self(value.with_timezone(&Local).date_naive())
    }
}

impl From<WeekBucket> for DayBucket {
    fn from(value: WeekBucket) -> Self {
        Self(value.0)
    }
}

impl TryFrom<NaiveDate> for WeekBucket {
    type Error = BucketError;

    fn try_from(value: NaiveDate) -> Result<Self, Self::Error> {
        Self::from_monday(value)
    }
}

impl From<WeekBucket> for NaiveDate {
    fn from(value: WeekBucket) -> Self {
        value.0
    }
}

/// Truncates any supported date value to its day bucket.
pub fn start_of_day(date: impl Into<DayBucket>) -> DayBucket {
    date.into()
}

/// Returns the Monday-anchored week bucket containing `date`.
pub fn start_of_week(date: impl Into<DayBucket>) -> WeekBucket {
    date.into().week()
}

/// Returns every day of the month containing `date`, first day first.
pub fn days_of_month(date: impl Into<DayBucket>) -> Vec<DayBucket> {
    let day = date.into().date();
    let Some(first) = day.with_day(1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|current| current.month() == first.month())
        .map(DayBucket)
        .collect()
}

/// Source of "today" for status derivation.
///
/// Stores never read the wall clock directly so that day-boundary behavior
/// stays deterministic under test.
pub trait Clock {
    fn today(&self) -> DayBucket;
}

/// Wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> DayBucket {
        DayBucket::from(Local::now())
    }
}

/// Clock pinned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    today: DayBucket,
}

impl FixedClock {
    pub fn new(today: impl Into<DayBucket>) -> Self {
        Self {
            today: today.into(),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> DayBucket {
        self.today
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> DayBucket {
        (**self).today()
    }
}
