//! Habit store: weekly habit aggregate plus daily progress ledger.
//!
//! # Responsibility
//! - Own the in-memory indices (week -> habits, (sub-habit, day) -> progress)
//!   rebuilt from the repository on load.
//! - Enforce the weekly capacity limit and derive completion status.
//!
//! # Invariants
//! - A week bucket never gains a 4th habit through this store.
//! - Memory is only mutated after the repository write succeeded, so a failed
//!   write leaves the store exactly as it was.
//! - Status is recomputed on every read against the injected clock.
//! - Habits keep insertion order inside their week.

use crate::calendar::{days_of_month, start_of_day, start_of_week, Clock, DayBucket, WeekBucket};
use crate::model::habit::{
    normalize_title, Habit, HabitCategory, HabitId, HabitValidationError, SubHabit, SubHabitId,
    MAX_HABITS_PER_WEEK,
};
use crate::model::progress::{ProgressRecord, ProgressStatus};
use crate::repo::habit_repo::HabitRepository;
use crate::repo::{RepoError, RepoResult};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, HabitStoreError>;

/// Errors surfaced by habit store operations.
#[derive(Debug)]
pub enum HabitStoreError {
    /// The week already holds the maximum number of habits.
    CapacityExceeded { week: WeekBucket, limit: usize },
    /// Habit id is unknown (or not part of the requested week).
    HabitNotFound(HabitId),
    SubHabitNotFound(SubHabitId),
    Validation(HabitValidationError),
    /// Persistence failure; in-memory state was left untouched.
    Repo(RepoError),
}

impl Display for HabitStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded { week, limit } => {
                write!(f, "week of {week} already has {limit} habits")
            }
            Self::HabitNotFound(id) => write!(f, "habit not found: {id}"),
            Self::SubHabitNotFound(id) => write!(f, "sub-habit not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HabitStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HabitValidationError> for HabitStoreError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for HabitStoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::HabitNotFound(id),
            RepoError::HabitValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Input for [`HabitStore::add_habit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub title: String,
    pub category: HabitCategory,
    pub first_sub_habit_title: String,
    /// Daily target of the first sub-habit. Defaults to 1.
    pub target: u32,
}

impl NewHabit {
    pub fn new(title: impl Into<String>, first_sub_habit_title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: HabitCategory::default(),
            first_sub_habit_title: first_sub_habit_title.into(),
            target: 1,
        }
    }

    pub fn with_category(mut self, category: HabitCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }
}

/// Whether every habit of a day's week was completed on that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCompletion {
    pub day: DayBucket,
    pub completed: bool,
}

/// Habit aggregate backed by a repository and a clock.
pub struct HabitStore<R: HabitRepository, C: Clock> {
    repo: R,
    clock: C,
    weeks: BTreeMap<WeekBucket, Vec<Habit>>,
    habit_weeks: HashMap<HabitId, WeekBucket>,
    sub_habit_owners: HashMap<SubHabitId, HabitId>,
    progress: HashMap<(SubHabitId, DayBucket), ProgressRecord>,
}

impl<R: HabitRepository, C: Clock> HabitStore<R, C> {
    /// Loads every persisted habit and progress record and buckets them.
    ///
    /// # Errors
    /// - Repository failures and progress rows pointing at unknown
    ///   sub-habits or at the wrong owning habit are returned as `Repo`.
    pub fn load(repo: R, clock: C) -> StoreResult<Self> {
        let started_at = Instant::now();
        let habits = persist("habit_store_load", repo.fetch_all_habits())?;
        let records = persist("habit_store_load", repo.fetch_all_progress())?;

        let mut store = Self {
            repo,
            clock,
            weeks: BTreeMap::new(),
            habit_weeks: HashMap::new(),
            sub_habit_owners: HashMap::new(),
            progress: HashMap::new(),
        };
        for habit in habits {
            store.index_habit(habit);
        }
        for record in records {
            match store.sub_habit_owners.get(&record.sub_habit_id) {
                None => {
                    return Err(HabitStoreError::Repo(RepoError::InvalidData(format!(
                        "progress {} references unknown sub-habit {}",
                        record.id, record.sub_habit_id
                    ))));
                }
                Some(owner) if *owner != record.habit_id => {
                    return Err(HabitStoreError::Repo(RepoError::InvalidData(format!(
                        "progress {} names habit {} but sub-habit {} belongs to {}",
                        record.id, record.habit_id, record.sub_habit_id, owner
                    ))));
                }
                Some(_) => {}
            }
            store
                .progress
                .insert((record.sub_habit_id, record.day), record);
        }

        info!(
            "event=habit_store_load module=habit_store status=ok weeks={} habits={} progress_records={} duration_ms={}",
            store.weeks.len(),
            store.habit_weeks.len(),
            store.progress.len(),
            started_at.elapsed().as_millis()
        );
        Ok(store)
    }

    /// Habits of the week containing `date`, in insertion order.
    pub fn habits_for_week(&self, date: impl Into<DayBucket>) -> &[Habit] {
        self.weeks
            .get(&start_of_week(date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of habits that can still be added to the week of `date`.
    pub fn remaining_capacity(&self, date: impl Into<DayBucket>) -> usize {
        MAX_HABITS_PER_WEEK.saturating_sub(self.habits_for_week(date).len())
    }

    pub fn habit(&self, habit_id: HabitId) -> Option<&Habit> {
        let week = self.habit_weeks.get(&habit_id)?;
        self.weeks
            .get(week)?
            .iter()
            .find(|habit| habit.id == habit_id)
    }

    /// Returns the sub-habit and the habit that owns it.
    pub fn sub_habit(&self, sub_habit_id: SubHabitId) -> Option<(&Habit, &SubHabit)> {
        let habit = self.habit(*self.sub_habit_owners.get(&sub_habit_id)?)?;
        let sub_habit = habit.sub_habit(sub_habit_id)?;
        Some((habit, sub_habit))
    }

    /// Creates a habit with one sub-habit in the week containing `date`.
    ///
    /// # Errors
    /// - `CapacityExceeded` when the week already holds three habits.
    /// - `Validation` for blank titles or a zero target.
    pub fn add_habit(
        &mut self,
        request: NewHabit,
        date: impl Into<DayBucket>,
    ) -> StoreResult<Habit> {
        let week = start_of_week(date);
        let existing = self.weeks.get(&week).map_or(0, Vec::len);
        if existing >= MAX_HABITS_PER_WEEK {
            warn!(
                "event=habit_add module=habit_store status=rejected error_code=capacity_exceeded week={} habits={}",
                week, existing
            );
            return Err(HabitStoreError::CapacityExceeded {
                week,
                limit: MAX_HABITS_PER_WEEK,
            });
        }

        let first = SubHabit::new(&request.first_sub_habit_title, request.target)?;
        let habit = Habit::new(&request.title, request.category, first, week)?;
        persist("habit_add", self.repo.insert_habit(&habit))?;
        self.index_habit(habit.clone());

        info!(
            "event=habit_add module=habit_store status=ok habit_id={} week={} category={}",
            habit.id, week, habit.category
        );
        Ok(habit)
    }

    /// Renames a habit of the week containing `date`.
    pub fn rename_habit(
        &mut self,
        habit_id: HabitId,
        new_title: &str,
        date: impl Into<DayBucket>,
    ) -> StoreResult<()> {
        let week = start_of_week(date);
        let position = self.position_in_week(habit_id, week)?;
        let title = normalize_title(new_title)?;
        persist("habit_rename", self.repo.update_habit_title(habit_id, &title))?;

        if let Some(habit) = self.weeks.get_mut(&week).and_then(|habits| habits.get_mut(position)) {
            habit.title = title;
        }
        info!("event=habit_rename module=habit_store status=ok habit_id={habit_id}");
        Ok(())
    }

    /// Appends a sub-habit to a habit of the week containing `date`.
    pub fn add_sub_habit(
        &mut self,
        habit_id: HabitId,
        title: &str,
        target: u32,
        date: impl Into<DayBucket>,
    ) -> StoreResult<SubHabit> {
        let week = start_of_week(date);
        let position = self.position_in_week(habit_id, week)?;
        let sub_habit = SubHabit::new(title, target)?;
        persist("sub_habit_add", self.repo.insert_sub_habit(habit_id, &sub_habit))?;

        if let Some(habit) = self.weeks.get_mut(&week).and_then(|habits| habits.get_mut(position)) {
            habit.sub_habits.push(sub_habit.clone());
        }
        self.sub_habit_owners.insert(sub_habit.id, habit_id);

        info!(
            "event=sub_habit_add module=habit_store status=ok habit_id={} sub_habit_id={} target={}",
            habit_id, sub_habit.id, sub_habit.target
        );
        Ok(sub_habit)
    }

    /// Stored count for the sub-habit on the day of `date`; 0 when absent.
    pub fn sub_habit_progress(&self, sub_habit_id: SubHabitId, date: impl Into<DayBucket>) -> u32 {
        self.progress
            .get(&(sub_habit_id, start_of_day(date)))
            .map_or(0, |record| record.count)
    }

    /// Overwrites the count for the sub-habit on the day of `date`.
    ///
    /// The value is not clamped to the target.
    pub fn set_progress(
        &mut self,
        sub_habit_id: SubHabitId,
        date: impl Into<DayBucket>,
        value: u32,
    ) -> StoreResult<ProgressRecord> {
        let day = start_of_day(date);
        let habit_id = *self
            .sub_habit_owners
            .get(&sub_habit_id)
            .ok_or(HabitStoreError::SubHabitNotFound(sub_habit_id))?;

        let record = match self.progress.get(&(sub_habit_id, day)) {
            Some(existing) => ProgressRecord {
                count: value,
                ..existing.clone()
            },
            None => ProgressRecord::new(habit_id, sub_habit_id, day, value),
        };
        persist("progress_set", self.repo.upsert_progress(&record))?;
        self.progress.insert((sub_habit_id, day), record.clone());

        debug!(
            "event=progress_set module=habit_store status=ok sub_habit_id={} day={} count={}",
            sub_habit_id, day, value
        );
        Ok(record)
    }

    pub fn increment(
        &mut self,
        sub_habit_id: SubHabitId,
        date: impl Into<DayBucket>,
    ) -> StoreResult<ProgressRecord> {
        let day = start_of_day(date);
        let current = self.sub_habit_progress(sub_habit_id, day);
        self.set_progress(sub_habit_id, day, current.saturating_add(1))
    }

    /// Sum of the sub-habit counts of a habit on the day of `date`.
    pub fn habit_progress(&self, habit_id: HabitId, date: impl Into<DayBucket>) -> StoreResult<u32> {
        let day = start_of_day(date);
        let habit = self
            .habit(habit_id)
            .ok_or(HabitStoreError::HabitNotFound(habit_id))?;
        Ok(habit.sub_habits.iter().fold(0u32, |total, sub_habit| {
            total.saturating_add(self.sub_habit_progress(sub_habit.id, day))
        }))
    }

    pub fn sub_habit_status(
        &self,
        sub_habit_id: SubHabitId,
        date: impl Into<DayBucket>,
    ) -> StoreResult<ProgressStatus> {
        let day = start_of_day(date);
        let (_, sub_habit) = self
            .sub_habit(sub_habit_id)
            .ok_or(HabitStoreError::SubHabitNotFound(sub_habit_id))?;
        Ok(self.derive_sub_habit_status(sub_habit, day, self.clock.today()))
    }

    /// `Completed` only when every sub-habit is completed on that day.
    pub fn habit_status(
        &self,
        habit_id: HabitId,
        date: impl Into<DayBucket>,
    ) -> StoreResult<ProgressStatus> {
        let day = start_of_day(date);
        let habit = self
            .habit(habit_id)
            .ok_or(HabitStoreError::HabitNotFound(habit_id))?;
        Ok(self.derive_habit_status(habit, day, self.clock.today()))
    }

    /// True when the week of `date` has habits and all are completed that day.
    pub fn day_completed(&self, date: impl Into<DayBucket>) -> bool {
        let day = start_of_day(date);
        let today = self.clock.today();
        let habits = self.habits_for_week(day);
        !habits.is_empty()
            && habits.iter().all(|habit| {
                self.derive_habit_status(habit, day, today) == ProgressStatus::Completed
            })
    }

    /// `day_completed` for every day of the month containing `date`.
    pub fn month_overview(&self, date: impl Into<DayBucket>) -> Vec<DayCompletion> {
        days_of_month(date)
            .into_iter()
            .map(|day| DayCompletion {
                day,
                completed: self.day_completed(day),
            })
            .collect()
    }

    fn derive_sub_habit_status(
        &self,
        sub_habit: &SubHabit,
        day: DayBucket,
        today: DayBucket,
    ) -> ProgressStatus {
        let count = self.sub_habit_progress(sub_habit.id, day);
        ProgressStatus::derive(count, sub_habit.target, day, today)
    }

    fn derive_habit_status(&self, habit: &Habit, day: DayBucket, today: DayBucket) -> ProgressStatus {
        let statuses = habit
            .sub_habits
            .iter()
            .map(|sub_habit| self.derive_sub_habit_status(sub_habit, day, today));
        ProgressStatus::combine(statuses, day, today)
    }

    fn position_in_week(&self, habit_id: HabitId, week: WeekBucket) -> StoreResult<usize> {
        self.weeks
            .get(&week)
            .and_then(|habits| habits.iter().position(|habit| habit.id == habit_id))
            .ok_or(HabitStoreError::HabitNotFound(habit_id))
    }

    fn index_habit(&mut self, habit: Habit) {
        self.habit_weeks.insert(habit.id, habit.week_of);
        for sub_habit in &habit.sub_habits {
            self.sub_habit_owners.insert(sub_habit.id, habit.id);
        }
        self.weeks.entry(habit.week_of).or_default().push(habit);
    }
}

fn persist<T>(event: &'static str, result: RepoResult<T>) -> StoreResult<T> {
    result.map_err(|err| {
        error!("event={event} module=habit_store status=error error_code=repo_failed error={err}");
        HabitStoreError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::{HabitStore, HabitStoreError, NewHabit};
    use crate::calendar::{DayBucket, FixedClock};
    use crate::model::habit::{Habit, HabitId, SubHabit};
    use crate::model::progress::ProgressRecord;
    use crate::repo::habit_repo::HabitRepository;
    use crate::repo::{RepoError, RepoResult};
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};

    /// In-memory repository whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyRepo {
        fail_writes: Cell<bool>,
        writes: RefCell<usize>,
    }

    impl FlakyRepo {
        fn write(&self) -> RepoResult<()> {
            if self.fail_writes.get() {
                return Err(RepoError::InvalidData("disk unavailable".to_string()));
            }
            *self.writes.borrow_mut() += 1;
            Ok(())
        }
    }

    impl HabitRepository for &FlakyRepo {
        fn fetch_all_habits(&self) -> RepoResult<Vec<Habit>> {
            Ok(Vec::new())
        }

        fn insert_habit(&self, _habit: &Habit) -> RepoResult<()> {
            self.write()
        }

        fn update_habit_title(&self, _habit_id: HabitId, _title: &str) -> RepoResult<()> {
            self.write()
        }

        fn insert_sub_habit(&self, _habit_id: HabitId, _sub_habit: &SubHabit) -> RepoResult<()> {
            self.write()
        }

        fn fetch_all_progress(&self) -> RepoResult<Vec<ProgressRecord>> {
            Ok(Vec::new())
        }

        fn upsert_progress(&self, _record: &ProgressRecord) -> RepoResult<()> {
            self.write()
        }
    }

    fn day(d: u32) -> DayBucket {
        DayBucket::from(NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date"))
    }

    #[test]
    fn failed_writes_leave_memory_untouched() {
        let repo = FlakyRepo::default();
        let mut store = HabitStore::load(&repo, FixedClock::new(day(3))).unwrap();
        let habit = store
            .add_habit(NewHabit::new("Read", "Read 10 pages"), day(3))
            .unwrap();
        let sub_habit_id = habit.sub_habits[0].id;
        store.set_progress(sub_habit_id, day(3), 1).unwrap();

        repo.fail_writes.set(true);
        assert!(matches!(
            store.add_habit(NewHabit::new("Run", "5k"), day(3)),
            Err(HabitStoreError::Repo(_))
        ));
        assert!(store.rename_habit(habit.id, "Study", day(3)).is_err());
        assert!(store.add_sub_habit(habit.id, "Notes", 1, day(3)).is_err());
        assert!(store.increment(sub_habit_id, day(3)).is_err());

        assert_eq!(store.habits_for_week(day(3)).len(), 1);
        assert_eq!(store.habits_for_week(day(3))[0], habit);
        assert_eq!(store.sub_habit_progress(sub_habit_id, day(3)), 1);
        assert_eq!(*repo.writes.borrow(), 2);
    }

    #[test]
    fn rejected_requests_never_reach_the_repository() {
        let repo = FlakyRepo::default();
        let mut store = HabitStore::load(&repo, FixedClock::new(day(3))).unwrap();

        assert!(matches!(
            store.add_habit(NewHabit::new("  ", "Read"), day(3)),
            Err(HabitStoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_habit(NewHabit::new("Read", "Read").with_target(0), day(3)),
            Err(HabitStoreError::Validation(_))
        ));
        assert!(matches!(
            store.rename_habit(HabitId::new_v4(), "Study", day(3)),
            Err(HabitStoreError::HabitNotFound(_))
        ));
        assert_eq!(*repo.writes.borrow(), 0);
    }
}
