//! Habit/progress repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist habits with their sub-habits and the daily progress ledger.
//! - Load the full data set so the habit store can re-bucket it in memory.
//!
//! # Invariants
//! - A habit and its initial sub-habits are written in one transaction.
//! - Habit order within a week and sub-habit order within a habit are
//!   persisted (`sort_order`, `position`) and restored on load.
//! - At most one progress row per `(sub_habit_uuid, day)`.
//! - A progress row's `habit_uuid` is the habit owning its sub-habit.

use crate::calendar::{DayBucket, WeekBucket};
use crate::model::habit::{Habit, HabitCategory, HabitId, HabitValidationError, SubHabit};
use crate::model::progress::ProgressRecord;
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// Repository interface the habit store depends on.
pub trait HabitRepository {
    /// Loads every habit with sub-habits, ordered by week then insertion.
    fn fetch_all_habits(&self) -> RepoResult<Vec<Habit>>;
    /// Inserts a new habit and all of its sub-habits atomically.
    fn insert_habit(&self, habit: &Habit) -> RepoResult<()>;
    fn update_habit_title(&self, habit_id: HabitId, title: &str) -> RepoResult<()>;
    /// Appends one sub-habit after the existing ones.
    fn insert_sub_habit(&self, habit_id: HabitId, sub_habit: &SubHabit) -> RepoResult<()>;
    fn fetch_all_progress(&self) -> RepoResult<Vec<ProgressRecord>>;
    /// Inserts the record, or overwrites the count of the row already
    /// stored for the same sub-habit and day.
    ///
    /// Fails with `NotFound` for an unknown sub-habit and `InvalidData`
    /// when `habit_id` does not own it.
    fn upsert_progress(&self, record: &ProgressRecord) -> RepoResult<()>;
}

/// SQLite-backed habit repository.
pub struct SqliteHabitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["habits", "sub_habits", "habit_progress"])?;
        Ok(Self { conn })
    }
}

impl HabitRepository for SqliteHabitRepository<'_> {
    fn fetch_all_habits(&self) -> RepoResult<Vec<Habit>> {
        let mut sub_habits_by_habit = load_sub_habits(self.conn)?;

        let mut stmt = self.conn.prepare(
            "SELECT uuid, title, category, week_of
             FROM habits
             ORDER BY week_of ASC, sort_order ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            let mut habit = parse_habit_row(row)?;
            habit.sub_habits = sub_habits_by_habit.remove(&habit.id).unwrap_or_default();
            habit.validate()?;
            habits.push(habit);
        }

        if let Some(orphan) = sub_habits_by_habit.keys().next() {
            return Err(RepoError::InvalidData(format!(
                "sub_habits reference unknown habit `{orphan}`"
            )));
        }

        Ok(habits)
    }

    fn insert_habit(&self, habit: &Habit) -> RepoResult<()> {
        habit.validate()?;
        let habit_uuid = habit.id.to_string();
        let week_of = habit.week_of.to_db_text();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO habits (uuid, title, category, week_of, sort_order)
             VALUES (
                ?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM habits WHERE week_of = ?4)
             );",
            params![
                habit_uuid.as_str(),
                habit.title.as_str(),
                habit.category.as_str(),
                week_of.as_str(),
            ],
        )?;
        for (position, sub_habit) in habit.sub_habits.iter().enumerate() {
            tx.execute(
                "INSERT INTO sub_habits (uuid, habit_uuid, title, target, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    sub_habit.id.to_string(),
                    habit_uuid.as_str(),
                    sub_habit.title.as_str(),
                    sub_habit.target,
                    position as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_habit_title(&self, habit_id: HabitId, title: &str) -> RepoResult<()> {
        if title.trim().is_empty() {
            return Err(HabitValidationError::BlankTitle.into());
        }

        let changed = self.conn.execute(
            "UPDATE habits
             SET
                title = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![habit_id.to_string(), title],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(habit_id));
        }
        Ok(())
    }

    fn insert_sub_habit(&self, habit_id: HabitId, sub_habit: &SubHabit) -> RepoResult<()> {
        sub_habit.validate()?;
        let habit_uuid = habit_id.to_string();

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE habits
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [habit_uuid.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(habit_id));
        }
        tx.execute(
            "INSERT INTO sub_habits (uuid, habit_uuid, title, target, position)
             VALUES (
                ?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM sub_habits WHERE habit_uuid = ?2)
             );",
            params![
                sub_habit.id.to_string(),
                habit_uuid.as_str(),
                sub_habit.title.as_str(),
                sub_habit.target,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn fetch_all_progress(&self) -> RepoResult<Vec<ProgressRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, habit_uuid, sub_habit_uuid, day, count
             FROM habit_progress
             ORDER BY day ASC, sub_habit_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_progress_row(row)?);
        }
        Ok(records)
    }

    fn upsert_progress(&self, record: &ProgressRecord) -> RepoResult<()> {
        record.validate()?;
        let owner: Option<String> = self
            .conn
            .query_row(
                "SELECT habit_uuid FROM sub_habits WHERE uuid = ?1;",
                [record.sub_habit_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Err(RepoError::NotFound(record.sub_habit_id));
        };
        if parse_uuid(&owner, "sub_habits.habit_uuid")? != record.habit_id {
            return Err(RepoError::InvalidData(format!(
                "progress for sub-habit {} names habit {} but the owner is {owner}",
                record.sub_habit_id, record.habit_id
            )));
        }

        self.conn.execute(
            "INSERT INTO habit_progress (uuid, habit_uuid, sub_habit_uuid, day, count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (sub_habit_uuid, day) DO UPDATE SET
                count = excluded.count,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                record.id.to_string(),
                record.habit_id.to_string(),
                record.sub_habit_id.to_string(),
                record.day.to_db_text(),
                record.count,
            ],
        )?;
        Ok(())
    }
}

fn load_sub_habits(conn: &Connection) -> RepoResult<HashMap<HabitId, Vec<SubHabit>>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, habit_uuid, title, target
         FROM sub_habits
         ORDER BY habit_uuid ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<HabitId, Vec<SubHabit>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let habit_text: String = row.get("habit_uuid")?;
        let sub_habit = SubHabit {
            id: parse_uuid(&uuid_text, "sub_habits.uuid")?,
            title: row.get("title")?,
            target: row.get("target")?,
        };
        sub_habit.validate()?;
        grouped
            .entry(parse_uuid(&habit_text, "sub_habits.habit_uuid")?)
            .or_default()
            .push(sub_habit);
    }
    Ok(grouped)
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category")?;
    let category = HabitCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in habits.category"
        ))
    })?;
    let week_text: String = row.get("week_of")?;
    let week_of = WeekBucket::parse(&week_text)
        .map_err(|err| RepoError::InvalidData(format!("habits.week_of: {err}")))?;

    Ok(Habit {
        id: parse_uuid(&uuid_text, "habits.uuid")?,
        title: row.get("title")?,
        category,
        sub_habits: Vec::new(),
        week_of,
    })
}

fn parse_progress_row(row: &Row<'_>) -> RepoResult<ProgressRecord> {
    let uuid_text: String = row.get("uuid")?;
    let habit_text: String = row.get("habit_uuid")?;
    let sub_habit_text: String = row.get("sub_habit_uuid")?;
    let day_text: String = row.get("day")?;
    let day = DayBucket::parse(&day_text)
        .map_err(|err| RepoError::InvalidData(format!("habit_progress.day: {err}")))?;

    let record = ProgressRecord {
        id: parse_uuid(&uuid_text, "habit_progress.uuid")?,
        habit_id: parse_uuid(&habit_text, "habit_progress.habit_uuid")?,
        sub_habit_id: parse_uuid(&sub_habit_text, "habit_progress.sub_habit_uuid")?,
        day,
        count: row.get("count")?,
    };
    record.validate()?;
    Ok(record)
}
