//! Diary repository contract and SQLite implementation.
//!
//! # Invariants
//! - `diary_entries.day` is unique; writes upsert on it.
//! - An upsert keeps the id already stored for the day and reports it.

use crate::calendar::DayBucket;
use crate::model::diary::{DiaryEntry, DiaryEntryId};
use crate::repo::{ensure_tables, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface the diary store depends on.
pub trait DiaryRepository {
    fn fetch_all_entries(&self) -> RepoResult<Vec<DiaryEntry>>;
    /// Inserts the entry or replaces the text of the entry stored for its day.
    ///
    /// Returns the id of the stored row, which differs from `entry.id` when
    /// the day already had a row.
    fn upsert_entry(&self, entry: &DiaryEntry) -> RepoResult<DiaryEntryId>;
}

/// SQLite-backed diary repository.
pub struct SqliteDiaryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDiaryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["diary_entries"])?;
        Ok(Self { conn })
    }
}

impl DiaryRepository for SqliteDiaryRepository<'_> {
    fn fetch_all_entries(&self) -> RepoResult<Vec<DiaryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, day, thoughts, emotions
             FROM diary_entries
             ORDER BY day ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn upsert_entry(&self, entry: &DiaryEntry) -> RepoResult<DiaryEntryId> {
        entry.validate()?;
        let stored: String = self.conn.query_row(
            "INSERT INTO diary_entries (uuid, day, thoughts, emotions)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (day) DO UPDATE SET
                thoughts = excluded.thoughts,
                emotions = excluded.emotions,
                updated_at = (strftime('%s', 'now') * 1000)
             RETURNING uuid;",
            params![
                entry.id.to_string(),
                entry.day.to_db_text(),
                entry.thoughts.as_str(),
                entry.emotions.as_str(),
            ],
            |row| row.get(0),
        )?;
        parse_uuid(&stored, "diary_entries.uuid")
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<DiaryEntry> {
    let uuid_text: String = row.get("uuid")?;
    let day_text: String = row.get("day")?;
    let day = DayBucket::parse(&day_text)
        .map_err(|err| RepoError::InvalidData(format!("diary_entries.day: {err}")))?;

    let entry = DiaryEntry {
        id: parse_uuid(&uuid_text, "diary_entries.uuid")?,
        day,
        thoughts: row.get("thoughts")?,
        emotions: row.get("emotions")?,
    };
    entry.validate()?;
    Ok(entry)
}
