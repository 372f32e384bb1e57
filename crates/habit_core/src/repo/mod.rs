//! Persistence gateway: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the load/insert/update contracts the stores depend on.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

use crate::db::DbError;
use crate::model::diary::DiaryValidationError;
use crate::model::habit::HabitValidationError;
use crate::model::progress::ProgressValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod diary_repo;
pub mod habit_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by habit and diary persistence.
#[derive(Debug)]
pub enum RepoError {
    HabitValidation(HabitValidationError),
    DiaryValidation(DiaryValidationError),
    ProgressValidation(ProgressValidationError),
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HabitValidation(err) => write!(f, "{err}"),
            Self::DiaryValidation(err) => write!(f, "{err}"),
            Self::ProgressValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HabitValidation(err) => Some(err),
            Self::DiaryValidation(err) => Some(err),
            Self::ProgressValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<HabitValidationError> for RepoError {
    fn from(value: HabitValidationError) -> Self {
        Self::HabitValidation(value)
    }
}

impl From<DiaryValidationError> for RepoError {
    fn from(value: DiaryValidationError) -> Self {
        Self::DiaryValidation(value)
    }
}

impl From<ProgressValidationError> for RepoError {
    fn from(value: ProgressValidationError) -> Self {
        Self::ProgressValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }
    Ok(())
}
