//! Diary store: one free-text entry per calendar day.
//!
//! # Invariants
//! - At most one entry per day bucket; updates keep the existing entry id.
//! - Memory is only mutated after the repository write succeeded.
//! - The cached entry id is the one storage reports after each upsert.

use crate::calendar::{start_of_day, start_of_week, DayBucket};
use crate::model::diary::DiaryEntry;
use crate::repo::diary_repo::DiaryRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum DiaryStoreError {
    Repo(RepoError),
}

impl Display for DiaryStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DiaryStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for DiaryStoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Day-keyed diary aggregate backed by a repository.
pub struct DiaryStore<R: DiaryRepository> {
    repo: R,
    entries: BTreeMap<DayBucket, DiaryEntry>,
}

impl<R: DiaryRepository> DiaryStore<R> {
    /// Loads all persisted entries and buckets them by day.
    pub fn load(repo: R) -> Result<Self, DiaryStoreError> {
        let entries = repo
            .fetch_all_entries()?
            .into_iter()
            .map(|entry| (entry.day, entry))
            .collect::<BTreeMap<_, _>>();
        info!(
            "event=diary_store_load module=diary_store status=ok entries={}",
            entries.len()
        );
        Ok(Self { repo, entries })
    }

    pub fn entry(&self, date: impl Into<DayBucket>) -> Option<&DiaryEntry> {
        self.entries.get(&start_of_day(date))
    }

    /// Replaces the text of the day's entry, creating the entry if needed.
    pub fn update_entry(
        &mut self,
        date: impl Into<DayBucket>,
        thoughts: impl Into<String>,
        emotions: impl Into<String>,
    ) -> Result<DiaryEntry, DiaryStoreError> {
        let day = start_of_day(date);
        let mut entry = match self.entries.get(&day) {
            Some(existing) => DiaryEntry {
                thoughts: thoughts.into(),
                emotions: emotions.into(),
                ..existing.clone()
            },
            None => DiaryEntry::new(day, thoughts, emotions),
        };
        entry.id = match self.repo.upsert_entry(&entry) {
            Ok(stored_id) => stored_id,
            Err(err) => {
                error!(
                    "event=diary_update module=diary_store status=error error_code=repo_failed day={} error={}",
                    day, err
                );
                return Err(err.into());
            }
        };
        self.entries.insert(day, entry.clone());

        info!(
            "event=diary_update module=diary_store status=ok entry_id={} day={}",
            entry.id, day
        );
        Ok(entry)
    }

    /// Entries written during the week containing `date`, Monday first.
    pub fn entries_for_week(&self, date: impl Into<DayBucket>) -> Vec<&DiaryEntry> {
        let week = start_of_week(date);
        let days = week.days();
        match (days.first(), days.last()) {
            (Some(first), Some(last)) => self
                .entries
                .range(*first..=*last)
                .map(|(_, entry)| entry)
                .collect(),
            _ => Vec::new(),
        }
    }
}
