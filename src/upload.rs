// src/upload.rs
//! Upload merger: push roster entries that the external record lacks.
//!
//! Existing names come from the name column of the target table. Only new
//! names are appended, as `(name, gender, today M/D/YYYY)`. A missing table is
//! created with the `(Name, Gender, Current Date)` header first. After the
//! append the data rows are sorted by name; a failed sort is logged and does
//! not fail the upload. No new names means no write at all.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::Token;
use crate::config::SyncOptions;
use crate::config::consts::UPLOAD_HEADERS;
use crate::error::SyncError;
use crate::model::RosterMember;
use crate::normalize::us_date;
use crate::store::{RangeSelector, RecordStore};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Every roster name already exists; nothing written.
    NothingToDo { existing: usize },
    Appended(UploadReport),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub appended: usize,
    pub created_table: bool,
    pub sorted: bool,
    pub names: Vec<String>,
}

impl UploadOutcome {
    pub fn appended(&self) -> usize {
        match self {
            UploadOutcome::NothingToDo { .. } => 0,
            UploadOutcome::Appended(r) => r.appended,
        }
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::NothingToDo { .. } => s!("No new names to upload"),
            UploadOutcome::Appended(r) => format!("Uploaded {} new names", r.appended),
        }
    }
}

/// Roster entries whose names are not in `existing`, roster order kept.
pub fn new_entries<'r>(roster: &'r [RosterMember], existing: &HashSet<String>) -> Vec<&'r RosterMember> {
    roster.iter().filter(|m| !existing.contains(&m.name)).collect()
}

pub fn upload_row(member: &RosterMember, today: NaiveDate) -> Vec<String> {
    row![member.name.as_str(), member.gender.as_deref().unwrap_or(""), us_date(today)]
}

pub struct Uploader<'a, S> {
    store: &'a S,
    opts: &'a SyncOptions,
}

impl<'a, S: RecordStore> Uploader<'a, S> {
    pub fn new(store: &'a S, opts: &'a SyncOptions) -> Self {
        Self { store, opts }
    }

    async fn existing_names(&self, token: &Token) -> Result<HashSet<String>, SyncError> {
        let range = RangeSelector::column(&self.opts.table, 0);
        let col = self.store.read(token, &self.opts.record_id, &range).await?;
        Ok(col
            .into_iter()
            .skip(1)
            .filter_map(|r| r.into_iter().next())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect())
    }

    pub async fn upload(&self, token: &Token, roster: &[RosterMember], today: NaiveDate)
        -> Result<UploadOutcome, SyncError>
    {
        let rec = self.opts.record_id.as_str();
        let table = self.opts.table.as_str();

        let found = self.store.find_table(token, rec, table).await?;
        let existing = match &found {
            Some(_) => self.existing_names(token).await?,
            None => HashSet::new(),
        };

        let fresh = new_entries(roster, &existing);
        if fresh.is_empty() {
            logf!("Upload: all {} roster names already in `{table}`", roster.len());
            return Ok(UploadOutcome::NothingToDo { existing: existing.len() });
        }

        let created_table = found.is_none();
        let table_id = match found {
            Some(id) => id,
            None => {
                let id = self.store.create_table(token, rec, table).await?;
                let header: Vec<String> = UPLOAD_HEADERS.iter().map(|h| s!(*h)).collect();
                self.store.append(token, rec, table, &[header]).await?;
                id
            }
        };

        let rows: Vec<Vec<String>> = fresh.iter().map(|m| upload_row(m, today)).collect();
        let appended = self.store.append(token, rec, table, &rows).await?;
        logf!("Upload: appended {appended} names to `{table}`");

        let sort_range = RangeSelector::parse(&self.opts.attendance_range())?;
        let sorted = match self.store.sort(token, rec, &table_id, &sort_range).await {
            Ok(()) => true,
            Err(e) => {
                loge!("Sorting `{table}` failed: {e}");
                false
            }
        };

        Ok(UploadOutcome::Appended(UploadReport {
            appended,
            created_table,
            sorted,
            names: fresh.iter().map(|m| m.name.clone()).collect(),
        }))
    }
}
