// src/store.rs
//! Tabular record store boundary and the local implementations.
//!
//! - [`RecordStore`]: read a range, find/create a table, append rows, sort.
//! - [`RangeSelector`]: A1-style `Table!A:Z` selectors.
//! - [`CsvRecordStore`]: one directory per record, one `<table>.csv` per table.
//! - [`SessionState`]: the caller-owned persisted state (attendance, token, roster).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::Token;
use crate::config::consts::CSV_EXT;
use crate::csv::parse_rows;
use crate::error::SyncError;
use crate::file::{append_rows, ensure_directory, read_optional, remove_if_exists, rewrite_rows, write_atomic, write_rows_start};
use crate::model::{AttendanceRecord, Grid};
use crate::roster::Roster;

/// Store-side identifier of a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(pub String);

/// `Table`, `Table!A:Z`, `Table!B2:D`, `Table!A` (single column).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeSelector {
    pub table: String,
    pub first_col: usize,
    /// Inclusive; `None` runs to the end of each row.
    pub last_col: Option<usize>,
    /// Rows skipped from the top (A2 → 1).
    pub first_row: usize,
}

impl RangeSelector {
    pub fn whole(table: impl Into<String>) -> Self {
        Self { table: table.into(), first_col: 0, last_col: None, first_row: 0 }
    }

    pub fn column(table: impl Into<String>, col: usize) -> Self {
        Self { table: table.into(), first_col: col, last_col: Some(col), first_row: 0 }
    }

    pub fn parse(sel: &str) -> Result<Self, SyncError> {
        let bad = || SyncError::Config(format!("invalid range selector `{sel}`"));
        let (table, span) = match sel.split_once('!') {
            Some((t, s)) => (t.trim().trim_matches('\''), Some(s.trim())),
            None => (sel.trim(), None),
        };
        if table.is_empty() {
            return Err(bad());
        }
        let Some(span) = span.filter(|s| !s.is_empty()) else {
            return Ok(Self::whole(table));
        };

        let (start, end) = match span.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (span, None),
        };
        let (first_col, first_row) = parse_cell_ref(start).ok_or_else(bad)?;
        let last_col = match end {
            Some(e) => Some(parse_cell_ref(e).ok_or_else(bad)?.0),
            None => Some(first_col),
        };
        if last_col.is_some_and(|l| l < first_col) {
            return Err(bad());
        }
        Ok(Self { table: s!(table), first_col, last_col, first_row })
    }

    /// Cut a full table grid down to this range.
    pub fn apply(&self, grid: Grid) -> Grid {
        grid.into_iter()
            .skip(self.first_row)
            .map(|row| {
                let end = self.last_col.map_or(row.len(), |l| (l + 1).min(row.len()));
                row.get(self.first_col.min(end)..end).map(<[String]>::to_vec).unwrap_or_default()
            })
            .collect()
    }
}

/// `"B2"` → `(1, 1)`, `"AA"` → `(26, 0)`.
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let r = r.trim();
    let split = r.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(r.len());
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let col = letters
        .bytes()
        .try_fold(0usize, |acc, b| acc.checked_mul(26)?.checked_add((b.to_ascii_uppercase() - b'A' + 1) as usize))?
        - 1;
    let row = if digits.is_empty() {
        0
    } else {
        digits.parse::<usize>().ok()?.checked_sub(1)?
    };
    Some((col, row))
}

/// External tabular record store.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn read(&self, token: &Token, record_id: &str, range: &RangeSelector) -> Result<Grid, SyncError>;

    async fn find_table(&self, token: &Token, record_id: &str, table: &str)
        -> Result<Option<TableId>, SyncError>;

    async fn create_table(&self, token: &Token, record_id: &str, table: &str) -> Result<TableId, SyncError>;

    /// Append after the current extent; returns the number of rows written.
    async fn append(&self, token: &Token, record_id: &str, table: &str, rows: &[Vec<String>])
        -> Result<usize, SyncError>;

    /// Sort rows below the header by the first column of `range`, ascending.
    async fn sort(&self, token: &Token, record_id: &str, table: &TableId, range: &RangeSelector)
        -> Result<(), SyncError>;
}

/// Record store over a directory of CSV files.
#[derive(Clone, Debug)]
pub struct CsvRecordStore {
    sep: char,
}

impl Default for CsvRecordStore {
    fn default() -> Self { Self { sep: ',' } }
}

impl CsvRecordStore {
    pub fn new(sep: char) -> Self { Self { sep } }

    fn table_path(&self, record_id: &str, table: &str) -> Result<PathBuf, SyncError> {
        let table = table.trim();
        if table.is_empty() || table.contains(['/', '\\']) || table.starts_with('.') {
            return Err(SyncError::Config(format!("invalid table name `{table}`")));
        }
        Ok(Path::new(record_id).join(format!("{table}.{CSV_EXT}")))
    }

    fn load(&self, path: &Path, what: &str) -> Result<Grid, SyncError> {
        match read_optional(path)? {
            Some(text) => Ok(parse_rows(&text, self.sep)),
            None => Err(SyncError::NotFound(format!("{what} ({})", path.display()))),
        }
    }
}

fn check_token(token: &Token) -> Result<(), SyncError> {
    if token.secret().trim().is_empty() {
        return Err(SyncError::NotAuthorized(s!("empty credential")));
    }
    Ok(())
}

impl RecordStore for CsvRecordStore {
    async fn read(&self, token: &Token, record_id: &str, range: &RangeSelector) -> Result<Grid, SyncError> {
        check_token(token)?;
        let path = self.table_path(record_id, &range.table)?;
        let grid = range.apply(self.load(&path, &format!("table `{}`", range.table))?);
        logf!("Read {} rows from {}", grid.len(), path.display());
        Ok(grid)
    }

    async fn find_table(&self, token: &Token, record_id: &str, table: &str)
        -> Result<Option<TableId>, SyncError>
    {
        check_token(token)?;
        let path = self.table_path(record_id, table)?;
        Ok(path.is_file().then(|| TableId(s!(table.trim()))))
    }

    async fn create_table(&self, token: &Token, record_id: &str, table: &str) -> Result<TableId, SyncError> {
        check_token(token)?;
        ensure_directory(Path::new(record_id))?;
        let path = self.table_path(record_id, table)?;
        if !path.exists() {
            write_rows_start(&path, None, self.sep)?;
            logf!("Created table {}", path.display());
        }
        Ok(TableId(s!(table.trim())))
    }

    async fn append(&self, token: &Token, record_id: &str, table: &str, rows: &[Vec<String>])
        -> Result<usize, SyncError>
    {
        check_token(token)?;
        let path = self.table_path(record_id, table)?;
        if !path.is_file() {
            return Err(SyncError::NotFound(format!("table `{table}` ({})", path.display())));
        }
        append_rows(&path, rows, self.sep)?;
        logd!("Appended {} rows to {}", rows.len(), path.display());
        Ok(rows.len())
    }

    async fn sort(&self, token: &Token, record_id: &str, table: &TableId, range: &RangeSelector)
        -> Result<(), SyncError>
    {
        check_token(token)?;
        let path = self.table_path(record_id, &table.0)?;
        let mut grid = self.load(&path, &format!("table `{}`", table.0))?;
        if grid.len() < 3 {
            return Ok(());
        }
        let key_col = range.first_col;
        grid[1..].sort_by_cached_key(|r| r.get(key_col).map(|c| c.to_lowercase()).unwrap_or_default());
        rewrite_rows(&path, &grid, self.sep)?;
        Ok(())
    }
}

/// Caller-owned state persisted between invocations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Last normalized attendance read; `None` until a load succeeds.
    pub attendance: Option<Vec<AttendanceRecord>>,
    pub token: Option<Token>,
    pub roster: Roster,
}

impl SessionState {
    /// Missing file → empty state.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        match read_optional(path)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)?;
        Ok(())
    }

    pub fn clear(path: &Path) -> Result<(), SyncError> {
        if remove_if_exists(path)? {
            logd!("Removed {}", path.display());
        }
        Ok(())
    }
}
