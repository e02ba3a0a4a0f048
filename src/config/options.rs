// src/config/options.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::error::SyncError;

/// How an attendance record name is matched against a page entity name.
///
/// The spreadsheet and the live page disagree on whether names are truncated
/// or decorated, so both directions and a strict mode are selectable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Record name (case-folded) is contained in the entity display name.
    #[default]
    Substring,
    /// Entity display name (case-folded) is contained in the record name.
    ReverseSubstring,
    /// Both names equal after trimming.
    Exact,
}

impl MatchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" | "contains" => Some(MatchMode::Substring),
            "reverse" | "reverse_substring" => Some(MatchMode::ReverseSubstring),
            "exact" => Some(MatchMode::Exact),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// External record id. For the CSV store this is a directory.
    pub record_id: String,
    /// Table (sheet) holding attendance and the uploaded roster.
    pub table: String,
    /// Column span read from the table, A1 notation without the table prefix.
    pub read_range: String,

    pub match_mode: MatchMode,

    /// Header labels of non-date attribute columns on the live page.
    pub reserved_labels: Vec<String>,
    /// Header cells before the first candidate date header.
    pub name_header_cells: usize,
    /// Data cells before the first date cell in each row.
    pub leading_columns: usize,
    /// Data cell holding the gender attribute.
    pub gender_column: usize,
    /// Optional regex every date header must match.
    pub date_header_pattern: Option<String>,
    /// Text the live page title must contain.
    pub page_marker: String,

    /// Rows-per-page value requested before extraction.
    pub density_value: String,
    pub dispatch_delay_ms: u64,

    pub interactive_auth: bool,
    pub state_path: PathBuf,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            record_id: s!(DEFAULT_RECORD_DIR),
            table: s!(DEFAULT_TABLE),
            read_range: s!(DEFAULT_READ_RANGE),
            match_mode: MatchMode::default(),
            reserved_labels: RESERVED_LABELS.iter().map(|l| s!(*l)).collect(),
            name_header_cells: NAME_HEADER_CELLS,
            leading_columns: LEADING_COLUMNS,
            gender_column: GENDER_COLUMN,
            date_header_pattern: None,
            page_marker: s!(PAGE_MARKER),
            density_value: s!(DENSITY_VALUE),
            dispatch_delay_ms: DISPATCH_DELAY_MS,
            interactive_auth: true,
            state_path: PathBuf::from(STORE_DIR).join(SESSION_FILE),
        }
    }
}

impl SyncOptions {
    /// Load options from a JSON file. A missing file yields defaults;
    /// a malformed one is a configuration error.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logd!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let opts: Self = serde_json::from_str(&text)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Write options as pretty JSON via a temp file + rename.
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.table.trim().is_empty() {
            return Err(SyncError::Config(s!("table name must not be empty")));
        }
        if self.gender_column >= self.leading_columns {
            return Err(SyncError::Config(format!(
                "gender_column {} must fall inside the {} leading columns",
                self.gender_column, self.leading_columns
            )));
        }
        if let Some(p) = &self.date_header_pattern {
            regex::Regex::new(p)
                .map_err(|e| SyncError::Config(format!("date_header_pattern: {e}")))?;
        }
        Ok(())
    }

    /// `<table>!<range>` selector used for attendance reads.
    pub fn attendance_range(&self) -> String {
        join!(&self.table, "!", &self.read_range)
    }

    pub fn is_reserved_label(&self, label: &str) -> bool {
        let label = label.trim();
        self.reserved_labels.iter().any(|r| r.trim().eq_ignore_ascii_case(label))
    }
}
