// src/model.rs
//
// Canonical attendance model shared by both sides of the sync.
//
// - Grid / AttendanceRecord: the external record, as read and as normalized.
// - PageEntity / PageModel: one snapshot of the live table.
// - PendingMutation: a single absent→present flip for the live table.
// - RosterMember: one entity discovered while paging through the live table.
//
// Dates are compared by their normalized label string only. Names keep their
// original casing; case folding happens at match time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw cells from the external record; row 0 is the header row.
pub type Grid = Vec<Vec<String>>;

/// Attendance value of one record cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Present,
    Absent,
}

impl Mark {
    /// `present` iff the cell text, case-folded, is exactly `true`.
    pub fn from_cell(cell: &str) -> Self {
        if cell.to_lowercase() == "true" { Mark::Present } else { Mark::Absent }
    }
}

/// State of one date cell on the live page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellMark {
    Present,
    Empty,
}

/// One row of the external record after normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub name: String,
    /// Normalized date label → mark, in header order.
    pub marks: IndexMap<String, Mark>,
}

impl AttendanceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), marks: IndexMap::new() }
    }

    /// `None` means the record carries no information for that date.
    pub fn mark(&self, label: &str) -> Option<Mark> {
        self.marks.get(label).copied()
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.mark(label) == Some(Mark::Present)
    }
}

/// One entity row read from the live table.
///
/// `row` is an opaque handle used only to address mutations; it never takes
/// part in comparisons.
#[derive(Clone, Debug)]
pub struct PageEntity<R> {
    pub display_name: String,
    pub gender: Option<String>,
    pub row: R,
    /// Aligned positionally with `PageModel::date_labels`.
    pub marks: Vec<CellMark>,
}

impl<R> PageEntity<R> {
    pub fn mark_at(&self, date_index: usize) -> CellMark {
        self.marks.get(date_index).copied().unwrap_or(CellMark::Empty)
    }
}

/// Pagination position parsed from the live table's indicator text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<usize>,
}

impl PageInfo {
    pub fn message(&self) -> String {
        match self.total_entries {
            Some(n) => format!("Page {} of {} ({} entries)", self.current_page, self.total_pages, n),
            None => format!("Page {} of {}", self.current_page, self.total_pages),
        }
    }
}

/// One snapshot of the live table.
#[derive(Clone, Debug)]
pub struct PageModel<R> {
    pub date_labels: Vec<String>,
    pub entities: Vec<PageEntity<R>>,
    pub pagination: Option<PageInfo>,
}

impl<R> PageModel<R> {
    pub fn is_empty(&self) -> bool {
        self.date_labels.is_empty() || self.entities.is_empty()
    }
}

/// Instruction to flip one live cell from empty to present.
#[derive(Clone, Debug)]
pub struct PendingMutation<R> {
    pub row: R,
    pub date_index: usize,
    /// Display name of the target row, for logs and reports.
    pub name: String,
}

/// One roster entry discovered on the live table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl RosterMember {
    pub fn new(name: impl Into<String>, gender: Option<String>) -> Self {
        Self { name: name.into(), gender }
    }
}
