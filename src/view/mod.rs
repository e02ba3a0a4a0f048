// src/view/mod.rs
//! # Live view boundary
//!
//! The live attendance table is an external collaborator. This module fixes
//! the shape the rest of the crate sees it through:
//!
//! - [`LiveView`]: structural reads (headers, rows, single cells, density
//!   control, pagination text) and fire-and-forget mutation dispatch.
//! - [`CellSnapshot`]: the capabilities a cell exposes (checkbox state, class
//!   names, glyph shape data). Classification into present/empty happens in
//!   [`probe`], never inside a view implementation.
//! - [`snapshot::HtmlView`]: a view over a saved HTML page, used by the CLI
//!   and by tests.
//!
//! Row handles (`LiveView::Row`) are opaque. They address mutations and are
//! never compared or hashed by the engine.

pub mod probe;
pub mod snapshot;

use crate::error::SyncError;

pub use probe::{CheckboxProbe, ClassProbe, GlyphProbe, MarkProbe, ProbeChain};
pub use snapshot::HtmlView;

/// Capabilities one table cell exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellSnapshot {
    pub text: String,
    /// `Some(checked)` when the cell holds a boolean input control.
    pub checkbox: Option<bool>,
    pub classes: Vec<String>,
    /// Shape data of a graphical marker (e.g. an SVG path), when present.
    pub glyph: Option<String>,
}

/// One data row as read from the view.
#[derive(Clone, Debug)]
pub struct RowSnapshot<R> {
    pub handle: R,
    /// Text of the row's navigable identity cell (a link), if it has one.
    pub name: Option<String>,
    pub cells: Vec<CellSnapshot>,
}

/// Structural access to the live table.
///
/// All methods may suspend. `dispatch_mark` reports that the click was
/// dispatched, not that the control changed state.
#[allow(async_fn_in_trait)]
pub trait LiveView {
    type Row: Clone + std::fmt::Debug;
    type Control;

    /// Page title and main heading texts, used to check we are on the right page.
    async fn page_headings(&self) -> Vec<String>;

    /// Raw text of every cell in the first header row, left to right.
    async fn query_date_headers(&self) -> Result<Vec<String>, SyncError>;

    async fn query_rows(&self) -> Result<Vec<RowSnapshot<Self::Row>>, SyncError>;

    /// Fresh read of one cell; `None` when the row or cell no longer exists.
    async fn query_cell(&self, row: &Self::Row, cell_index: usize)
        -> Result<Option<CellSnapshot>, SyncError>;

    async fn dispatch_mark(&mut self, row: &Self::Row, cell_index: usize) -> Result<(), SyncError>;

    async fn query_density_control(&self) -> Option<Self::Control>;

    /// Returns whether the control accepted `value`.
    async fn set_density(&mut self, control: &Self::Control, value: &str) -> Result<bool, SyncError>;

    /// Visible text around the table that may hold a pagination indicator.
    async fn pagination_text(&self) -> Option<String>;
}
