// src/view/snapshot.rs
//
// `LiveView` over a saved HTML page of the attendance table.
//
// Reads the first <table>: the first <tr> holding <th> cells is the header
// row; every other <tr> holding <td> cells is a data row, named by its first
// <a> link. A dispatched mark toggles the addressed cell in memory the way a
// click would, so a re-read shows the new state.

use std::path::Path;

use super::{CellSnapshot, LiveView, RowSnapshot};
use crate::config::consts::{CHECKED_GLYPH_HINT, MARKED_CLASS};
use crate::core::html::{
    attr_value, class_list, elements_ci, first_element_ci, has_attr, inner_after_open_tag,
    next_element_ci, open_tag, open_tags_ci, strip_tags, text_of_first,
};
use crate::error::SyncError;

#[derive(Clone, Debug)]
struct HtmlRow {
    name: Option<String>,
    cells: Vec<CellSnapshot>,
}

/// Rows-per-page `<select>` found on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensitySelect {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct HtmlView {
    headings: Vec<String>,
    headers: Vec<String>,
    rows: Vec<HtmlRow>,
    density: Option<DensitySelect>,
    pagination: Option<String>,
    dispatched: Vec<(usize, usize)>,
}

impl HtmlView {
    pub fn parse(doc: &str) -> Self {
        let headings = ["title", "h1"]
            .iter()
            .filter_map(|t| text_of_first(doc, t))
            .collect();

        let (table, outside) = match next_element_ci(doc, "table", 0) {
            Some((a, b)) => (&doc[a..b], join!(&doc[..a], " ", &doc[b..])),
            None => ("", s!(doc)),
        };

        let mut headers = Vec::new();
        let mut rows = Vec::new();
        for tr in elements_ci(table, "tr") {
            let ths = elements_ci(tr, "th");
            if headers.is_empty() && !ths.is_empty() {
                headers = ths.iter().map(|th| strip_tags(inner_after_open_tag(th))).collect();
                continue;
            }
            let tds = elements_ci(tr, "td");
            if tds.is_empty() { continue; }
            rows.push(HtmlRow {
                name: text_of_first(tr, "a"),
                cells: tds.iter().map(|td| parse_cell(td)).collect(),
            });
        }

        let density = first_element_ci(&outside, "select").map(parse_select);
        let pagination = Some(strip_tags(&outside)).filter(|t| !t.is_empty());

        logd!("HTML snapshot: {} headers, {} rows", headers.len(), rows.len());
        Self { headings, headers, rows, density, pagination, dispatched: Vec::new() }
    }

    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let doc = std::fs::read_to_string(path)?;
        Ok(Self::parse(&doc))
    }

    /// `(row, cell)` pairs dispatched so far, in order.
    pub fn dispatched(&self) -> &[(usize, usize)] {
        &self.dispatched
    }

    pub fn density(&self) -> Option<&DensitySelect> {
        self.density.as_ref()
    }

    fn cell(&self, row: usize, cell: usize) -> Option<&CellSnapshot> {
        self.rows.get(row)?.cells.get(cell)
    }
}

fn parse_cell(td: &str) -> CellSnapshot {
    let checkbox = open_tags_ci(td, "input")
        .into_iter()
        .find(|t| attr_value(t, "type").is_some_and(|v| v.eq_ignore_ascii_case("checkbox")))
        .map(|t| has_attr(t, "checked"));

    let mut classes = class_list(open_tag(td));
    for tag in ["div", "span", "button"] {
        for open in open_tags_ci(td, tag) {
            classes.extend(class_list(open));
        }
    }

    let glyph = first_element_ci(td, "svg").and_then(|svg| {
        let path = open_tags_ci(svg, "path").into_iter().next()?;
        let mut shape = s!();
        if let Some(rule) = attr_value(path, "fill-rule") {
            shape.push_str(&format!("fill-rule=\"{rule}\" "));
        }
        shape.push_str(&attr_value(path, "d").unwrap_or_default());
        Some(shape)
    });

    CellSnapshot { text: strip_tags(inner_after_open_tag(td)), checkbox, classes, glyph }
}

fn parse_select(select: &str) -> DensitySelect {
    let mut options = Vec::new();
    let mut selected = None;
    for opt in elements_ci(select, "option") {
        let open = open_tag(opt);
        let value = attr_value(open, "value").unwrap_or_else(|| strip_tags(inner_after_open_tag(opt)));
        if has_attr(open, "selected") {
            selected = Some(value.clone());
        }
        options.push(value);
    }
    DensitySelect { options, selected }
}

/// What a click does to a cell: flip whichever control it carries.
fn toggle(cell: &mut CellSnapshot) {
    if let Some(checked) = cell.checkbox {
        cell.checkbox = Some(!checked);
    } else if let Some(i) = cell.classes.iter().position(|c| c.eq_ignore_ascii_case(MARKED_CLASS)) {
        cell.classes.remove(i);
    } else if let Some(shape) = &cell.glyph {
        cell.glyph = Some(if shape.contains(CHECKED_GLYPH_HINT) {
            s!("outline")
        } else {
            format!("fill-rule=\"{CHECKED_GLYPH_HINT}\"")
        });
    } else {
        cell.classes.push(s!(MARKED_CLASS));
    }
}

impl LiveView for HtmlView {
    type Row = usize;
    type Control = DensitySelect;

    async fn page_headings(&self) -> Vec<String> {
        self.headings.clone()
    }

    async fn query_date_headers(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.headers.clone())
    }

    async fn query_rows(&self) -> Result<Vec<RowSnapshot<usize>>, SyncError> {
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| RowSnapshot { handle: i, name: r.name.clone(), cells: r.cells.clone() })
            .collect())
    }

    async fn query_cell(&self, row: &usize, cell_index: usize) -> Result<Option<CellSnapshot>, SyncError> {
        Ok(self.cell(*row, cell_index).cloned())
    }

    async fn dispatch_mark(&mut self, row: &usize, cell_index: usize) -> Result<(), SyncError> {
        match self.rows.get_mut(*row).and_then(|r| r.cells.get_mut(cell_index)) {
            Some(cell) => {
                toggle(cell);
                self.dispatched.push((*row, cell_index));
            }
            None => logw!("No cell {cell_index} in row {row}; click not dispatched"),
        }
        Ok(())
    }

    async fn query_density_control(&self) -> Option<DensitySelect> {
        self.density.clone()
    }

    async fn set_density(&mut self, control: &DensitySelect, value: &str) -> Result<bool, SyncError> {
        if !control.options.iter().any(|o| o == value) {
            return Ok(false);
        }
        if let Some(d) = self.density.as_mut() {
            d.selected = Some(s!(value));
        }
        Ok(true)
    }

    async fn pagination_text(&self) -> Option<String> {
        self.pagination.clone()
    }
}
