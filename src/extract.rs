// src/extract.rs
//! Page model extractor: live view → `(date labels, entities)`.
//!
//! Header layout: the first `name_header_cells` non-empty headers belong to
//! the name column; after that, every non-empty header that is not a reserved
//! attribute label (e.g. "Gender") is a date column, left to right.
//!
//! Row layout: rows without a named identity link are not entities. Date
//! cells start after `leading_columns` cells and are classified by the probe
//! chain. Empty outputs are not errors here; the orchestration layer decides
//! what "nothing to reconcile" means.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::SyncOptions;
use crate::error::SyncError;
use crate::model::{CellMark, PageEntity, PageInfo, PageModel};
use crate::view::{LiveView, ProbeChain, RowSnapshot};

static RANGE_OF_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*[-–]\s*(\d+)\s*(?:of|/)\s*(\d+)").expect("valid pagination regex")
});
static PAGE_N_OF_M: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)page\s+(\d+)\s+of\s+(\d+)").expect("valid pagination regex")
});

/// Parse `"<start>-<end> of|/ <total>"` or `"page <n> of <m>"`.
///
/// A range that ends at the total is the last page and may be short, so its
/// length says nothing about the page size. There the size is `page_size`
/// when it fits (`start - 1` is a whole number of such pages), otherwise the
/// smallest size that does.
pub fn parse_pagination(text: &str, page_size: Option<usize>) -> Option<PageInfo> {
    if let Some(c) = RANGE_OF_TOTAL.captures(text) {
        let start: usize = c[1].parse().ok()?;
        let end: usize = c[2].parse().ok()?;
        let total: usize = c[3].parse().ok()?;
        if start == 0 || end < start {
            return None;
        }
        let shown = end - start + 1;
        let size = if end < total || start == 1 {
            shown
        } else {
            last_page_size(start - 1, shown, page_size)
        };
        let total_pages = total.div_ceil(size).max(1);
        let current_page = if end >= total { total_pages } else { end.div_ceil(size) };
        return Some(PageInfo { current_page, total_pages, total_entries: Some(total) });
    }
    let c = PAGE_N_OF_M.captures(text)?;
    Some(PageInfo {
        current_page: c[1].parse().ok()?,
        total_pages: c[2].parse().ok()?,
        total_entries: None,
    })
}

/// Page size behind a last page that follows `before` entries.
fn last_page_size(before: usize, shown: usize, hint: Option<usize>) -> usize {
    let fits = |size: usize| size >= shown && before % size == 0;
    if let Some(h) = hint.filter(|&h| h > 0 && fits(h)) {
        return h;
    }
    (shown..=before).find(|&size| fits(size)).unwrap_or(shown)
}

/// Best-effort rows-per-page widening. Missing control or rejected value
/// leaves the page as it is.
pub async fn widen_density<V: LiveView>(view: &mut V, value: &str, settle: Duration) -> bool {
    let Some(control) = view.query_density_control().await else {
        logd!("No density control on page; keeping current page size");
        return false;
    };
    match view.set_density(&control, value).await {
        Ok(true) => {
            logf!("Requested {value} rows per page");
            tokio::time::sleep(settle).await;
            true
        }
        Ok(false) => {
            logd!("Density control does not offer {value}");
            false
        }
        Err(e) => {
            logw!("Density change failed: {e}");
            false
        }
    }
}

pub struct Extractor<'a> {
    opts: &'a SyncOptions,
    probes: ProbeChain,
    date_filter: Option<Regex>,
}

impl<'a> Extractor<'a> {
    pub fn new(opts: &'a SyncOptions) -> Result<Self, SyncError> {
        let date_filter = match &opts.date_header_pattern {
            Some(p) => Some(
                Regex::new(p).map_err(|e| SyncError::Config(format!("date_header_pattern: {e}")))?,
            ),
            None => None,
        };
        Ok(Self { opts, probes: ProbeChain::standard(), date_filter })
    }

    pub fn with_probes(mut self, probes: ProbeChain) -> Self {
        self.probes = probes;
        self
    }

    pub fn date_labels(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .skip(self.opts.name_header_cells)
            .filter(|h| !self.opts.is_reserved_label(h))
            .filter(|h| self.date_filter.as_ref().is_none_or(|re| re.is_match(h)))
            .map(str::to_string)
            .collect()
    }

    /// Entities with exactly `date_count` marks each.
    pub fn entities<R>(&self, rows: Vec<RowSnapshot<R>>, date_count: usize) -> Vec<PageEntity<R>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(name) = row.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
                continue;
            };

            let mut marks: Vec<CellMark> = row
                .cells
                .iter()
                .skip(self.opts.leading_columns)
                .take(date_count)
                .map(|c| self.probes.classify(c))
                .collect();
            marks.resize(date_count, CellMark::Empty);

            let gender = row
                .cells
                .get(self.opts.gender_column)
                .map(|c| c.text.trim().to_string())
                .filter(|g| !g.is_empty());

            out.push(PageEntity { display_name: name, gender, row: row.handle, marks });
        }
        out
    }

    /// Read the current page of the view.
    pub async fn extract<V: LiveView>(&self, view: &V) -> Result<PageModel<V::Row>, SyncError> {
        let headers = view.query_date_headers().await?;
        let date_labels = self.date_labels(&headers);
        let rows = view.query_rows().await?;
        let entities = self.entities(rows, date_labels.len());
        let page_size = self.opts.density_value.trim().parse().ok();
        let pagination = view
            .pagination_text()
            .await
            .and_then(|t| parse_pagination(&t, page_size));

        logf!(
            "Extracted {} dates and {} entities{}",
            date_labels.len(),
            entities.len(),
            pagination.map(|p| format!(" ({})", p.message())).unwrap_or_default()
        );
        Ok(PageModel { date_labels, entities, pagination })
    }
}
