// src/normalize.rs
//! Tabular normalizer: external record grid → `AttendanceRecord`s.
//!
//! Grid shape: row 0 holds headers, column 0 of every row holds the name.
//! Each non-empty header after the name column becomes a date label: parsed
//! as a calendar date and re-rendered as `<day> <Mon>` ("15 Jun"), or kept
//! verbatim when it does not parse. Empty input is an empty result.

use chrono::{Datelike, NaiveDate};

use crate::model::{AttendanceRecord, Grid, Mark};

/// Header date layouts accepted, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%a %b %d %Y",
];

pub fn parse_header_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if t.is_empty() { return None; }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

/// "15 Jun" style label for a calendar date.
pub fn date_label(date: NaiveDate) -> String {
    format!("{} {}", date.day(), date.format("%b"))
}

/// `M/D/YYYY`, no zero padding.
pub fn us_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// Label for one header cell; `None` for blank headers (column ignored).
pub fn header_label(header: &str) -> Option<String> {
    if header.trim().is_empty() { return None; }
    match parse_header_date(header) {
        Some(d) => Some(date_label(d)),
        None => {
            logd!("Header {header:?} is not a date, keeping it verbatim");
            Some(s!(header))
        }
    }
}

/// Header row a caller can substitute when the record is empty.
pub fn synthetic_header(today: NaiveDate) -> Vec<String> {
    row!["Name", us_date(today)]
}

/// Normalize a raw grid. Deterministic: same grid, same output.
pub fn normalize(grid: &[Vec<String>]) -> Vec<AttendanceRecord> {
    let Some((headers, rows)) = grid.split_first() else {
        return Vec::new();
    };

    let labels: Vec<Option<String>> = headers
        .iter()
        .enumerate()
        .map(|(j, h)| if j == 0 { None } else { header_label(h) })
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let name = match row.first() {
            Some(n) if !n.is_empty() => n,
            _ => continue,
        };

        let mut record = AttendanceRecord::new(name.clone());
        for (j, label) in labels.iter().enumerate() {
            let Some(label) = label else { continue };
            let cell = row.get(j).map(String::as_str).unwrap_or("");
            record.marks.insert(label.clone(), Mark::from_cell(cell));
        }
        out.push(record);
    }

    logd!("Normalized {} records over {} date columns", out.len(), labels.iter().flatten().count());
    out
}

/// Normalize, substituting a synthetic header when the grid is empty.
pub fn normalize_or_synthetic(grid: Grid, today: NaiveDate) -> (Grid, Vec<AttendanceRecord>) {
    let grid = if grid.is_empty() {
        logf!("External record is empty; using a synthetic header for {}", us_date(today));
        vec![synthetic_header(today)]
    } else {
        grid
    };
    let records = normalize(&grid);
    (grid, records)
}
