// src/reconcile.rs
//! Reconciler: attendance records × page model → pending mutations.
//!
//! One direction only: a cell is flipped when the record says `present` for
//! that date label and the page does not show it as present. Marks are never
//! cleared, and a date the record knows nothing about is left alone.
//!
//! Applying is a separate step ([`MarkApplier`]). Right before each dispatch
//! the target cell is re-read and skipped if it already shows present, so
//! replaying the same mutation list is harmless. A dispatch means the click
//! was sent; [`MarkApplier::verify`] is the only thing that confirms state.

use std::time::Duration;

use serde::Serialize;

use crate::config::{MatchMode, SyncOptions};
use crate::core::sanitize::fold_name;
use crate::error::SyncError;
use crate::model::{AttendanceRecord, CellMark, PageModel, PendingMutation};
use crate::view::{LiveView, ProbeChain};

pub struct Reconciler {
    mode: MatchMode,
}

/// Mutations to apply, plus how many entities found a record.
#[derive(Clone, Debug)]
pub struct ReconcilePlan<R> {
    pub mutations: Vec<PendingMutation<R>>,
    pub matched: usize,
    pub unmatched: usize,
}

impl<R> ReconcilePlan<R> {
    pub fn count(&self) -> usize { self.mutations.len() }
    pub fn is_empty(&self) -> bool { self.mutations.is_empty() }
}

impl Reconciler {
    pub fn new(mode: MatchMode) -> Self { Self { mode } }

    pub fn mode(&self) -> MatchMode { self.mode }

    pub fn matches(&self, record_name: &str, entity_name: &str) -> bool {
        match self.mode {
            MatchMode::Exact => record_name.trim() == entity_name.trim(),
            MatchMode::Substring => {
                let rec = fold_name(record_name);
                !rec.is_empty() && fold_name(entity_name).contains(&rec)
            }
            MatchMode::ReverseSubstring => {
                let ent = fold_name(entity_name);
                !ent.is_empty() && fold_name(record_name).contains(&ent)
            }
        }
    }

    /// First record in scan order that matches. Overlapping names
    /// ("Ann" vs "Ann Lee", "Ann Smith") resolve to whichever comes first.
    pub fn find_record<'r>(&self, records: &'r [AttendanceRecord], entity_name: &str)
        -> Option<&'r AttendanceRecord>
    {
        records.iter().find(|r| self.matches(&r.name, entity_name))
    }

    pub fn plan<R: Clone>(&self, records: &[AttendanceRecord], page: &PageModel<R>) -> ReconcilePlan<R> {
        let mut mutations = Vec::new();
        let mut matched = 0usize;

        for entity in &page.entities {
            let Some(record) = self.find_record(records, &entity.display_name) else {
                continue;
            };
            matched += 1;

            for (i, label) in page.date_labels.iter().enumerate() {
                if record.is_present(label) && entity.mark_at(i) != CellMark::Present {
                    mutations.push(PendingMutation {
                        row: entity.row.clone(),
                        date_index: i,
                        name: entity.display_name.clone(),
                    });
                }
            }
        }

        let unmatched = page.entities.len() - matched;
        logf!(
            "Reconciled {} entities ({} matched, {} unmatched): {} marks to add",
            page.entities.len(), matched, unmatched, mutations.len()
        );
        ReconcilePlan { mutations, matched, unmatched }
    }
}

/// Result of one dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Click sent; the control may update later.
    Dispatched,
    /// Idempotence guard: the cell already showed present.
    AlreadyMarked,
    /// Row or cell no longer on the page.
    Missing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub dispatched: usize,
    pub already_marked: usize,
    pub missing: usize,
}

impl ApplyReport {
    fn record(&mut self, status: DispatchStatus) {
        match status {
            DispatchStatus::Dispatched => self.dispatched += 1,
            DispatchStatus::AlreadyMarked => self.already_marked += 1,
            DispatchStatus::Missing => self.missing += 1,
        }
    }
}

pub struct MarkApplier {
    probes: ProbeChain,
    leading_columns: usize,
    delay: Duration,
}

impl MarkApplier {
    pub fn new(opts: &SyncOptions) -> Self {
        Self {
            probes: ProbeChain::standard(),
            leading_columns: opts.leading_columns,
            delay: Duration::from_millis(opts.dispatch_delay_ms),
        }
    }

    pub fn with_probes(mut self, probes: ProbeChain) -> Self {
        self.probes = probes;
        self
    }

    /// Page cell index for a date index.
    pub fn cell_index(&self, date_index: usize) -> usize {
        date_index + self.leading_columns
    }

    /// `None` when the cell is gone, else whether it shows present right now.
    async fn already_marked<V: LiveView>(&self, view: &V, row: &V::Row, cell: usize)
        -> Result<Option<bool>, SyncError>
    {
        let snap = view.query_cell(row, cell).await?;
        Ok(snap.map(|c| self.probes.classify(&c) == CellMark::Present))
    }

    pub async fn dispatch_one<V: LiveView>(&self, view: &mut V, m: &PendingMutation<V::Row>)
        -> Result<DispatchStatus, SyncError>
    {
        let cell = self.cell_index(m.date_index);
        match self.already_marked(view, &m.row, cell).await? {
            None => {
                logw!("Cell {cell} for {} is gone; skipping", m.name);
                Ok(DispatchStatus::Missing)
            }
            Some(true) => {
                logd!("{} already marked at date {}; skipping", m.name, m.date_index);
                Ok(DispatchStatus::AlreadyMarked)
            }
            Some(false) => {
                tokio::time::sleep(self.delay).await;
                view.dispatch_mark(&m.row, cell).await?;
                logd!("Dispatched mark for {} at date {}", m.name, m.date_index);
                Ok(DispatchStatus::Dispatched)
            }
        }
    }

    pub async fn apply<V: LiveView>(&self, view: &mut V, mutations: &[PendingMutation<V::Row>])
        -> Result<ApplyReport, SyncError>
    {
        let mut report = ApplyReport::default();
        for m in mutations {
            report.record(self.dispatch_one(view, m).await?);
        }
        logf!(
            "Applied marks: {} dispatched, {} already marked, {} missing",
            report.dispatched, report.already_marked, report.missing
        );
        Ok(report)
    }

    /// How many targeted cells now read as present.
    pub async fn verify<V: LiveView>(&self, view: &V, mutations: &[PendingMutation<V::Row>])
        -> Result<usize, SyncError>
    {
        let mut confirmed = 0usize;
        for m in mutations {
            if self.already_marked(view, &m.row, self.cell_index(m.date_index)).await? == Some(true) {
                confirmed += 1;
            }
        }
        Ok(confirmed)
    }
}
