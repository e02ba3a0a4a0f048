// src/session.rs
//! Orchestration layer: one method per user-facing action.
//!
//! A `Session` owns the options, the credential provider, the record store
//! and the persisted [`SessionState`]. Every action resolves to an
//! [`Outcome`]; state is saved after each action that changes it. `&mut self`
//! keeps one action in flight at a time.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::{CredentialProvider, Token};
use crate::config::SyncOptions;
use crate::config::consts::DENSITY_SETTLE_MS;
use crate::error::{Outcome, SyncError};
use crate::extract::{Extractor, widen_density};
use crate::model::{PageInfo, PageModel, RosterMember};
use crate::normalize::{header_label, normalize_or_synthetic};
use crate::progress::Progress;
use crate::reconcile::{ApplyReport, MarkApplier, Reconciler};
use crate::roster::MergeReport;
use crate::store::{RangeSelector, RecordStore, SessionState};
use crate::upload::{UploadOutcome, Uploader};
use crate::view::LiveView;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub records: usize,
    pub date_labels: Vec<String>,
    /// The record was empty and a header for today was substituted.
    pub synthetic_header: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub matched: usize,
    pub unmatched: usize,
    pub planned: usize,
    #[serde(flatten)]
    pub report: ApplyReport,
    /// Targeted cells that read as present after dispatch.
    pub confirmed: usize,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    #[serde(flatten)]
    pub counts: MergeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
    pub names: Vec<RosterMember>,
    pub message: String,
}

pub struct Session<C, S> {
    opts: SyncOptions,
    creds: C,
    store: S,
    state: SessionState,
}

impl<C: CredentialProvider, S: RecordStore> Session<C, S> {
    /// Open a session, restoring state from `opts.state_path`.
    pub fn open(opts: SyncOptions, creds: C, store: S) -> Result<Self, SyncError> {
        opts.validate()?;
        let state = SessionState::load(&opts.state_path)?;
        logd!(
            "Session opened: {} roster names, attendance {}",
            state.roster.len(),
            if state.attendance.is_some() { "loaded" } else { "not loaded" }
        );
        Ok(Self { opts, creds, store, state })
    }

    pub fn options(&self) -> &SyncOptions { &self.opts }

    pub fn state(&self) -> &SessionState { &self.state }

    pub fn store(&self) -> &S { &self.store }

    fn save(&self) -> Result<(), SyncError> {
        self.state.save(&self.opts.state_path)
    }

    async fn token(&mut self) -> Result<Token, SyncError> {
        if let Some(t) = &self.state.token {
            return Ok(t.clone());
        }
        let t = self.creds.acquire(self.opts.interactive_auth).await?;
        self.state.token = Some(t.clone());
        self.save()?;
        Ok(t)
    }

    async fn on_attendance_page<V: LiveView>(&self, view: &V) -> Result<(), SyncError> {
        let marker = self.opts.page_marker.to_lowercase();
        let headings = view.page_headings().await;
        if headings.iter().any(|h| h.to_lowercase().contains(&marker)) {
            return Ok(());
        }
        logw!("Page guard: none of {headings:?} mentions `{}`", self.opts.page_marker);
        Err(SyncError::NotFound(s!("not on the attendance page")))
    }

    /* ---------------- Actions ---------------- */

    /// Acquire a fresh credential, replacing any cached one.
    pub async fn authorize(&mut self) -> Outcome<bool> {
        self.authorize_inner().await.into()
    }

    async fn authorize_inner(&mut self) -> Result<bool, SyncError> {
        let t = self.creds.acquire(self.opts.interactive_auth).await?;
        self.state.token = Some(t);
        self.save()?;
        logf!("Authorized");
        Ok(true)
    }

    /// Read and normalize the attendance table; the result replaces the
    /// stored attendance map.
    pub async fn load_attendance(&mut self, today: NaiveDate) -> Outcome<LoadSummary> {
        self.load_inner(today).await.into()
    }

    async fn load_inner(&mut self, today: NaiveDate) -> Result<LoadSummary, SyncError> {
        let token = self.token().await?;
        let range = RangeSelector::parse(&self.opts.attendance_range())?;
        let grid = self.store.read(&token, &self.opts.record_id, &range).await?;
        let synthetic_header = grid.is_empty();

        let (grid, records) = normalize_or_synthetic(grid, today);
        let date_labels: Vec<String> = grid
            .first()
            .map(|h| h.iter().skip(1).filter_map(|c| header_label(c)).collect())
            .unwrap_or_default();

        let message = if records.is_empty() {
            s!("No attendance rows in the record")
        } else {
            format!("Loaded {} members across {} dates", records.len(), date_labels.len())
        };
        logf!("{message}");

        let summary = LoadSummary { records: records.len(), date_labels, synthetic_header, message };
        self.state.attendance = Some(records);
        self.save()?;
        Ok(summary)
    }

    /// Mark present on the live page every date the stored attendance says
    /// present and the page does not.
    pub async fn apply_attendance<V: LiveView>(&mut self, view: &mut V) -> Outcome<ApplySummary> {
        self.apply_inner(view).await.into()
    }

    async fn apply_inner<V: LiveView>(&mut self, view: &mut V) -> Result<ApplySummary, SyncError> {
        let Some(records) = self.state.attendance.as_deref() else {
            return Err(SyncError::NotFound(s!("No attendance data found. Load the attendance record first.")));
        };
        self.on_attendance_page(view).await?;

        let extractor = Extractor::new(&self.opts)?;
        let page = extractor.extract(view).await?;
        if let Err(e) = ensure_reconcilable(&page) {
            if !e.is_absorbed() {
                return Err(e);
            }
            logw!("{e}");
            return Ok(ApplySummary { message: e.to_string(), ..Default::default() });
        }

        let plan = Reconciler::new(self.opts.match_mode).plan(records, &page);
        let applier = MarkApplier::new(&self.opts);
        let report = applier.apply(view, &plan.mutations).await?;
        let confirmed = applier.verify(view, &plan.mutations).await?;

        Ok(ApplySummary {
            matched: plan.matched,
            unmatched: plan.unmatched,
            planned: plan.count(),
            report,
            confirmed,
            message: format!("Successfully updated {} attendance records.", report.dispatched),
        })
    }

    /// Read the names on the current page of the live table into the roster.
    pub async fn extract_names<V: LiveView>(&mut self, view: &mut V, progress: &mut dyn Progress)
        -> Outcome<ExtractionStats>
    {
        self.extract_inner(view, progress).await.into()
    }

    async fn extract_inner<V: LiveView>(&mut self, view: &mut V, progress: &mut dyn Progress)
        -> Result<ExtractionStats, SyncError>
    {
        self.on_attendance_page(view).await?;

        let settle = Duration::from_millis(DENSITY_SETTLE_MS);
        if widen_density(view, &self.opts.density_value, settle).await {
            progress.log(&format!("Showing {} rows per page", self.opts.density_value));
        }

        let page = Extractor::new(&self.opts)?.extract(view).await?;
        progress.begin(page.entities.len());
        let found: Vec<RosterMember> = page
            .entities
            .iter()
            .map(|e| RosterMember::new(e.display_name.clone(), e.gender.clone()))
            .collect();

        let counts = self.state.roster.merge(found);
        progress.page_done(page.pagination, counts.current_page_count);
        self.save()?;
        progress.finish();

        let message = match &page.pagination {
            Some(p) => format!(
                "{}: {} names on this page, {} new, {} total",
                p.message(), counts.current_page_count, counts.newly_added_count, counts.total_unique_count
            ),
            None => format!(
                "Extracted {} names, {} new, {} total",
                counts.current_page_count, counts.newly_added_count, counts.total_unique_count
            ),
        };

        Ok(ExtractionStats {
            counts,
            page_info: page.pagination,
            names: self.state.roster.sorted_for_display(),
            message,
        })
    }

    /// Clear the roster only.
    pub fn reset_extraction(&mut self) -> Outcome<usize> {
        let cleared = self.state.roster.len();
        self.state.roster.reset();
        let res = self.save().map(|_| cleared);
        if res.is_ok() {
            logf!("Extracted names have been reset ({cleared} cleared)");
        }
        res.into()
    }

    /// Roster in discovery order.
    pub fn extracted_names(&self) -> Outcome<Vec<RosterMember>> {
        Outcome::ok(self.state.roster.snapshot())
    }

    /// Upload roster names missing from the external record.
    pub async fn send_names(&mut self, today: NaiveDate) -> Outcome<UploadOutcome> {
        self.send_inner(today).await.into()
    }

    async fn send_inner(&mut self, today: NaiveDate) -> Result<UploadOutcome, SyncError> {
        if self.state.roster.is_empty() {
            return Err(SyncError::NotFound(s!("No extracted names to send")));
        }
        let token = self.token().await?;
        let out = Uploader::new(&self.store, &self.opts)
            .upload(&token, self.state.roster.members(), today)
            .await?;
        logf!("{}", out.message());
        Ok(out)
    }

    /// Forget everything: token, attendance and roster.
    pub fn reset_all(&mut self) -> Outcome<bool> {
        self.state = SessionState::default();
        let res = SessionState::clear(&self.opts.state_path).map(|_| true);
        if res.is_ok() {
            logf!("Session reset; authorize again to continue");
        }
        res.into()
    }
}

/// A page with no date columns or no member rows has nothing to reconcile.
fn ensure_reconcilable<R>(page: &PageModel<R>) -> Result<(), SyncError> {
    if page.date_labels.is_empty() {
        return Err(SyncError::EmptySource(s!("could not find dates on the attendance page")));
    }
    if page.entities.is_empty() {
        return Err(SyncError::EmptySource(s!("could not find members on the attendance page")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredential;
    use crate::store::CsvRecordStore;
    use crate::view::HtmlView;
    use std::fs;
    use std::path::PathBuf;

    const PAGE: &str = r#"
        <title>Class and Quorum Attendance</title>
        <table>
          <tr><th></th><th>Name</th><th>Gender</th><th>15 Jun</th></tr>
          <tr><td>&gt;</td><td><a href="/1">Alice Smith</a></td><td>F</td><td><input type="checkbox"></td></tr>
          <tr><td>&gt;</td><td><a href="/2">Bob Jones</a></td><td>M</td><td><input type="checkbox"></td></tr>
        </table>"#;

    fn setup(name: &str) -> (PathBuf, SyncOptions) {
        let mut dir = std::env::temp_dir();
        dir.push(format!("attendance_sync_session_{name}"));
        let _ = fs::remove_dir_all(&dir);
        let opts = SyncOptions {
            record_id: dir.join("records").to_string_lossy().to_string(),
            state_path: dir.join("session.json"),
            dispatch_delay_ms: 0,
            ..SyncOptions::default()
        };
        (dir, opts)
    }

    fn session(opts: SyncOptions) -> Session<StaticCredential, CsvRecordStore> {
        let creds = StaticCredential::new(Some(Token::new("local").unwrap()));
        Session::open(opts, creds, CsvRecordStore::default()).unwrap()
    }

    fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 15).unwrap() }

    #[tokio::test]
    async fn apply_without_load_is_not_found() {
        let (dir, opts) = setup("no_load");
        let mut s = session(opts);
        let out = s.apply_attendance(&mut HtmlView::parse(PAGE)).await;
        assert!(!out.success);
        assert!(out.error.unwrap().contains("No attendance data found"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn page_guard_rejects_other_pages() {
        let (dir, opts) = setup("guard");
        let mut s = session(opts);
        s.state.attendance = Some(Vec::new());
        let mut view = HtmlView::parse("<title>Home</title><table></table>");
        let out = s.apply_attendance(&mut view).await;
        assert!(out.error.unwrap().contains("not on the attendance page"));

        let out = s.extract_names(&mut view, &mut crate::progress::NullProgress).await;
        assert!(!out.success);
        let _ = fs::remove_dir_all(&dir);
    }

    fn loaded(s: &mut Session<StaticCredential, CsvRecordStore>) {
        let grid = vec![row!["Name", "6/15/2024"], row!["Alice", "TRUE"], row!["Bob", "TRUE"]];
        s.state.attendance = Some(crate::normalize::normalize(&grid));
    }

    #[tokio::test]
    async fn page_without_dates_is_an_empty_success() {
        let (dir, opts) = setup("no_dates");
        let mut s = session(opts);
        loaded(&mut s);
        let mut view = HtmlView::parse(
            r#"<title>Class and Quorum Attendance</title>
            <table>
              <tr><th></th><th>Name</th><th>Gender</th></tr>
              <tr><td>&gt;</td><td><a href="/1">Alice Smith</a></td><td>F</td><td><input type="checkbox"></td></tr>
            </table>"#,
        );
        let out = s.apply_attendance(&mut view).await;
        assert!(out.success);
        let summary = out.into_result().unwrap();
        assert_eq!(summary.planned, 0);
        assert_eq!(summary.report.dispatched, 0);
        assert!(summary.message.contains("could not find dates"));
        assert!(view.dispatched().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn page_without_members_is_an_empty_success() {
        let (dir, opts) = setup("no_members");
        let mut s = session(opts);
        loaded(&mut s);
        let mut view = HtmlView::parse(
            r#"<title>Class and Quorum Attendance</title>
            <table>
              <tr><th></th><th>Name</th><th>Gender</th><th>15 Jun</th></tr>
              <tr><td>&gt;</td><td>Alice Smith</td><td>F</td><td><input type="checkbox"></td></tr>
            </table>"#,
        );
        let out = s.apply_attendance(&mut view).await;
        assert!(out.success);
        let summary = out.into_result().unwrap();
        assert_eq!((summary.matched, summary.planned), (0, 0));
        assert!(summary.message.contains("could not find members"));
        assert!(view.dispatched().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn only_empty_pages_are_rejected() {
        let page = |dates: Vec<String>, names: &[&str]| PageModel {
            date_labels: dates,
            entities: names
                .iter()
                .map(|n| crate::model::PageEntity { display_name: s!(*n), gender: None, row: 0usize, marks: Vec::new() })
                .collect(),
            pagination: None,
        };
        let err = ensure_reconcilable(&page(Vec::new(), &["Alice"])).unwrap_err();
        assert!(err.is_absorbed());
        assert!(ensure_reconcilable(&page(vec![s!("15 Jun")], &[])).unwrap_err().is_absorbed());
        assert!(ensure_reconcilable(&page(vec![s!("15 Jun")], &["Alice"])).is_ok());
    }

    #[tokio::test]
    async fn missing_table_fails_load() {
        let (dir, opts) = setup("missing_table");
        let mut s = session(opts);
        let out = s.load_attendance(today()).await;
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("Not found"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn extract_then_reset_persists() {
        let (dir, opts) = setup("extract");
        let path = opts.state_path.clone();
        let mut s = session(opts.clone());
        let mut view = HtmlView::parse(PAGE);

        let stats = s.extract_names(&mut view, &mut crate::progress::NullProgress).await.into_result().unwrap();
        assert_eq!(stats.counts.newly_added_count, 2);
        assert_eq!(stats.names[0].gender.as_deref(), Some("F"));

        let again = s.extract_names(&mut view, &mut crate::progress::NullProgress).await.into_result().unwrap();
        assert_eq!(again.counts.newly_added_count, 0);
        assert_eq!(again.counts.total_unique_count, 2);

        let reopened = session(opts.clone());
        assert_eq!(reopened.state().roster.len(), 2);

        assert_eq!(s.reset_extraction().into_result().unwrap(), 2);
        assert!(s.extracted_names().into_result().unwrap().is_empty());

        assert!(s.reset_all().success);
        assert!(!path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn send_with_empty_roster_fails() {
        let (dir, opts) = setup("send_empty");
        let mut s = session(opts);
        let out = s.send_names(today()).await;
        assert!(out.error.unwrap().contains("No extracted names"));
        let _ = fs::remove_dir_all(&dir);
    }
}
