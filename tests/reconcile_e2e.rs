// tests/reconcile_e2e.rs
use attendance_sync::config::SyncOptions;
use attendance_sync::extract::Extractor;
use attendance_sync::model::{CellMark, Grid};
use attendance_sync::normalize::normalize;
use attendance_sync::reconcile::{ApplyReport, MarkApplier, Reconciler};
use attendance_sync::view::HtmlView;
use attendance_sync::{MatchMode, row};

const PAGE: &str = r#"
<html><head><title>Class and Quorum Attendance</title></head><body>
<table>
  <thead><tr><th></th><th>Name</th><th>Gender</th><th>15 Jun</th><th>22 Jun</th></tr></thead>
  <tbody>
    <tr><td>&gt;</td><td><a href="/m/1">Smith, Alice</a></td><td>F</td>
        <td><input type="checkbox"></td>
        <td><svg><path d="M12 2a10 10 0 1 0 0 20"/></svg></td></tr>
    <tr><td>&gt;</td><td><a href="/m/2">Jones, Bob</a></td><td>M</td>
        <td><input type="checkbox" checked></td>
        <td><svg><path d="M12 2a10 10 0 1 0 0 20"/></svg></td></tr>
    <tr><td>&gt;</td><td><a href="/m/3">Visitor, Vic</a></td><td></td>
        <td><input type="checkbox"></td><td><input type="checkbox"></td></tr>
  </tbody>
</table>
<div>Showing 1-3 of 3</div>
</body></html>"#;

fn record() -> Grid {
    vec![
        row!["Name", "6/15/2024", "6/22/2024", "Notes"],
        row!["Alice", "TRUE", "true", "x"],
        row!["Bob", "TRUE", "FALSE", ""],
        row!["", "TRUE", "TRUE", ""],
    ]
}

fn opts() -> SyncOptions {
    SyncOptions { dispatch_delay_ms: 0, ..SyncOptions::default() }
}

#[tokio::test]
async fn marks_only_missing_presence_and_is_idempotent() {
    let opts = opts();
    let records = normalize(&record());
    assert_eq!(records.len(), 2);

    let mut view = HtmlView::parse(PAGE);
    let page = Extractor::new(&opts).unwrap().extract(&view).await.unwrap();
    assert_eq!(page.date_labels, vec!["15 Jun", "22 Jun"]);
    assert_eq!(page.entities.len(), 3);
    assert_eq!(page.pagination.map(|p| p.total_pages), Some(1));

    let plan = Reconciler::new(MatchMode::Substring).plan(&records, &page);
    // Alice: both dates; Bob: 15 Jun already checked, 22 Jun absent in record.
    assert_eq!(plan.count(), 2);
    assert_eq!((plan.matched, plan.unmatched), (2, 1));

    let applier = MarkApplier::new(&opts);
    let first = applier.apply(&mut view, &plan.mutations).await.unwrap();
    assert_eq!(first, ApplyReport { dispatched: 2, already_marked: 0, missing: 0 });
    assert_eq!(applier.verify(&view, &plan.mutations).await.unwrap(), 2);
    assert_eq!(view.dispatched(), &[(0, 3), (0, 4)]);

    // Replaying the same list dispatches nothing.
    let second = applier.apply(&mut view, &plan.mutations).await.unwrap();
    assert_eq!(second, ApplyReport { dispatched: 0, already_marked: 2, missing: 0 });
    assert_eq!(view.dispatched().len(), 2);

    // A fresh plan over the updated page is empty.
    let page = Extractor::new(&opts).unwrap().extract(&view).await.unwrap();
    assert_eq!(page.entities[0].marks, vec![CellMark::Present, CellMark::Present]);
    assert!(Reconciler::new(MatchMode::Substring).plan(&records, &page).is_empty());
}

#[tokio::test]
async fn exact_mode_needs_identical_names() {
    let opts = opts();
    let records = normalize(&record());
    let view = HtmlView::parse(PAGE);
    let page = Extractor::new(&opts).unwrap().extract(&view).await.unwrap();

    let plan = Reconciler::new(MatchMode::Exact).plan(&records, &page);
    assert!(plan.is_empty());
    assert_eq!(plan.unmatched, 3);
}

#[tokio::test]
async fn reverse_mode_matches_short_page_names() {
    let opts = opts();
    let records = normalize(&vec![row!["Name", "6/15/2024"], row!["Vic Visitor, Vic", "TRUE"]]);
    let view = HtmlView::parse(PAGE);
    let page = Extractor::new(&opts).unwrap().extract(&view).await.unwrap();

    let plan = Reconciler::new(MatchMode::ReverseSubstring).plan(&records, &page);
    assert_eq!(plan.count(), 1);
    assert_eq!(plan.mutations[0].name, "Visitor, Vic");
}
