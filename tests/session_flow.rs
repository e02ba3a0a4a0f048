// tests/session_flow.rs
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use attendance_sync::auth::{StaticCredential, Token};
use attendance_sync::csv::parse_rows;
use attendance_sync::progress::NullProgress;
use attendance_sync::store::CsvRecordStore;
use attendance_sync::upload::UploadOutcome;
use attendance_sync::view::HtmlView;
use attendance_sync::{Session, SyncOptions};

const PAGE_ONE: &str = r#"
<title>Class and Quorum Attendance</title>
<label>Rows <select><option value="25" selected>25</option><option value="100">100</option></select></label>
<table>
  <tr><th></th><th>Name</th><th>Gender</th><th>15 Jun</th></tr>
  <tr><td>&gt;</td><td><a href="/1">Alice Smith</a></td><td>F</td><td><input type="checkbox"></td></tr>
  <tr><td>&gt;</td><td><a href="/2">Eve Adams</a></td><td>F</td><td><input type="checkbox"></td></tr>
</table>
<p>Page 1 of 2</p>"#;

const PAGE_TWO: &str = r#"
<h1>Class and Quorum Attendance</h1>
<table>
  <tr><th></th><th>Name</th><th>Gender</th><th>15 Jun</th></tr>
  <tr><td>&gt;</td><td><a href="/2">Eve Adams</a></td><td>F</td><td><input type="checkbox"></td></tr>
  <tr><td>&gt;</td><td><a href="/3">Carl Diaz</a></td><td>M</td><td><input type="checkbox" checked></td></tr>
</table>
<p>Page 2 of 2</p>"#;

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("attendance_sync_flow_{}", name));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

fn setup(name: &str) -> (PathBuf, SyncOptions) {
    let dir = tmp_dir(name);
    let records = dir.join("records");
    fs::create_dir_all(&records).unwrap();
    fs::write(
        records.join("attendance.csv"),
        "Name,Gender,6/15/2024\nAlice Smith,F,TRUE\nBob Brown,M,TRUE\n",
    )
    .unwrap();
    let opts = SyncOptions {
        record_id: records.to_string_lossy().to_string(),
        state_path: dir.join("state").join("session.json"),
        dispatch_delay_ms: 0,
        ..SyncOptions::default()
    };
    (dir, opts)
}

fn open(opts: SyncOptions) -> Session<StaticCredential, CsvRecordStore> {
    let creds = StaticCredential::new(Some(Token::new("local").unwrap()));
    Session::open(opts, creds, CsvRecordStore::default()).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn load_then_apply_marks_alice() {
    let (dir, opts) = setup("apply");
    let mut session = open(opts);

    let loaded = session.load_attendance(day(2024, 6, 20)).await.into_result().unwrap();
    assert_eq!(loaded.records, 2);
    // "Gender" is not a date and survives verbatim next to "15 Jun".
    assert_eq!(loaded.date_labels, vec!["Gender", "15 Jun"]);
    assert!(!loaded.synthetic_header);

    let mut view = HtmlView::parse(PAGE_ONE);
    let applied = session.apply_attendance(&mut view).await.into_result().unwrap();
    assert_eq!(applied.planned, 1);
    assert_eq!(applied.report.dispatched, 1);
    assert_eq!(applied.confirmed, 1);
    assert_eq!(view.dispatched(), &[(0, 3)]);

    let again = session.apply_attendance(&mut view).await.into_result().unwrap();
    assert_eq!(again.planned, 0);
    assert_eq!(view.dispatched().len(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn empty_record_gets_a_synthetic_header() {
    let (dir, opts) = setup("empty");
    fs::write(PathBuf::from(&opts.record_id).join("attendance.csv"), "").unwrap();
    let mut session = open(opts);

    let loaded = session.load_attendance(day(2024, 6, 15)).await.into_result().unwrap();
    assert_eq!(loaded.records, 0);
    assert!(loaded.synthetic_header);
    assert_eq!(loaded.date_labels, vec!["15 Jun"]);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn extract_across_pages_then_upload_new_names() {
    let (dir, mut opts) = setup("upload");
    opts.table = "roster".into();
    let record_dir = PathBuf::from(&opts.record_id);
    fs::write(
        record_dir.join("roster.csv"),
        "Name,Gender,Current Date\nAlice Smith,F,6/1/2024\n",
    )
    .unwrap();
    let mut session = open(opts.clone());

    let mut one = HtmlView::parse(PAGE_ONE);
    let s1 = session.extract_names(&mut one, &mut NullProgress).await.into_result().unwrap();
    assert_eq!(one.density().unwrap().selected.as_deref(), Some("100"));
    assert_eq!(s1.counts.newly_added_count, 2);
    assert_eq!(s1.page_info.map(|p| p.current_page), Some(1));

    let mut two = HtmlView::parse(PAGE_TWO);
    let s2 = session.extract_names(&mut two, &mut NullProgress).await.into_result().unwrap();
    assert_eq!(s2.counts.current_page_count, 2);
    assert_eq!(s2.counts.newly_added_count, 1);
    assert_eq!(s2.counts.total_unique_count, 3);
    assert!(s2.message.starts_with("Page 2 of 2"));

    // Roster survives a restart.
    let mut session = open(opts.clone());
    let names: Vec<String> = session.extracted_names().into_result().unwrap().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["Alice Smith", "Eve Adams", "Carl Diaz"]);

    let out = session.send_names(day(2024, 6, 15)).await.into_result().unwrap();
    let UploadOutcome::Appended(report) = out else { panic!("expected an append") };
    assert_eq!(report.names, vec!["Eve Adams", "Carl Diaz"]);
    assert!(report.sorted);

    let text = fs::read_to_string(record_dir.join("roster.csv")).unwrap();
    let rows = parse_rows(&text, ',');
    let col: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(col, vec!["Name", "Alice Smith", "Carl Diaz", "Eve Adams"]);
    assert_eq!(rows[2], vec!["Carl Diaz", "M", "6/15/2024"]);

    // Second upload has nothing to do and writes nothing.
    let out = session.send_names(day(2024, 6, 16)).await.into_result().unwrap();
    assert!(matches!(out, UploadOutcome::NothingToDo { existing: 3 }));
    assert_eq!(fs::read_to_string(record_dir.join("roster.csv")).unwrap(), text);

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn upload_creates_missing_table() {
    let (dir, mut opts) = setup("create");
    opts.table = "new_roster".into();
    let mut session = open(opts.clone());
    session.extract_names(&mut HtmlView::parse(PAGE_TWO), &mut NullProgress).await.into_result().unwrap();

    let out = session.send_names(day(2024, 6, 15)).await.into_result().unwrap();
    let UploadOutcome::Appended(report) = out else { panic!("expected an append") };
    assert!(report.created_table);

    let text = fs::read_to_string(PathBuf::from(&opts.record_id).join("new_roster.csv")).unwrap();
    assert_eq!(text, "Name,Gender,Current Date\nCarl Diaz,M,6/15/2024\nEve Adams,F,6/15/2024\n");
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_credential_surfaces_not_authorized() {
    let (dir, opts) = setup("unauth");
    let mut session = Session::open(opts, StaticCredential::new(None), CsvRecordStore::default()).unwrap();
    let out = session.load_attendance(day(2024, 6, 15)).await;
    assert!(!out.success);
    assert!(out.error.unwrap().starts_with("Not authorized"));
    let _ = fs::remove_dir_all(&dir);
}
