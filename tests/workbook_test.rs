//! Local xlsx workbook as a tabular store

mod support;

use geo_sheet_sync::error::GeoSyncError;
use geo_sheet_sync::pass::EnrichmentPass;
use geo_sheet_sync::sheets::{TabularStore, WorkbookStore};
use geo_sync_common::{presets, Job, RangeRef};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use support::{chair_lift, StubLookup};
use tempfile::tempdir;

fn write_lift_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let lifts = workbook.add_worksheet();
    lifts.set_name("Gudauri").unwrap();
    lifts.write_string(0, 0, "name").unwrap();
    lifts.write_string(0, 1, "resort").unwrap();
    lifts.write_string(1, 0, "Gudauri Lift 3").unwrap();
    lifts.write_string(1, 1, "Gudauri").unwrap();
    lifts.write_string(2, 0, "Unknown Lift").unwrap();
    lifts.write_string(2, 1, "Gudauri").unwrap();

    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "checked 2024-11-17").unwrap();

    workbook.save(path).unwrap();
}

#[tokio::test]
async fn test_enrich_pass_writes_back_to_workbook() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ski_lifts.xlsx");
    write_lift_workbook(&path);

    let mut store = WorkbookStore::open(&path, "Gudauri").unwrap();
    let job = match presets::get("gudauri-lifts") {
        Some(Job::Enrich(job)) => job,
        other => panic!("unexpected preset: {:?}", other),
    };
    let lookup = StubLookup::new().found("Gudauri Lift 3, Gudauri", chair_lift());
    let report = EnrichmentPass::new(job, Box::new(lookup))
        .run(&mut store)
        .await
        .unwrap();
    assert_eq!(report.resolved, 1);

    let mut reopened = WorkbookStore::open(&path, "Gudauri").unwrap();
    let range: RangeRef = "A1:H3".parse().unwrap();
    let grid = reopened.read_range(&range).await.unwrap();
    assert_eq!(grid[0][3], "lat");
    assert_eq!(grid[1][0], "Gudauri Lift 3");
    assert_eq!(grid[1][3], "42.48");
    assert_eq!(grid[1][7], "chair_lift");
    assert_eq!(grid[2][0], "Unknown Lift");
    assert!(grid[2].iter().skip(3).all(String::is_empty));

    let mut notes = WorkbookStore::open(&path, "Notes").unwrap();
    let cell: RangeRef = "A1:A1".parse().unwrap();
    let kept = notes.read_range(&cell).await.unwrap();
    assert_eq!(kept[0][0], "checked 2024-11-17");
}

#[test]
fn test_missing_worksheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ski_lifts.xlsx");
    write_lift_workbook(&path);

    let err = WorkbookStore::open(&path, "Bakuriani").err().unwrap();
    assert!(matches!(err, GeoSyncError::SourceUnavailable(_)));
    assert!(err.to_string().contains("Bakuriani"));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = WorkbookStore::open(dir.path().join("absent.xlsx"), "Gudauri")
        .err()
        .unwrap();
    assert!(matches!(err, GeoSyncError::SourceUnavailable(_)));
}
