//! Concurrent ingestion: ordering, column handling and the row count invariant.

mod common;

use common::{mixed_rows, IncidentRow, SheetBuilder, TestHarness};

use incidentflow::db::incident_repo;
use incidentflow::ingest::{
    split_header, ColumnMap, ConcurrentIngester, CsvSheetReader, RowOutcome, SheetReader,
};
use incidentflow::model::{UploadStatus, ValidationKind};
use incidentflow::pipeline::NoopProgress;
use incidentflow::CancelFlag;

/// Comparable view of an outcome (ids and timestamps are generated).
fn project(outcomes: &[RowOutcome]) -> Vec<Result<(String, usize), Vec<(usize, String)>>> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(record) => Ok((record.incident_id.clone(), record.source_row)),
            Err(errors) => Err(errors.iter().map(|e| (e.row, e.field.clone())).collect()),
        })
        .collect()
}

fn read(harness: &TestHarness, csv: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let upload = harness.add_upload(csv);
    let rows = CsvSheetReader::default()
        .read_rows(&harness.upload_dir.join(&upload.filename))
        .unwrap();
    split_header(rows).unwrap()
}

#[test]
fn test_output_order_is_independent_of_worker_count() {
    let harness = TestHarness::new();
    let (header, rows) = read(&harness, &SheetBuilder::new().rows(mixed_rows(200)).build());
    let columns = ColumnMap::from_header(&header);
    let cancel = CancelFlag::new();

    let baseline = project(&ConcurrentIngester::new(1).ingest(&rows, &columns, &cancel).unwrap());
    assert_eq!(baseline.len(), 200);
    for (index, entry) in baseline.iter().enumerate() {
        match entry {
            Ok((id, row)) => {
                assert_eq!(*row, index + 1);
                assert_eq!(id, &format!("INC{:04}", index + 1));
            }
            Err(errors) => assert!(errors.iter().all(|(row, _)| *row == index + 1)),
        }
    }

    for workers in [2, 8, 64] {
        let outcomes = ConcurrentIngester::new(workers)
            .ingest(&rows, &columns, &cancel)
            .unwrap();
        assert_eq!(project(&outcomes), baseline, "workers = {}", workers);
    }
}

#[test]
fn test_worker_count_is_capped_by_rows() {
    let ingester = ConcurrentIngester::new(16);
    assert_eq!(ingester.worker_count_for(3), 3);
    assert_eq!(ingester.worker_count_for(100), 16);
    assert_eq!(ConcurrentIngester::new(0).max_workers(), 1);
}

#[test]
fn test_date_encodings_are_accepted() {
    let harness = TestHarness::new();
    let csv = SheetBuilder::new()
        .row(IncidentRow::new("ISO").reported("2024-03-01T09:00:00"))
        .row(IncidentRow::new("US").reported("03/15/2024 09:00"))
        .row(IncidentRow::new("EU").reported("15.03.2024"))
        .row(IncidentRow::new("SERIAL").reported("45352"))
        .row(IncidentRow::new("BAD").reported("yesterday"))
        .build();
    let upload = harness.add_upload(&csv);

    let summary = harness
        .pipeline(2)
        .run(&upload.id, &CancelFlag::new(), &NoopProgress)
        .unwrap();
    assert_eq!(summary.inserted_rows, 4);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].kind, ValidationKind::InvalidFormat);
    assert_eq!(summary.errors[0].row, 5);
    assert_eq!(summary.errors[0].field, "report_date");
}

#[test]
fn test_missing_required_column_fails_every_row() {
    let harness = TestHarness::new();
    let csv = "Incident ID,Report Date,Brief Description\nINC1,2024-03-01,Down\nINC2,2024-03-01,Down\n";
    let upload = harness.add_upload(csv);

    let summary = harness
        .pipeline(2)
        .run(&upload.id, &CancelFlag::new(), &NoopProgress)
        .unwrap();
    assert_eq!(summary.status, UploadStatus::Failed);
    assert_eq!(summary.inserted_rows, 0);
    assert_eq!(summary.rejected_rows, 2);
    for row in [1, 2] {
        assert!(summary
            .errors
            .iter()
            .any(|e| e.row == row && e.kind == ValidationKind::RequiredFieldMissing));
    }
}

#[test]
fn test_counts_add_up_to_total_rows() {
    let harness = TestHarness::new();
    let mut rows = mixed_rows(40);
    rows.push(IncidentRow::new("INC0001"));
    rows.push(IncidentRow::new("INC0002").priority("urgent"));
    let upload = harness.add_upload(&SheetBuilder::new().rows(rows).build());

    let summary = harness
        .pipeline(4)
        .run(&upload.id, &CancelFlag::new(), &NoopProgress)
        .unwrap();
    assert_eq!(summary.total_rows, 42);
    assert_eq!(summary.inserted_rows, 32);
    assert_eq!(summary.duplicate_rows, 1);
    assert_eq!(summary.rejected_rows, 9);
    assert_eq!(
        summary.inserted_rows + summary.duplicate_rows + summary.rejected_rows,
        summary.total_rows
    );
}

#[test]
fn test_cancelled_ingest_stops_early() {
    let harness = TestHarness::new();
    let (header, rows) = read(&harness, &SheetBuilder::new().rows(mixed_rows(50)).build());
    let columns = ColumnMap::from_header(&header);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = ConcurrentIngester::new(4).ingest(&rows, &columns, &cancel);
    assert!(matches!(
        result,
        Err(incidentflow::IngestError::Cancelled { total: 50, .. })
    ));
}

#[test]
fn test_workbook_upload_is_ingested() {
    let harness = TestHarness::new();
    let workbook = SheetBuilder::new()
        .row(IncidentRow::new("INC001").reported("45352.375").resolved("45352.5"))
        .row(IncidentRow::new("INC002").brief("AT&T <link> down"))
        .row(IncidentRow::new("INC003").priority("P9"))
        .build_xlsx();
    let upload = harness.add_xlsx_upload(&workbook);

    let summary = harness
        .pipeline(2)
        .run(&upload.id, &CancelFlag::new(), &NoopProgress)
        .unwrap();
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.inserted_rows, 2);
    assert_eq!(summary.rejected_rows, 1);
    assert_eq!(summary.errors[0].row, 3);
    assert_eq!(summary.errors[0].field, "priority");

    let stored = incident_repo::find_by_upload(&harness.db, &upload.id).unwrap();
    let serial = &stored[0];
    assert_eq!(
        serial.report_date,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    );
    assert_eq!(serial.resolution_hours, Some(3));
    assert_eq!(stored[1].brief_description, "AT&T <link> down");
}
