// ==========================================
// Retry recovery test
// ==========================================
// A file whose first processing attempt fails transiently must, after a
// successful retry, leave exactly one record set and bump the batch's
// processed-file counter exactly once.
// ==========================================

mod test_helpers;

use school_import::config::ImportConfig;
use school_import::domain::import::UploadedFile;
use school_import::logging;
use school_import::{BatchState, FileState};
use std::time::Duration;
use test_helpers::{create_test_api_with, TENANT};

#[tokio::test]
async fn test_transient_failure_retried_then_counted_once() {
    logging::init_test();
    let (dir, api) = create_test_api_with(ImportConfig {
        attempt_budget: 3,
        backoff_ms: 400,
        ..ImportConfig::default()
    });

    // The upload points at a path the storage layer has not written yet,
    // so the first attempt fails with a missing file.
    let path = dir.path().join("notas_tarde.csv");
    let upload = UploadedFile {
        file_name: "notas_tarde.csv".to_string(),
        stored_path: path.to_str().unwrap().to_string(),
        mime_type: "text/csv".to_string(),
    };

    let created = api
        .create_batch(TENANT, "carga tardía", vec![upload])
        .await
        .unwrap();

    // The file lands inside the backoff window; the retry then succeeds.
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&path, "Cédula,Materia,Período,Nota\n10000001,Arte,2026-1,70\n").unwrap();

    api.wait_for_idle().await;

    let status = api.batch_status(TENANT, &created.batch_id).await.unwrap();
    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.processed_files, 1);
    assert_eq!(status.failed_files, 0);

    let file = &status.files[0];
    assert_eq!(file.state, FileState::Processed);
    assert_eq!(file.total_rows, 1);
    assert_eq!(file.valid_rows, 1);
    assert!(file.error_message.is_none());

    // Exactly one record set: the failed attempt left nothing behind.
    let page = api
        .file_records(TENANT, &file.file_id, None, 10, 0)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].row_number, 1);
}
