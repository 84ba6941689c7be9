// ==========================================
// Concurrent import test
// ==========================================
// Many files in one batch, bounded worker pool: every file reports
// exactly once and the batch counter ends exactly at total_files.
// ==========================================

mod test_helpers;

use school_import::config::ImportConfig;
use school_import::logging;
use school_import::{BatchState, FileState};
use test_helpers::{create_test_api_with, write_upload, TENANT};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_files_counted_exactly_once() {
    logging::init_test();
    let (dir, api) = create_test_api_with(ImportConfig {
        max_parallel_files: 3,
        backoff_ms: 1,
        ..ImportConfig::default()
    });

    let mut uploads = Vec::new();
    for i in 0..12 {
        let content = format!(
            "Cédula,Materia,Período,Nota\n{i}0001,Física,2026-1,80\n{i}0002,Física,2026-1,90\n"
        );
        uploads.push(write_upload(
            &dir,
            &format!("notas_{i}.csv"),
            "text/csv",
            &content,
        ));
    }
    // A couple of failing files in the middle of the pack.
    uploads.push(write_upload(&dir, "datos_1.bin", "application/octet-stream", "x"));
    uploads.push(write_upload(&dir, "datos_2.bin", "application/octet-stream", "y"));

    let batch = api
        .create_batch(TENANT, "carga masiva", uploads)
        .await
        .unwrap();
    api.wait_for_idle().await;

    let status = api.batch_status(TENANT, &batch.batch_id).await.unwrap();
    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.total_files, 14);
    assert_eq!(status.processed_files, 14);
    assert_eq!(status.failed_files, 2);

    for file in &status.files {
        assert!(file.state.is_terminal(), "file {} not terminal", file.file_name);
        if file.state == FileState::Processed {
            assert_eq!(file.total_rows, 2);
            assert_eq!(file.invalid_rows, 0);
        }
    }
}
