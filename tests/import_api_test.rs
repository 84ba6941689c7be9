// ==========================================
// Import API tests
// ==========================================
// API surface: tenant isolation, pagination, manual correction,
// confirmation, cancellation.
// ==========================================

mod test_helpers;

use school_import::domain::import::FieldValue;
use school_import::logging;
use school_import::{ApiError, BatchState, MappedRecord, RecordState};
use test_helpers::{create_test_api, enrollment_csv, grades_csv, write_upload, TENANT};

#[tokio::test]
async fn test_tenant_isolation() {
    logging::init_test();
    let (dir, api) = create_test_api();

    let upload = write_upload(&dir, "notas.csv", "text/csv", grades_csv());
    let batch = api.create_batch(TENANT, "notas", vec![upload]).await.unwrap();
    api.wait_for_idle().await;

    // Another tenant cannot see the batch at all.
    let err = api
        .batch_status("otro-colegio", &batch.batch_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    assert!(api
        .list_batches("otro-colegio", 10, 0)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(api.list_batches(TENANT, 10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_record_pagination_and_filters() {
    logging::init_test();
    let (dir, api) = create_test_api();

    let upload = write_upload(&dir, "matricula.csv", "text/csv", enrollment_csv());
    let batch = api.create_batch(TENANT, "alumnos", vec![upload]).await.unwrap();
    api.wait_for_idle().await;

    let status = api.batch_status(TENANT, &batch.batch_id).await.unwrap();
    let file_id = status.files[0].file_id.clone();

    let page = api.file_records(TENANT, &file_id, None, 2, 0).await.unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.total, 4);
    assert_eq!(page.records[0].row_number, 1);

    let page = api.file_records(TENANT, &file_id, None, 2, 2).await.unwrap();
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].row_number, 3);

    let valid = api
        .file_records(TENANT, &file_id, Some("VALID"), 10, 0)
        .await
        .unwrap();
    assert_eq!(valid.total, 3);

    let err = api
        .file_records(TENANT, &file_id, Some("BOGUS"), 10, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_manual_correction_then_confirm() {
    logging::init_test();
    let (dir, api) = create_test_api();

    let upload = write_upload(&dir, "matricula.csv", "text/csv", enrollment_csv());
    let batch = api.create_batch(TENANT, "alumnos", vec![upload]).await.unwrap();
    api.wait_for_idle().await;

    let status = api.batch_status(TENANT, &batch.batch_id).await.unwrap();
    let file_id = status.files[0].file_id.clone();

    let invalid = api
        .file_records(TENANT, &file_id, Some("INVALID"), 10, 0)
        .await
        .unwrap();
    let record = &invalid.records[0];

    let mut corrected: MappedRecord = record.mapped_data.clone();
    corrected.insert("national_id".into(), FieldValue::Text("10000004".into()));
    corrected.insert("student_name".into(), FieldValue::Text("Pedro Ruiz".into()));
    corrected.insert("academic_period".into(), FieldValue::Text("2026-1".into()));
    corrected.insert(
        "enrollment_date".into(),
        FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2026, 1, 18).unwrap()),
    );

    let updated = api
        .update_record(TENANT, &record.record_id, corrected)
        .await
        .unwrap();
    assert_eq!(updated.state, RecordState::Valid);
    assert!(updated.updated_at >= record.updated_at);

    let confirmed = api.confirm_batch(TENANT, &batch.batch_id).await.unwrap();
    assert!(confirmed.confirmed_at.is_some());

    // Cancelling a completed batch is a no-op.
    let cancel = api.cancel_batch(TENANT, &batch.batch_id).await.unwrap();
    assert!(!cancel.cancelled);
}

#[tokio::test]
async fn test_confirm_invisible_to_other_tenant() {
    logging::init_test();
    let (dir, api) = create_test_api();

    let upload = write_upload(&dir, "notas.csv", "text/csv", grades_csv());
    let batch = api.create_batch(TENANT, "notas", vec![upload]).await.unwrap();
    api.wait_for_idle().await;

    let err = api
        .confirm_batch("otro-colegio", &batch.batch_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_empty_tenant_rejected() {
    logging::init_test();
    let (_dir, api) = create_test_api();
    let err = api.create_batch("  ", "x", Vec::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_empty_batch_completes_immediately() {
    logging::init_test();
    let (_dir, api) = create_test_api();
    let created = api.create_batch(TENANT, "vacío", Vec::new()).await.unwrap();
    let status = api.batch_status(TENANT, &created.batch_id).await.unwrap();
    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.total_files, 0);
    assert!(status.files.is_empty());
}
