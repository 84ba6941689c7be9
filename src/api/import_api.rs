// ==========================================
// Bulk import API
// ==========================================
// Facade over the batch coordinator: wires the default pipeline
// components to a SQLite repository and exposes serializable
// request/response types for a transport layer to call.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ImportConfig;
use crate::domain::import::{
    BatchStatus, ImportBatch, ImportRecord, MappedRecord, UploadedFile,
};
use crate::domain::types::{RecordState, TenantId};
use crate::importer::{
    BatchCoordinator, DictionaryMapper, FileProcessor, FormatRegistry, RuleClassifier,
    ValidationEngine,
};
use crate::jobs::TokioJobScheduler;
use crate::repository::SqliteImportRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Batch creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchResponse {
    /// Identifier of the new batch.
    pub batch_id: String,
    /// Number of files accepted for processing.
    pub total_files: usize,
}

/// Paginated record listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordListResponse {
    /// One page of records.
    pub records: Vec<ImportRecord>,
    /// Total records matching the filter.
    pub total: i64,
    /// Page size requested.
    pub limit: i64,
    /// Page offset requested.
    pub offset: i64,
}

/// Batch cancellation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBatchResponse {
    /// False when the batch was already completed or cancelled.
    pub cancelled: bool,
    pub message: String,
}

/// Batch confirmation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmBatchResponse {
    pub batch_id: String,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Bulk import API.
pub struct ImportApi {
    coordinator: BatchCoordinator<SqliteImportRepository>,
}

impl ImportApi {
    /// Open the repository at `db_path` and wire the default pipeline:
    /// MIME-dispatched extractors, rule classifier, dictionary mapper,
    /// validation engine, and a bounded tokio scheduler.
    pub fn new(db_path: &str, config: ImportConfig) -> ApiResult<Self> {
        let repo = Arc::new(SqliteImportRepository::open(db_path)?);
        let validator = Arc::new(ValidationEngine::new(repo.clone(), config.strict_review));
        let processor = Arc::new(FileProcessor::new(
            repo.clone(),
            Arc::new(FormatRegistry::new()),
            Arc::new(RuleClassifier::new()),
            Arc::new(DictionaryMapper::new()),
            validator.clone(),
            config.preview_rows,
        ));
        let scheduler = Arc::new(TokioJobScheduler::new(config.max_parallel_files));
        let coordinator =
            BatchCoordinator::new(repo, processor, validator, scheduler, config);
        Ok(Self { coordinator })
    }

    /// Register a batch of uploaded files and start processing them in the
    /// background. Returns immediately with the batch identifier.
    pub async fn create_batch(
        &self,
        tenant_id: &str,
        label: &str,
        files: Vec<UploadedFile>,
    ) -> ApiResult<CreateBatchResponse> {
        if tenant_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("tenant_id must not be empty".into()));
        }
        let tenant = TenantId::new(tenant_id);
        let total_files = files.len();
        let batch_id = self.coordinator.create_batch(&tenant, label, files).await?;
        Ok(CreateBatchResponse {
            batch_id,
            total_files,
        })
    }

    /// Aggregate batch status with per-file summaries.
    pub async fn batch_status(&self, tenant_id: &str, batch_id: &str) -> ApiResult<BatchStatus> {
        let tenant = TenantId::new(tenant_id);
        Ok(self.coordinator.status(&tenant, batch_id).await?)
    }

    /// Most recent batches of the tenant, newest first.
    pub async fn list_batches(
        &self,
        tenant_id: &str,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<ImportBatch>> {
        let tenant = TenantId::new(tenant_id);
        Ok(self.coordinator.list_batches(&tenant, limit, offset).await?)
    }

    /// Cooperatively cancel a batch.
    pub async fn cancel_batch(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> ApiResult<CancelBatchResponse> {
        let tenant = TenantId::new(tenant_id);
        let cancelled = self.coordinator.cancel(&tenant, batch_id).await?;
        let message = if cancelled {
            "batch cancelled; pending files will not be processed".to_string()
        } else {
            "batch already finished".to_string()
        };
        Ok(CancelBatchResponse { cancelled, message })
    }

    /// Accept the validated result of a completed batch.
    pub async fn confirm_batch(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> ApiResult<ConfirmBatchResponse> {
        let tenant = TenantId::new(tenant_id);
        let batch = self.coordinator.confirm(&tenant, batch_id).await?;
        Ok(ConfirmBatchResponse {
            batch_id: batch.batch_id,
            confirmed_at: batch.confirmed_at,
        })
    }

    /// Paginated records of one file, optionally filtered by verdict
    /// (VALID / INVALID / DUPLICATE / NEEDS_REVIEW).
    pub async fn file_records(
        &self,
        tenant_id: &str,
        file_id: &str,
        state: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> ApiResult<RecordListResponse> {
        let tenant = TenantId::new(tenant_id);
        let state = match state {
            None => None,
            Some(raw) => Some(match raw {
                "VALID" => RecordState::Valid,
                "INVALID" => RecordState::Invalid,
                "DUPLICATE" => RecordState::Duplicate,
                "NEEDS_REVIEW" => RecordState::NeedsReview,
                other => {
                    return Err(ApiError::InvalidInput(format!(
                        "unknown record state filter: {other}"
                    )))
                }
            }),
        };
        let (records, total) = self
            .coordinator
            .file_records(&tenant, file_id, state, limit, offset)
            .await?;
        Ok(RecordListResponse {
            records,
            total,
            limit,
            offset,
        })
    }

    /// Apply a manual correction to one record and re-validate it.
    pub async fn update_record(
        &self,
        tenant_id: &str,
        record_id: &str,
        mapped: MappedRecord,
    ) -> ApiResult<ImportRecord> {
        let tenant = TenantId::new(tenant_id);
        Ok(self
            .coordinator
            .update_record(&tenant, record_id, mapped)
            .await?)
    }

    /// Wait until every enqueued file job has settled.
    pub async fn wait_for_idle(&self) {
        self.coordinator.join().await;
    }
}
