// ==========================================
// School Import - batch coordinator
// ==========================================
// Batch lifecycle owner: persists a batch with its files, fans the files
// out to the job scheduler, and serves status / cancel / confirm /
// record-correction calls. File-level work lives in FileProcessor; the
// coordinator never touches rows itself.
// ==========================================

use crate::config::ImportConfig;
use crate::domain::import::{
    BatchStatus, FileSummary, ImportBatch, ImportFile, ImportRecord, MappedRecord, UploadedFile,
};
use crate::domain::types::{BatchState, FileState, RecordState, TenantId};
use crate::importer::error::{ImportError, ImportPipelineResult};
use crate::importer::file_processor::FileProcessor;
use crate::importer::validation::ValidationEngine;
use crate::jobs::{JobScheduler, JobSpec, JobUnit};
use crate::repository::ImportRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

// ==========================================
// FileJob - one file as a schedulable unit
// ==========================================
struct FileJob<R: ImportRepository> {
    processor: Arc<FileProcessor<R>>,
    tenant: TenantId,
    file_id: String,
}

#[async_trait]
impl<R: ImportRepository + 'static> JobUnit for FileJob<R> {
    fn describe(&self) -> String {
        format!("import-file {}", self.file_id)
    }

    async fn run(&self) -> ImportPipelineResult<()> {
        self.processor.process_file(&self.tenant, &self.file_id).await
    }

    async fn on_terminal_failure(&self, err: &ImportError, elapsed: std::time::Duration) {
        self.processor
            .fail_file(&self.tenant, &self.file_id, err, elapsed)
            .await;
    }
}

// ==========================================
// BatchCoordinator
// ==========================================
pub struct BatchCoordinator<R: ImportRepository + 'static> {
    repo: Arc<R>,
    processor: Arc<FileProcessor<R>>,
    validator: Arc<ValidationEngine<R>>,
    scheduler: Arc<dyn JobScheduler>,
    config: ImportConfig,
}

impl<R: ImportRepository + 'static> BatchCoordinator<R> {
    pub fn new(
        repo: Arc<R>,
        processor: Arc<FileProcessor<R>>,
        validator: Arc<ValidationEngine<R>>,
        scheduler: Arc<dyn JobScheduler>,
        config: ImportConfig,
    ) -> Self {
        Self {
            repo,
            processor,
            validator,
            scheduler,
            config,
        }
    }

    /// Persist a new batch with its files and enqueue one job per file.
    /// An empty upload yields an immediately COMPLETED batch.
    #[instrument(skip(self, files), fields(tenant = %tenant, file_count = files.len()))]
    pub async fn create_batch(
        &self,
        tenant: &TenantId,
        label: &str,
        files: Vec<UploadedFile>,
    ) -> ImportPipelineResult<String> {
        let now = Utc::now();
        let batch_id = Uuid::new_v4().to_string();
        let empty = files.is_empty();

        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            tenant_id: tenant.clone(),
            label: label.to_string(),
            total_files: files.len() as i64,
            processed_files: 0,
            state: if empty {
                BatchState::Completed
            } else {
                BatchState::Pending
            },
            created_at: now,
            finished_at: if empty { Some(now) } else { None },
            confirmed_at: None,
        };

        let file_rows: Vec<ImportFile> = files
            .iter()
            .map(|upload| ImportFile {
                file_id: Uuid::new_v4().to_string(),
                batch_id: batch_id.clone(),
                tenant_id: tenant.clone(),
                file_name: upload.file_name.clone(),
                stored_path: upload.stored_path.clone(),
                mime_type: upload.mime_type.clone(),
                state: FileState::Pending,
                module: None,
                confidence: 0.0,
                total_rows: 0,
                valid_rows: 0,
                invalid_rows: 0,
                elapsed_ms: None,
                error_message: None,
                error_origin: None,
                created_at: now,
            })
            .collect();

        self.repo.create_batch(&batch, &file_rows).await?;

        let spec = JobSpec {
            attempts: self.config.attempt_budget,
            timeout: self.config.file_timeout(),
            backoff: self.config.backoff(),
        };
        for file in &file_rows {
            let job = Arc::new(FileJob {
                processor: self.processor.clone(),
                tenant: tenant.clone(),
                file_id: file.file_id.clone(),
            });
            self.scheduler.enqueue(job, spec).await;
        }

        info!(batch_id, files = file_rows.len(), "batch created and enqueued");
        Ok(batch_id)
    }

    /// Aggregate view of a batch and its files.
    pub async fn status(
        &self,
        tenant: &TenantId,
        batch_id: &str,
    ) -> ImportPipelineResult<BatchStatus> {
        let batch = self.repo.get_batch(tenant, batch_id).await?;
        let files = self.repo.list_files(tenant, batch_id).await?;
        let failed_files = files.iter().filter(|f| f.state == FileState::Error).count() as i64;

        Ok(BatchStatus {
            batch_id: batch.batch_id,
            label: batch.label,
            state: batch.state,
            total_files: batch.total_files,
            processed_files: batch.processed_files,
            failed_files,
            created_at: batch.created_at,
            finished_at: batch.finished_at,
            confirmed_at: batch.confirmed_at,
            files: files.iter().map(FileSummary::from).collect(),
        })
    }

    pub async fn list_batches(
        &self,
        tenant: &TenantId,
        limit: i64,
        offset: i64,
    ) -> ImportPipelineResult<Vec<ImportBatch>> {
        Ok(self.repo.list_batches(tenant, limit, offset).await?)
    }

    /// Cooperative cancellation: marks the batch CANCELLED; in-flight files
    /// finish their current attempt, pending files are skipped at claim
    /// time and stay PENDING. Returns false when already terminal.
    #[instrument(skip(self), fields(tenant = %tenant, batch_id))]
    pub async fn cancel(&self, tenant: &TenantId, batch_id: &str) -> ImportPipelineResult<bool> {
        Ok(self.repo.cancel_batch(tenant, batch_id).await?)
    }

    /// Record caller acceptance of a fully processed batch. Confirmation
    /// is a bookkeeping step only; writing accepted rows into the target
    /// modules is a downstream concern.
    #[instrument(skip(self), fields(tenant = %tenant, batch_id))]
    pub async fn confirm(
        &self,
        tenant: &TenantId,
        batch_id: &str,
    ) -> ImportPipelineResult<ImportBatch> {
        let batch = self.repo.get_batch(tenant, batch_id).await?;
        if batch.state != BatchState::Completed {
            return Err(ImportError::InvalidStateTransition {
                entity: format!("batch {batch_id}"),
                from: batch.state.to_string(),
                to: "CONFIRMED".to_string(),
            });
        }
        Ok(self.repo.confirm_batch(tenant, batch_id).await?)
    }

    /// Paginated records of one file, optionally filtered by verdict.
    pub async fn file_records(
        &self,
        tenant: &TenantId,
        file_id: &str,
        state: Option<RecordState>,
        limit: i64,
        offset: i64,
    ) -> ImportPipelineResult<(Vec<ImportRecord>, i64)> {
        Ok(self
            .repo
            .list_records(tenant, file_id, state, limit, offset)
            .await?)
    }

    /// Apply a manual correction to one record and re-validate it. Only
    /// the record's own verdict changes; file counters keep reflecting the
    /// original processing run.
    #[instrument(skip(self, mapped), fields(tenant = %tenant, record_id))]
    pub async fn update_record(
        &self,
        tenant: &TenantId,
        record_id: &str,
        mapped: MappedRecord,
    ) -> ImportPipelineResult<ImportRecord> {
        let record = self.repo.get_record(tenant, record_id).await?;
        let file = self.repo.get_file(tenant, &record.file_id).await?;
        let module = file.module.ok_or_else(|| {
            ImportError::Internal(format!("file {} has no classified module", file.file_id))
        })?;

        // Fresh seen-set: a single-record correction is only checked
        // against persisted data.
        let verdict = self
            .validator
            .validate(tenant, module, &mapped, &mut HashSet::new())
            .await?;
        Ok(self
            .repo
            .update_record_validation(tenant, record_id, &mapped, &verdict)
            .await?)
    }

    /// Wait for all enqueued file jobs to settle.
    pub async fn join(&self) {
        self.scheduler.join().await;
    }
}
