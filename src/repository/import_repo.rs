// ==========================================
// School Import - import repository trait
// ==========================================
// Data access interface for batches, files, records, and the natural-key
// lookup used by validation. Repository does CRUD only; business rules
// stay in the importer layer.
// ==========================================

use crate::domain::import::{ImportBatch, ImportFile, ImportRecord, MappedRecord, Verdict};
use crate::domain::types::{BatchState, FailureOrigin, ImportModule, RecordState, TenantId};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// FileOutcome / FileCompletion
// ==========================================

/// Terminal outcome reported for one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Processed {
        total_rows: i64,
        valid_rows: i64,
        invalid_rows: i64,
        elapsed_ms: i64,
    },
    Failed {
        message: String,
        origin: FailureOrigin,
        elapsed_ms: i64,
    },
}

/// Result of reporting a file outcome.
///
/// `transitioned` is false when the file was already terminal — retried
/// attempts must not increment the batch counter twice, so the increment
/// and the completion check only happen on the first transition.
#[derive(Debug, Clone)]
pub struct FileCompletion {
    pub transitioned: bool,
    pub batch_state: BatchState,
    pub processed_files: i64,
    pub total_files: i64,
}

/// Outcome of claiming a file for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// File is now PROCESSING; records from any earlier attempt cleared.
    Claimed,
    /// File already reached a terminal state; nothing to do.
    AlreadyTerminal,
    /// Owning batch was cancelled; the unit must not run.
    BatchCancelled,
}

// ==========================================
// ImportRepository trait
// ==========================================
// Implementor: SqliteImportRepository (rusqlite). Every call carries the
// tenant explicitly; rows of other tenants are invisible.
#[async_trait]
pub trait ImportRepository: Send + Sync {
    // ===== batch lifecycle =====

    /// Persist a batch together with its files (single transaction).
    async fn create_batch(&self, batch: &ImportBatch, files: &[ImportFile])
        -> RepositoryResult<()>;

    async fn get_batch(&self, tenant: &TenantId, batch_id: &str) -> RepositoryResult<ImportBatch>;

    async fn list_batches(
        &self,
        tenant: &TenantId,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<ImportBatch>>;

    /// Mark a batch CANCELLED. Returns false when the batch was already
    /// terminal. Never touches file states.
    async fn cancel_batch(&self, tenant: &TenantId, batch_id: &str) -> RepositoryResult<bool>;

    /// Record caller acceptance of a completed batch (sets confirmed_at
    /// once; idempotent). No re-validation, no record writes.
    async fn confirm_batch(&self, tenant: &TenantId, batch_id: &str)
        -> RepositoryResult<ImportBatch>;

    // ===== file lifecycle =====

    async fn get_file(&self, tenant: &TenantId, file_id: &str) -> RepositoryResult<ImportFile>;

    async fn list_files(
        &self,
        tenant: &TenantId,
        batch_id: &str,
    ) -> RepositoryResult<Vec<ImportFile>>;

    /// Claim a file for one processing attempt: flips it to PROCESSING,
    /// clears records left by a previous failed attempt, resets counters,
    /// and moves a PENDING batch to PROCESSING. All in one transaction so
    /// two workers can never claim the same file concurrently.
    async fn claim_file(&self, tenant: &TenantId, file_id: &str) -> RepositoryResult<ClaimOutcome>;

    async fn set_file_classification(
        &self,
        tenant: &TenantId,
        file_id: &str,
        module: ImportModule,
        confidence: f64,
    ) -> RepositoryResult<()>;

    /// Report a file's terminal outcome and update the owning batch in the
    /// same transaction: increment processed_files (only on the first
    /// terminal transition) and finalize the batch when every file has
    /// reported.
    async fn complete_file(
        &self,
        tenant: &TenantId,
        file_id: &str,
        outcome: &FileOutcome,
    ) -> RepositoryResult<FileCompletion>;

    // ===== records =====

    async fn insert_record(&self, record: &ImportRecord) -> RepositoryResult<()>;

    async fn get_record(&self, tenant: &TenantId, record_id: &str)
        -> RepositoryResult<ImportRecord>;

    /// Paginated record listing with optional verdict filter. Returns the
    /// page plus the total count matching the filter.
    async fn list_records(
        &self,
        tenant: &TenantId,
        file_id: &str,
        state: Option<RecordState>,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ImportRecord>, i64)>;

    /// Replace a record's mapped data and verdict after re-validation.
    /// File aggregate counters are intentionally not recomputed here.
    async fn update_record_validation(
        &self,
        tenant: &TenantId,
        record_id: &str,
        mapped: &MappedRecord,
        verdict: &Verdict,
    ) -> RepositoryResult<ImportRecord>;

    // ===== natural-key lookups (uniqueness check) =====

    async fn natural_key_exists(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        natural_key: &str,
    ) -> RepositoryResult<bool>;

    /// Register a natural key as persisted in the target module. Used by
    /// downstream consumers after confirmed insertion (and by tests).
    async fn register_entity(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        natural_key: &str,
    ) -> RepositoryResult<()>;
}
