// ==========================================
// School Import - import repository (rusqlite)
// ==========================================
// Single-connection SQLite implementation. The connection mutex plus
// per-call transactions provide the serialization required around
// "increment processed count and check batch completion".
// ==========================================

use crate::db;
use crate::domain::import::{
    FieldIssue, ImportBatch, ImportFile, ImportRecord, MappedRecord, RawRow, Verdict,
};
use crate::domain::types::{
    BatchState, FailureOrigin, FileState, ImportModule, RecordState, SuggestedAction, TenantId,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_repo::{ClaimOutcome, FileCompletion, FileOutcome, ImportRepository};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteImportRepository
// ==========================================
pub struct SqliteImportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteImportRepository {
    /// Open (and migrate) the database at `db_path`.
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = db::open_and_migrate(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepositoryError::LockPoisoned)
    }

    fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
        Ok(ImportBatch {
            batch_id: row.get("batch_id")?,
            tenant_id: TenantId(row.get("tenant_id")?),
            label: row.get("label")?,
            total_files: row.get("total_files")?,
            processed_files: row.get("processed_files")?,
            state: BatchState::parse(&row.get::<_, String>("state")?),
            created_at: row.get("created_at")?,
            finished_at: row.get("finished_at")?,
            confirmed_at: row.get("confirmed_at")?,
        })
    }

    fn file_from_row(row: &Row<'_>) -> rusqlite::Result<ImportFile> {
        Ok(ImportFile {
            file_id: row.get("file_id")?,
            batch_id: row.get("batch_id")?,
            tenant_id: TenantId(row.get("tenant_id")?),
            file_name: row.get("file_name")?,
            stored_path: row.get("stored_path")?,
            mime_type: row.get("mime_type")?,
            state: FileState::parse(&row.get::<_, String>("state")?),
            module: row
                .get::<_, Option<String>>("module")?
                .map(|m| ImportModule::parse(&m)),
            confidence: row.get("confidence")?,
            total_rows: row.get("total_rows")?,
            valid_rows: row.get("valid_rows")?,
            invalid_rows: row.get("invalid_rows")?,
            elapsed_ms: row.get("elapsed_ms")?,
            error_message: row.get("error_message")?,
            error_origin: row
                .get::<_, Option<String>>("error_origin")?
                .map(|o| FailureOrigin::parse(&o)),
            created_at: row.get("created_at")?,
        })
    }

    fn record_from_row(row: &Row<'_>) -> RepositoryResult<ImportRecord> {
        let raw_json: String = row.get("raw_data").map_err(RepositoryError::from)?;
        let mapped_json: String = row.get("mapped_data").map_err(RepositoryError::from)?;
        let errors_json: String = row.get("errors").map_err(RepositoryError::from)?;
        let warnings_json: String = row.get("warnings").map_err(RepositoryError::from)?;

        Ok(ImportRecord {
            record_id: row.get("record_id").map_err(RepositoryError::from)?,
            file_id: row.get("file_id").map_err(RepositoryError::from)?,
            tenant_id: TenantId(row.get("tenant_id").map_err(RepositoryError::from)?),
            row_number: row.get("row_number").map_err(RepositoryError::from)?,
            raw_data: serde_json::from_str::<RawRow>(&raw_json)?,
            mapped_data: serde_json::from_str::<MappedRecord>(&mapped_json)?,
            state: RecordState::parse(&row.get::<_, String>("state").map_err(RepositoryError::from)?),
            errors: serde_json::from_str::<Vec<FieldIssue>>(&errors_json)?,
            warnings: serde_json::from_str::<Vec<FieldIssue>>(&warnings_json)?,
            suggested_action: SuggestedAction::parse(
                &row.get::<_, String>("suggested_action")
                    .map_err(RepositoryError::from)?,
            ),
            created_at: row.get("created_at").map_err(RepositoryError::from)?,
            updated_at: row.get("updated_at").map_err(RepositoryError::from)?,
        })
    }
}

const BATCH_COLUMNS: &str = "batch_id, tenant_id, label, total_files, processed_files, \
                             state, created_at, finished_at, confirmed_at";
const FILE_COLUMNS: &str = "file_id, batch_id, tenant_id, file_name, stored_path, mime_type, \
                            state, module, confidence, total_rows, valid_rows, invalid_rows, \
                            elapsed_ms, error_message, error_origin, created_at";
const RECORD_COLUMNS: &str = "record_id, file_id, tenant_id, row_number, raw_data, mapped_data, \
                              state, errors, warnings, suggested_action, created_at, updated_at";

#[async_trait]
impl ImportRepository for SqliteImportRepository {
    async fn create_batch(
        &self,
        batch: &ImportBatch,
        files: &[ImportFile],
    ) -> RepositoryResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!("INSERT INTO import_batch ({BATCH_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)"),
            params![
                batch.batch_id,
                batch.tenant_id.as_str(),
                batch.label,
                batch.total_files,
                batch.processed_files,
                batch.state.as_str(),
                batch.created_at,
                batch.finished_at,
                batch.confirmed_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO import_file ({FILE_COLUMNS}) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)"
            ))?;
            for file in files {
                stmt.execute(params![
                    file.file_id,
                    file.batch_id,
                    file.tenant_id.as_str(),
                    file.file_name,
                    file.stored_path,
                    file.mime_type,
                    file.state.as_str(),
                    file.module.map(|m| m.as_str()),
                    file.confidence,
                    file.total_rows,
                    file.valid_rows,
                    file.invalid_rows,
                    file.elapsed_ms,
                    file.error_message,
                    file.error_origin.map(|o| o.as_str()),
                    file.created_at,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_batch(&self, tenant: &TenantId, batch_id: &str) -> RepositoryResult<ImportBatch> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {BATCH_COLUMNS} FROM import_batch WHERE batch_id = ?1 AND tenant_id = ?2"),
            params![batch_id, tenant.as_str()],
            Self::batch_from_row,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::BatchNotFound(batch_id.to_string()))
    }

    async fn list_batches(
        &self,
        tenant: &TenantId,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BATCH_COLUMNS} FROM import_batch WHERE tenant_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(params![tenant.as_str(), limit, offset], Self::batch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn cancel_batch(&self, tenant: &TenantId, batch_id: &str) -> RepositoryResult<bool> {
        // Existence check first so a bad id is NotFound, not a silent no-op.
        self.get_batch(tenant, batch_id).await?;

        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE import_batch SET state = 'CANCELLED', finished_at = ?1 \
             WHERE batch_id = ?2 AND tenant_id = ?3 AND state NOT IN ('COMPLETED', 'CANCELLED')",
            params![Utc::now(), batch_id, tenant.as_str()],
        )?;
        Ok(changed > 0)
    }

    async fn confirm_batch(
        &self,
        tenant: &TenantId,
        batch_id: &str,
    ) -> RepositoryResult<ImportBatch> {
        {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE import_batch SET confirmed_at = COALESCE(confirmed_at, ?1) \
                 WHERE batch_id = ?2 AND tenant_id = ?3 AND state = 'COMPLETED'",
                params![Utc::now(), batch_id, tenant.as_str()],
            )?;
        }
        self.get_batch(tenant, batch_id).await
    }

    async fn get_file(&self, tenant: &TenantId, file_id: &str) -> RepositoryResult<ImportFile> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM import_file WHERE file_id = ?1 AND tenant_id = ?2"),
            params![file_id, tenant.as_str()],
            Self::file_from_row,
        )
        .optional()?
        .ok_or_else(|| RepositoryError::FileNotFound(file_id.to_string()))
    }

    async fn list_files(
        &self,
        tenant: &TenantId,
        batch_id: &str,
    ) -> RepositoryResult<Vec<ImportFile>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM import_file \
             WHERE batch_id = ?1 AND tenant_id = ?2 ORDER BY file_name"
        ))?;
        let rows = stmt
            .query_map(params![batch_id, tenant.as_str()], Self::file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn claim_file(&self, tenant: &TenantId, file_id: &str) -> RepositoryResult<ClaimOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let found: Option<(String, String, String)> = tx
            .query_row(
                "SELECT f.state, f.batch_id, b.state FROM import_file f \
                 JOIN import_batch b ON b.batch_id = f.batch_id \
                 WHERE f.file_id = ?1 AND f.tenant_id = ?2",
                params![file_id, tenant.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (file_state, batch_id, batch_state) = match found {
            Some(t) => t,
            None => return Err(RepositoryError::FileNotFound(file_id.to_string())),
        };

        if FileState::parse(&file_state).is_terminal() {
            return Ok(ClaimOutcome::AlreadyTerminal);
        }
        if BatchState::parse(&batch_state) == BatchState::Cancelled {
            return Ok(ClaimOutcome::BatchCancelled);
        }

        // Clear leftovers of a previous failed attempt so a retried file
        // produces exactly one record set.
        tx.execute(
            "DELETE FROM import_record WHERE file_id = ?1",
            params![file_id],
        )?;
        tx.execute(
            "UPDATE import_file SET state = 'PROCESSING', total_rows = 0, valid_rows = 0, \
             invalid_rows = 0, elapsed_ms = NULL, error_message = NULL, error_origin = NULL \
             WHERE file_id = ?1",
            params![file_id],
        )?;
        tx.execute(
            "UPDATE import_batch SET state = 'PROCESSING' \
             WHERE batch_id = ?1 AND state = 'PENDING'",
            params![batch_id],
        )?;

        tx.commit()?;
        Ok(ClaimOutcome::Claimed)
    }

    async fn set_file_classification(
        &self,
        tenant: &TenantId,
        file_id: &str,
        module: ImportModule,
        confidence: f64,
    ) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE import_file SET module = ?1, confidence = ?2 \
             WHERE file_id = ?3 AND tenant_id = ?4",
            params![module.as_str(), confidence, file_id, tenant.as_str()],
        )?;
        if changed == 0 {
            return Err(RepositoryError::FileNotFound(file_id.to_string()));
        }
        Ok(())
    }

    async fn complete_file(
        &self,
        tenant: &TenantId,
        file_id: &str,
        outcome: &FileOutcome,
    ) -> RepositoryResult<FileCompletion> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let batch_id: String = tx
            .query_row(
                "SELECT batch_id FROM import_file WHERE file_id = ?1 AND tenant_id = ?2",
                params![file_id, tenant.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::FileNotFound(file_id.to_string()))?;

        // Guarded transition: only a non-terminal file may become terminal,
        // which makes the batch increment below exactly-once.
        let changed = match outcome {
            FileOutcome::Processed {
                total_rows,
                valid_rows,
                invalid_rows,
                elapsed_ms,
            } => tx.execute(
                "UPDATE import_file SET state = 'PROCESSED', total_rows = ?1, valid_rows = ?2, \
                 invalid_rows = ?3, elapsed_ms = ?4, error_message = NULL, error_origin = NULL \
                 WHERE file_id = ?5 AND state NOT IN ('PROCESSED', 'ERROR')",
                params![total_rows, valid_rows, invalid_rows, elapsed_ms, file_id],
            )?,
            FileOutcome::Failed {
                message,
                origin,
                elapsed_ms,
            } => tx.execute(
                "UPDATE import_file SET state = 'ERROR', elapsed_ms = ?1, error_message = ?2, \
                 error_origin = ?3 WHERE file_id = ?4 AND state NOT IN ('PROCESSED', 'ERROR')",
                params![elapsed_ms, message, origin.as_str(), file_id],
            )?,
        };

        if changed > 0 {
            tx.execute(
                "UPDATE import_batch SET processed_files = processed_files + 1 \
                 WHERE batch_id = ?1",
                params![batch_id],
            )?;
        }

        let (processed, total, state): (i64, i64, String) = tx.query_row(
            "SELECT processed_files, total_files, state FROM import_batch WHERE batch_id = ?1",
            params![batch_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut batch_state = BatchState::parse(&state);
        if processed >= total && !batch_state.is_terminal() {
            tx.execute(
                "UPDATE import_batch SET state = 'COMPLETED', finished_at = ?1 \
                 WHERE batch_id = ?2",
                params![Utc::now(), batch_id],
            )?;
            batch_state = BatchState::Completed;
        }

        tx.commit()?;
        Ok(FileCompletion {
            transitioned: changed > 0,
            batch_state,
            processed_files: processed,
            total_files: total,
        })
    }

    async fn insert_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO import_record ({RECORD_COLUMNS}) \
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)"
            ),
            params![
                record.record_id,
                record.file_id,
                record.tenant_id.as_str(),
                record.row_number,
                serde_json::to_string(&record.raw_data)?,
                serde_json::to_string(&record.mapped_data)?,
                record.state.as_str(),
                serde_json::to_string(&record.errors)?,
                serde_json::to_string(&record.warnings)?,
                record.suggested_action.as_str(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn get_record(
        &self,
        tenant: &TenantId,
        record_id: &str,
    ) -> RepositoryResult<ImportRecord> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM import_record WHERE record_id = ?1 AND tenant_id = ?2"
        ))?;
        let mut rows = stmt.query(params![record_id, tenant.as_str()])?;
        match rows.next()? {
            Some(row) => Self::record_from_row(row),
            None => Err(RepositoryError::RecordNotFound(record_id.to_string())),
        }
    }

    async fn list_records(
        &self,
        tenant: &TenantId,
        file_id: &str,
        state: Option<RecordState>,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ImportRecord>, i64)> {
        let conn = self.lock()?;
        let state_filter = state.map(|s| s.as_str().to_string());

        let total: i64 = match &state_filter {
            Some(s) => conn.query_row(
                "SELECT COUNT(*) FROM import_record \
                 WHERE file_id = ?1 AND tenant_id = ?2 AND state = ?3",
                params![file_id, tenant.as_str(), s],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM import_record WHERE file_id = ?1 AND tenant_id = ?2",
                params![file_id, tenant.as_str()],
                |row| row.get(0),
            )?,
        };

        let mut records = Vec::new();
        match &state_filter {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM import_record \
                     WHERE file_id = ?1 AND tenant_id = ?2 AND state = ?3 \
                     ORDER BY row_number LIMIT ?4 OFFSET ?5"
                ))?;
                let mut rows = stmt.query(params![file_id, tenant.as_str(), s, limit, offset])?;
                while let Some(row) = rows.next()? {
                    records.push(Self::record_from_row(row)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM import_record \
                     WHERE file_id = ?1 AND tenant_id = ?2 \
                     ORDER BY row_number LIMIT ?3 OFFSET ?4"
                ))?;
                let mut rows = stmt.query(params![file_id, tenant.as_str(), limit, offset])?;
                while let Some(row) = rows.next()? {
                    records.push(Self::record_from_row(row)?);
                }
            }
        }

        Ok((records, total))
    }

    async fn update_record_validation(
        &self,
        tenant: &TenantId,
        record_id: &str,
        mapped: &MappedRecord,
        verdict: &Verdict,
    ) -> RepositoryResult<ImportRecord> {
        {
            let conn = self.lock()?;
            let changed = conn.execute(
                "UPDATE import_record SET mapped_data = ?1, state = ?2, errors = ?3, \
                 warnings = ?4, suggested_action = ?5, updated_at = ?6 \
                 WHERE record_id = ?7 AND tenant_id = ?8",
                params![
                    serde_json::to_string(mapped)?,
                    verdict.state.as_str(),
                    serde_json::to_string(&verdict.errors)?,
                    serde_json::to_string(&verdict.warnings)?,
                    verdict.suggested_action.as_str(),
                    Utc::now(),
                    record_id,
                    tenant.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(RepositoryError::RecordNotFound(record_id.to_string()));
            }
        }
        self.get_record(tenant, record_id).await
    }

    async fn natural_key_exists(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        natural_key: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM existing_entity \
                 WHERE tenant_id = ?1 AND module = ?2 AND natural_key = ?3 LIMIT 1",
                params![tenant.as_str(), module.as_str(), natural_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn register_entity(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        natural_key: &str,
    ) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO existing_entity (tenant_id, module, natural_key, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![tenant.as_str(), module.as_str(), natural_key, Utc::now()],
        )?;
        Ok(())
    }
}
