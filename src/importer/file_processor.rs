// ==========================================
// School Import - per-file processing orchestrator
// ==========================================
// Drives one file through claim → extract → classify → map → validate →
// persist → complete. A file-scoped error aborts the run and is reported
// by the job scheduler through `fail_file`; a row-scoped error becomes an
// INVALID record and processing continues.
// ==========================================

use crate::domain::import::{FieldIssue, ImportRecord, IssueCode, MappedRecord, RawRow, Verdict};
use crate::domain::types::{ImportModule, RecordState, SuggestedAction, TenantId};
use crate::importer::error::{ImportError, ImportPipelineResult};
use crate::importer::pipeline_trait::{Classifier, Extractor, SchemaMapper};
use crate::importer::validation::ValidationEngine;
use crate::repository::{FileOutcome, ClaimOutcome, ImportRepository};
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct FileProcessor<R: ImportRepository> {
    repo: Arc<R>,
    extractor: Arc<dyn Extractor>,
    classifier: Arc<dyn Classifier>,
    mapper: Arc<dyn SchemaMapper>,
    validator: Arc<ValidationEngine<R>>,
    preview_rows: usize,
}

impl<R: ImportRepository> FileProcessor<R> {
    pub fn new(
        repo: Arc<R>,
        extractor: Arc<dyn Extractor>,
        classifier: Arc<dyn Classifier>,
        mapper: Arc<dyn SchemaMapper>,
        validator: Arc<ValidationEngine<R>>,
        preview_rows: usize,
    ) -> Self {
        Self {
            repo,
            extractor,
            classifier,
            mapper,
            validator,
            preview_rows,
        }
    }

    /// One processing attempt for a file. Safe to re-run: the claim clears
    /// records of a previous failed attempt, and an already-terminal file
    /// (or a cancelled batch) makes the attempt a no-op.
    #[instrument(skip(self), fields(tenant = %tenant, file_id))]
    pub async fn process_file(
        &self,
        tenant: &TenantId,
        file_id: &str,
    ) -> ImportPipelineResult<()> {
        let started = Instant::now();

        match self.repo.claim_file(tenant, file_id).await? {
            ClaimOutcome::Claimed => {}
            ClaimOutcome::AlreadyTerminal => {
                info!(file_id, "file already terminal, skipping attempt");
                return Ok(());
            }
            ClaimOutcome::BatchCancelled => {
                info!(file_id, "batch cancelled, leaving file untouched");
                return Ok(());
            }
        }

        let file = self.repo.get_file(tenant, file_id).await?;
        let path = Path::new(&file.stored_path);

        // A format without a registered reader can still be classified on
        // the filename alone, so an unclassifiable .bin upload surfaces as
        // "unclassifiable document" instead of a format error.
        let preview = match self.extractor.preview(path, &file.mime_type, self.preview_rows) {
            Ok(rows) => rows,
            Err(ImportError::UnsupportedFormat(_)) => Vec::new(),
            Err(err) => return Err(err),
        };

        let classification = self.classifier.classify(&file.file_name, &preview);
        if classification.is_unknown() {
            return Err(ImportError::Unclassifiable);
        }
        self.repo
            .set_file_classification(tenant, file_id, classification.module, classification.confidence)
            .await?;

        let extraction = self.extractor.extract_all(path, &file.mime_type)?;
        let total_rows = extraction.rows.len() as i64;

        let mut seen_keys = HashSet::new();
        let mut invalid_rows: i64 = 0;

        for (idx, raw) in extraction.rows.iter().enumerate() {
            let row_number = idx + 1;
            let (mapped, verdict) = self
                .evaluate_row(tenant, classification.module, raw, row_number, &mut seen_keys)
                .await?;

            if verdict.state == RecordState::Invalid {
                invalid_rows += 1;
            }
            let record = Self::build_record(tenant, file_id, row_number, raw, mapped, verdict);
            self.repo.insert_record(&record).await?;
        }

        let elapsed_ms = started.elapsed().as_millis() as i64;
        let completion = self
            .repo
            .complete_file(
                tenant,
                file_id,
                &FileOutcome::Processed {
                    total_rows,
                    valid_rows: total_rows - invalid_rows,
                    invalid_rows,
                    elapsed_ms,
                },
            )
            .await?;

        info!(
            file_id,
            module = %classification.module,
            total_rows,
            invalid_rows,
            elapsed_ms,
            batch_state = %completion.batch_state,
            "file processed"
        );
        Ok(())
    }

    /// Terminal-failure path: record the captured error detail and the
    /// duration of the failing attempt on the file, then report the
    /// terminal transition to the owning batch.
    #[instrument(skip(self, err, elapsed), fields(tenant = %tenant, file_id))]
    pub async fn fail_file(
        &self,
        tenant: &TenantId,
        file_id: &str,
        err: &ImportError,
        elapsed: Duration,
    ) {
        warn!(file_id, error = %err, origin = %err.origin(), "file failed terminally");
        let outcome = FileOutcome::Failed {
            message: err.to_string(),
            origin: err.origin(),
            elapsed_ms: elapsed.as_millis() as i64,
        };
        if let Err(persist_err) = self.repo.complete_file(tenant, file_id, &outcome).await {
            warn!(file_id, error = %persist_err, "failed to record terminal failure");
        }
    }

    /// Map + validate one row. A row-scoped mapping error is captured as an
    /// INVALID verdict instead of aborting the file.
    async fn evaluate_row(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        raw: &RawRow,
        row_number: usize,
        seen_keys: &mut HashSet<String>,
    ) -> ImportPipelineResult<(MappedRecord, Verdict)> {
        match self.mapper.map_row(module, raw, row_number) {
            Ok(mapped) => {
                let verdict = self
                    .validator
                    .validate(tenant, module, &mapped, seen_keys)
                    .await?;
                Ok((mapped, verdict))
            }
            Err(ImportError::TypeCoercion { field, message, .. }) => {
                let verdict = Verdict {
                    state: RecordState::Invalid,
                    errors: vec![FieldIssue::new(field, IssueCode::TypeCoercion, message)],
                    warnings: Vec::new(),
                    suggested_action: SuggestedAction::Fix,
                };
                Ok((MappedRecord::new(), verdict))
            }
            Err(err) => Err(err),
        }
    }

    fn build_record(
        tenant: &TenantId,
        file_id: &str,
        row_number: usize,
        raw: &RawRow,
        mapped: MappedRecord,
        verdict: Verdict,
    ) -> ImportRecord {
        let now = Utc::now();
        ImportRecord {
            record_id: Uuid::new_v4().to_string(),
            file_id: file_id.to_string(),
            tenant_id: tenant.clone(),
            row_number: row_number as i64,
            raw_data: raw.clone(),
            mapped_data: mapped,
            state: verdict.state,
            errors: verdict.errors,
            warnings: verdict.warnings,
            suggested_action: verdict.suggested_action,
            created_at: now,
            updated_at: now,
        }
    }
}
