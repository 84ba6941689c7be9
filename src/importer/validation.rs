// ==========================================
// School Import - validation engine
// ==========================================
// Rule evaluation order per record:
//   1. required-field presence
//   2. per-field format/range rules (all violations accumulate)
//   3. uniqueness against persisted data via the module's natural key
//      (within-file duplicates included, via the caller's seen-key set)
//   4. soft warnings
// INVALID takes precedence over DUPLICATE; NEEDS_REVIEW is reserved for
// warning-only records under strict mode. Re-validating unchanged data
// against unchanged persisted state yields the same verdict.
// ==========================================

use crate::domain::import::{FieldIssue, IssueCode, MappedRecord, Verdict};
use crate::domain::types::{ImportModule, RecordState, SuggestedAction, TenantId};
use crate::importer::error::{ImportError, ImportPipelineResult};
use crate::importer::schema::{schema_for, FieldRule, ModuleSchema, WarningRule};
use crate::repository::ImportRepository;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ValidationEngine<R: ImportRepository> {
    repo: Arc<R>,
    /// When set, warning-only records become NEEDS_REVIEW instead of VALID.
    strict_review: bool,
}

impl<R: ImportRepository> ValidationEngine<R> {
    pub fn new(repo: Arc<R>, strict_review: bool) -> Self {
        Self {
            repo,
            strict_review,
        }
    }

    /// Validate one mapped record.
    ///
    /// `seen_keys` carries the natural keys already accepted earlier in the
    /// same file run; pass a fresh set when re-validating a single record.
    pub async fn validate(
        &self,
        tenant: &TenantId,
        module: ImportModule,
        mapped: &MappedRecord,
        seen_keys: &mut HashSet<String>,
    ) -> ImportPipelineResult<Verdict> {
        let schema = schema_for(module).ok_or_else(|| {
            ImportError::Internal(format!("no schema registered for module {module}"))
        })?;

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        self.check_required(schema, mapped, &mut errors);
        self.check_rules(schema, mapped, &mut errors);
        let duplicate = self
            .check_uniqueness(tenant, schema, mapped, seen_keys, &mut warnings)
            .await?;
        self.check_warnings(schema, mapped, &mut warnings);

        let (state, suggested_action) = if !errors.is_empty() {
            (RecordState::Invalid, SuggestedAction::Fix)
        } else if duplicate {
            (RecordState::Duplicate, SuggestedAction::Skip)
        } else if self.strict_review && !warnings.is_empty() {
            (RecordState::NeedsReview, SuggestedAction::Review)
        } else {
            (RecordState::Valid, SuggestedAction::Create)
        };

        Ok(Verdict {
            state,
            errors,
            warnings,
            suggested_action,
        })
    }

    fn check_required(
        &self,
        schema: &ModuleSchema,
        mapped: &MappedRecord,
        errors: &mut Vec<FieldIssue>,
    ) {
        for spec in schema.fields.iter().filter(|s| s.required) {
            let present = mapped.get(spec.name).map(|v| !v.is_null()).unwrap_or(false);
            if !present {
                errors.push(FieldIssue::new(
                    spec.name,
                    IssueCode::MissingField,
                    format!("missing field {}", spec.name),
                ));
            }
        }
    }

    // All rules run; violations accumulate instead of short-circuiting.
    fn check_rules(
        &self,
        schema: &ModuleSchema,
        mapped: &MappedRecord,
        errors: &mut Vec<FieldIssue>,
    ) {
        let today = Utc::now().date_naive();
        for rule in schema.rules {
            match rule {
                FieldRule::DateNotFuture { field } => {
                    if let Some(date) = mapped.get(*field).and_then(|v| v.as_date()) {
                        if date > today {
                            errors.push(FieldIssue::new(
                                *field,
                                IssueCode::RangeViolation,
                                format!("{field} is in the future ({date})"),
                            ));
                        }
                    }
                }
                FieldRule::DecimalRange { field, min, max } => {
                    if let Some(value) = mapped.get(*field).and_then(|v| v.as_decimal()) {
                        if value < *min || value > *max {
                            errors.push(FieldIssue::new(
                                *field,
                                IssueCode::RangeViolation,
                                format!("{field} {value} outside [{min}, {max}]"),
                            ));
                        }
                    }
                }
                FieldRule::IntegerRange { field, min, max } => {
                    if let Some(value) = mapped.get(*field).and_then(|v| v.as_integer()) {
                        if value < *min || value > *max {
                            errors.push(FieldIssue::new(
                                *field,
                                IssueCode::RangeViolation,
                                format!("{field} {value} outside [{min}, {max}]"),
                            ));
                        }
                    }
                }
                FieldRule::EmailFormat { field } => {
                    if let Some(text) = mapped.get(*field).and_then(|v| v.as_text()) {
                        let looks_like_email =
                            text.contains('@') && text.split('@').nth(1).is_some_and(|d| d.contains('.'));
                        if !looks_like_email {
                            errors.push(FieldIssue::new(
                                *field,
                                IssueCode::FormatViolation,
                                format!("'{text}' is not a valid email address"),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Returns true when the record's natural key already exists, either
    /// in persisted data or earlier in the same file run. An incomplete
    /// key is not checked — missing components surface as missing-field
    /// errors, never as invented data.
    async fn check_uniqueness(
        &self,
        tenant: &TenantId,
        schema: &ModuleSchema,
        mapped: &MappedRecord,
        seen_keys: &mut HashSet<String>,
        warnings: &mut Vec<FieldIssue>,
    ) -> ImportPipelineResult<bool> {
        let key = match schema.natural_key_of(mapped) {
            Some(key) => key,
            None => return Ok(false),
        };

        let duplicate = if seen_keys.contains(&key) {
            true
        } else {
            self.repo
                .natural_key_exists(tenant, schema.module, &key)
                .await?
        };

        if duplicate {
            warnings.push(FieldIssue::new(
                schema.natural_key.join("+"),
                IssueCode::DuplicateKey,
                format!("a record with key '{key}' already exists"),
            ));
        } else {
            seen_keys.insert(key);
        }
        Ok(duplicate)
    }

    fn check_warnings(
        &self,
        schema: &ModuleSchema,
        mapped: &MappedRecord,
        warnings: &mut Vec<FieldIssue>,
    ) {
        for rule in schema.warnings {
            match rule {
                WarningRule::ImplausibleDecimal {
                    field,
                    lo,
                    hi,
                    message,
                } => {
                    if let Some(value) = mapped.get(*field).and_then(|v| v.as_decimal()) {
                        if value < *lo || value > *hi {
                            warnings.push(FieldIssue::new(
                                *field,
                                IssueCode::Implausible,
                                *message,
                            ));
                        }
                    }
                }
                WarningRule::UnexpectedCombination {
                    field,
                    when_field,
                    equals,
                    message,
                } => {
                    let field_present = mapped
                        .get(*field)
                        .map(|v| !v.is_null())
                        .unwrap_or(false);
                    let condition = mapped
                        .get(*when_field)
                        .and_then(|v| v.as_text())
                        .is_some_and(|t| t == *equals);
                    if field_present && condition {
                        warnings.push(FieldIssue::new(*field, IssueCode::Implausible, *message));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::FieldValue;
    use crate::repository::SqliteImportRepository;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn engine(strict: bool) -> (NamedTempFile, ValidationEngine<SqliteImportRepository>) {
        let tmp = NamedTempFile::new().unwrap();
        let repo = Arc::new(SqliteImportRepository::open(tmp.path().to_str().unwrap()).unwrap());
        (tmp, ValidationEngine::new(repo, strict))
    }

    fn grades_record(national_id: &str, subject: &str, score: f64) -> MappedRecord {
        let mut mapped = MappedRecord::new();
        mapped.insert("national_id".into(), FieldValue::Text(national_id.into()));
        mapped.insert("subject".into(), FieldValue::Text(subject.into()));
        mapped.insert("academic_period".into(), FieldValue::Text("2026-1".into()));
        mapped.insert("score".into(), FieldValue::Decimal(score));
        mapped.insert("evaluation_date".into(), FieldValue::Null);
        mapped
    }

    #[tokio::test]
    async fn test_missing_required_field_is_invalid() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mut mapped = grades_record("1", "math", 80.0);
        mapped.insert("national_id".into(), FieldValue::Null);

        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Invalid);
        assert_eq!(verdict.suggested_action, SuggestedAction::Fix);
        assert!(verdict
            .errors
            .iter()
            .any(|e| e.code == IssueCode::MissingField && e.field == "national_id"));
    }

    #[tokio::test]
    async fn test_violations_accumulate() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mut mapped = grades_record("1", "math", 150.0);
        mapped.insert("subject".into(), FieldValue::Null);

        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Invalid);
        // Both the missing subject and the out-of-range score are reported.
        assert_eq!(verdict.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_existing_key_yields_duplicate_skip_without_errors() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        engine
            .repo
            .register_entity(&tenant, ImportModule::Grades, "1|MATH|2026-1")
            .await
            .unwrap();

        let mapped = grades_record("1", "math", 80.0);
        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Duplicate);
        assert_eq!(verdict.suggested_action, SuggestedAction::Skip);
        assert!(verdict.errors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_takes_precedence_over_duplicate() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        engine
            .repo
            .register_entity(&tenant, ImportModule::Grades, "1|MATH|2026-1")
            .await
            .unwrap();

        let mapped = grades_record("1", "math", 150.0);
        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Invalid);
    }

    #[tokio::test]
    async fn test_within_file_duplicate_detection() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mut seen = HashSet::new();

        let first = engine
            .validate(
                &tenant,
                ImportModule::Grades,
                &grades_record("1", "math", 80.0),
                &mut seen,
            )
            .await
            .unwrap();
        assert_eq!(first.state, RecordState::Valid);

        let second = engine
            .validate(
                &tenant,
                ImportModule::Grades,
                &grades_record("1", "math", 90.0),
                &mut seen,
            )
            .await
            .unwrap();
        assert_eq!(second.state, RecordState::Duplicate);
    }

    #[tokio::test]
    async fn test_future_date_is_range_violation() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mut mapped = grades_record("1", "math", 80.0);
        mapped.insert(
            "evaluation_date".into(),
            FieldValue::Date(Utc::now().date_naive() + chrono::Duration::days(30)),
        );

        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Invalid);
        assert!(verdict
            .errors
            .iter()
            .any(|e| e.code == IssueCode::RangeViolation && e.field == "evaluation_date"));
    }

    #[tokio::test]
    async fn test_warning_does_not_change_valid_state() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mapped = grades_record("1", "math", 0.0);

        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Valid);
        assert!(verdict
            .warnings
            .iter()
            .any(|w| w.code == IssueCode::Implausible));
    }

    #[tokio::test]
    async fn test_strict_mode_flags_warning_records_for_review() {
        let (_tmp, engine) = engine(true);
        let tenant = TenantId::new("t1");
        let mapped = grades_record("1", "math", 0.0);

        let verdict = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::NeedsReview);
        assert_eq!(verdict.suggested_action, SuggestedAction::Review);
    }

    #[tokio::test]
    async fn test_revalidation_is_idempotent() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mapped = grades_record("1", "math", 85.5);

        let first = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        let second = engine
            .validate(&tenant, ImportModule::Grades, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_bad_email_is_format_violation() {
        let (_tmp, engine) = engine(false);
        let tenant = TenantId::new("t1");
        let mut mapped = MappedRecord::new();
        mapped.insert("national_id".into(), FieldValue::Text("1".into()));
        mapped.insert("student_name".into(), FieldValue::Text("Ana".into()));
        mapped.insert("academic_period".into(), FieldValue::Text("2026-1".into()));
        mapped.insert("email".into(), FieldValue::Text("not-an-email".into()));

        let verdict = engine
            .validate(&tenant, ImportModule::Enrollment, &mapped, &mut HashSet::new())
            .await
            .unwrap();
        assert_eq!(verdict.state, RecordState::Invalid);
        assert!(verdict
            .errors
            .iter()
            .any(|e| e.code == IssueCode::FormatViolation && e.field == "email"));
    }
}
