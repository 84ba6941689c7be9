// ==========================================
// School Import - import entities
// ==========================================
// Batch 1—N File 1—N Record. No record outlives its file; no file
// outlives its batch. Aligned with the tables in db::SCHEMA_DDL.
// ==========================================

use crate::domain::types::{
    BatchState, FailureOrigin, FileState, ImportModule, RecordState, SuggestedAction, TenantId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// FieldValue - typed canonical value
// ==========================================
// `Null` is a mapped-but-absent field; absence is surfaced by the
// validation engine, never by the mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            FieldValue::Decimal(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Stable textual form used to build natural keys.
    pub fn key_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.trim().to_uppercase(),
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Decimal(v) => format!("{v}"),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, ""),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Decimal(v) => write!(f, "{v}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Canonical field name → typed value. BTreeMap for deterministic
/// serialization (verdict idempotence is asserted over the JSON form).
pub type MappedRecord = BTreeMap<String, FieldValue>;

/// Raw column label → raw cell text, exactly as extracted.
pub type RawRow = HashMap<String, String>;

// ==========================================
// IssueCode / FieldIssue - structured errors and warnings
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingField,
    TypeCoercion,
    FormatViolation,
    RangeViolation,
    DuplicateKey,
    Implausible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub code: IssueCode,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

// ==========================================
// Verdict - validation outcome for one record
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub state: RecordState,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
    pub suggested_action: SuggestedAction,
}

// ==========================================
// ImportBatch - one upload session
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub tenant_id: TenantId,
    pub label: String,
    pub total_files: i64,
    pub processed_files: i64,
    pub state: BatchState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set by `confirm` once the caller accepts the validated records.
    pub confirmed_at: Option<DateTime<Utc>>,
}

// ==========================================
// ImportFile - one uploaded document within a batch
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFile {
    pub file_id: String,
    pub batch_id: String,
    pub tenant_id: TenantId,
    pub file_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub state: FileState,
    pub module: Option<ImportModule>,
    /// Classifier confidence, 0.0–1.0.
    pub confidence: f64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub elapsed_ms: Option<i64>,
    pub error_message: Option<String>,
    pub error_origin: Option<FailureOrigin>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// ImportRecord - one extracted row of a file
// ==========================================
// Row numbers are 1-based and match source-file order; unique per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    pub record_id: String,
    pub file_id: String,
    pub tenant_id: TenantId,
    pub row_number: i64,
    pub raw_data: RawRow,
    pub mapped_data: MappedRecord,
    pub state: RecordState,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
    pub suggested_action: SuggestedAction,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// UploadedFile - input to batch creation
// ==========================================
// Upload/storage itself is an external collaborator; the pipeline only
// sees the durable path plus the declared MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub stored_path: String,
    pub mime_type: String,
}

// ==========================================
// Aggregate status views
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_id: String,
    pub file_name: String,
    pub state: FileState,
    pub module: Option<ImportModule>,
    pub confidence: f64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub error_message: Option<String>,
    pub error_origin: Option<FailureOrigin>,
}

impl From<&ImportFile> for FileSummary {
    fn from(f: &ImportFile) -> Self {
        Self {
            file_id: f.file_id.clone(),
            file_name: f.file_name.clone(),
            state: f.state,
            module: f.module,
            confidence: f.confidence,
            total_rows: f.total_rows,
            valid_rows: f.valid_rows,
            invalid_rows: f.invalid_rows,
            error_message: f.error_message.clone(),
            error_origin: f.error_origin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatus {
    pub batch_id: String,
    pub label: String,
    pub state: BatchState,
    pub total_files: i64,
    pub processed_files: i64,
    pub failed_files: i64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub files: Vec<FileSummary>,
}
