// ==========================================
// School Import - domain layer
// ==========================================
// Entities and shared types. No business rules here.
// ==========================================

pub mod import;
pub mod types;

pub use import::{
    BatchStatus, FieldIssue, FieldValue, FileSummary, ImportBatch, ImportFile, ImportRecord,
    IssueCode, MappedRecord, RawRow, UploadedFile, Verdict,
};
pub use types::{
    BatchState, FailureOrigin, FileState, ImportModule, RecordState, SuggestedAction, TenantId,
};
