// ==========================================
// School Import - core library
// ==========================================
// Bulk document import pipeline for a multi-tenant school management
// platform: enrollment lists, grade sheets, and attendance logs arrive
// as CSV / spreadsheet / PDF uploads and leave as validated, reviewable
// records.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and shared types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Importer layer - the extraction/classification/validation pipeline
pub mod importer;

// Background job scheduling
pub mod jobs;

// Runtime configuration
pub mod config;

// Database infrastructure (connection init / PRAGMA in one place)
pub mod db;

// Logging
pub mod logging;

// API layer - business interfaces
pub mod api;

// ==========================================
// Re-export core types
// ==========================================

// Domain types
pub use domain::types::{
    BatchState, FailureOrigin, FileState, ImportModule, RecordState, SuggestedAction, TenantId,
};

// Domain entities
pub use domain::{
    BatchStatus, FieldIssue, FieldValue, FileSummary, ImportBatch, ImportFile, ImportRecord,
    IssueCode, MappedRecord, RawRow, UploadedFile, Verdict,
};

// Pipeline
pub use importer::{
    BatchCoordinator, DictionaryMapper, FileProcessor, FormatRegistry, ImportError,
    ImportPipelineResult, RuleClassifier, ValidationEngine,
};

// Scheduling
pub use jobs::{JobScheduler, JobSpec, JobUnit, TokioJobScheduler};

// Configuration
pub use config::ImportConfig;

// API
pub use api::{ApiError, ApiResult, ImportApi};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const APP_NAME: &str = "school-import";
