// ==========================================
// School Import - core domain types
// ==========================================
// Shared enums and identifiers for the import pipeline.
// Serialization format: SCREAMING_SNAKE_CASE (matches DB columns).
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// TenantId
// ==========================================
// Every persistence call is scoped by the owning institution. The tenant is
// threaded explicitly through coordinator/processor calls, never read from
// ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// ImportModule - canonical data domain
// ==========================================
// The module a file is classified into. Adding a module is a data change
// (a new entry in the schema registry), not a new code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportModule {
    Enrollment,
    Grades,
    Attendance,
    Unknown,
}

impl ImportModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportModule::Enrollment => "ENROLLMENT",
            ImportModule::Grades => "GRADES",
            ImportModule::Attendance => "ATTENDANCE",
            ImportModule::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(raw: &str) -> ImportModule {
        match raw.trim() {
            "ENROLLMENT" => ImportModule::Enrollment,
            "GRADES" => ImportModule::Grades,
            "ATTENDANCE" => ImportModule::Attendance,
            _ => ImportModule::Unknown,
        }
    }
}

impl fmt::Display for ImportModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// BatchState - batch lifecycle
// ==========================================
// PENDING → PROCESSING → COMPLETED, or CANCELLED.
// COMPLETED exactly when processed_files == total_files and not cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Pending => "PENDING",
            BatchState::Processing => "PROCESSING",
            BatchState::Completed => "COMPLETED",
            BatchState::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> BatchState {
        match raw.trim() {
            "PROCESSING" => BatchState::Processing,
            "COMPLETED" => BatchState::Completed,
            "CANCELLED" => BatchState::Cancelled,
            _ => BatchState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Cancelled)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// FileState - per-file lifecycle
// ==========================================
// PENDING → PROCESSING → {PROCESSED, ERROR}. A file reaches a terminal
// state exactly once; that transition carries the batch counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Pending,
    Processing,
    Processed,
    Error,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Pending => "PENDING",
            FileState::Processing => "PROCESSING",
            FileState::Processed => "PROCESSED",
            FileState::Error => "ERROR",
        }
    }

    pub fn parse(raw: &str) -> FileState {
        match raw.trim() {
            "PROCESSING" => FileState::Processing,
            "PROCESSED" => FileState::Processed,
            "ERROR" => FileState::Error,
            _ => FileState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Processed | FileState::Error)
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// RecordState - validation verdict
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Valid,
    Invalid,
    Duplicate,
    NeedsReview,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Valid => "VALID",
            RecordState::Invalid => "INVALID",
            RecordState::Duplicate => "DUPLICATE",
            RecordState::NeedsReview => "NEEDS_REVIEW",
        }
    }

    pub fn parse(raw: &str) -> RecordState {
        match raw.trim() {
            "INVALID" => RecordState::Invalid,
            "DUPLICATE" => RecordState::Duplicate,
            "NEEDS_REVIEW" => RecordState::NeedsReview,
            _ => RecordState::Valid,
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// SuggestedAction - remedial action for a record
// ==========================================
// Downstream confirmation decides what actually happens; this is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    /// Insert as a new entity.
    Create,
    /// Skip (natural key already exists).
    Skip,
    /// Needs manual correction before it can be imported.
    Fix,
    /// Needs human confirmation (warnings under strict mode).
    Review,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::Create => "create",
            SuggestedAction::Skip => "skip",
            SuggestedAction::Fix => "fix",
            SuggestedAction::Review => "review",
        }
    }

    pub fn parse(raw: &str) -> SuggestedAction {
        match raw.trim() {
            "skip" => SuggestedAction::Skip,
            "fix" => SuggestedAction::Fix,
            "review" => SuggestedAction::Review,
            _ => SuggestedAction::Create,
        }
    }
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// FailureOrigin - stage that produced a file-level failure
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureOrigin {
    Extraction,
    Classification,
    Mapping,
    Validation,
    Persistence,
    Timeout,
}

impl FailureOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureOrigin::Extraction => "EXTRACTION",
            FailureOrigin::Classification => "CLASSIFICATION",
            FailureOrigin::Mapping => "MAPPING",
            FailureOrigin::Validation => "VALIDATION",
            FailureOrigin::Persistence => "PERSISTENCE",
            FailureOrigin::Timeout => "TIMEOUT",
        }
    }

    pub fn parse(raw: &str) -> FailureOrigin {
        match raw.trim() {
            "CLASSIFICATION" => FailureOrigin::Classification,
            "MAPPING" => FailureOrigin::Mapping,
            "VALIDATION" => FailureOrigin::Validation,
            "PERSISTENCE" => FailureOrigin::Persistence,
            "TIMEOUT" => FailureOrigin::Timeout,
            _ => FailureOrigin::Extraction,
        }
    }
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
