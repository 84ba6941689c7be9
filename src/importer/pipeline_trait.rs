// ==========================================
// School Import - pipeline component traits
// ==========================================
// Interfaces for the stateless pipeline stages. Implementations:
// FormatRegistry, RuleClassifier, DictionaryMapper. The validation engine
// is generic over the repository and lives in validation.rs.
// ==========================================

use crate::domain::import::{MappedRecord, RawRow};
use crate::domain::types::ImportModule;
use crate::importer::error::ImportPipelineResult;
use crate::importer::extractor::Extraction;
use std::path::Path;

// ==========================================
// Extractor trait
// ==========================================
// File → ordered row mappings. `preview` reads at most `n` data rows;
// `extract_all` also reports the source column order.
pub trait Extractor: Send + Sync {
    fn preview(&self, path: &Path, mime_type: &str, n: usize) -> ImportPipelineResult<Vec<RawRow>>;

    fn extract_all(&self, path: &Path, mime_type: &str) -> ImportPipelineResult<Extraction>;
}

// ==========================================
// Classifier trait
// ==========================================
/// Module guess plus a 0–1 confidence. `ImportModule::Unknown` with
/// confidence 0.0 when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub module: ImportModule,
    pub confidence: f64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            module: ImportModule::Unknown,
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.module == ImportModule::Unknown
    }
}

pub trait Classifier: Send + Sync {
    /// Deterministic: same filename + preview always yields the same
    /// classification. Never fails — "no idea" is `unknown()`.
    fn classify(&self, file_name: &str, preview: &[RawRow]) -> Classification;
}

// ==========================================
// SchemaMapper trait
// ==========================================
// Raw row → canonical mapped record via the module's field dictionary.
// Missing columns map to Null values; only a present-but-uncoercible
// value is an error (TypeCoercion, row-scoped).
pub trait SchemaMapper: Send + Sync {
    fn map_row(
        &self,
        module: ImportModule,
        raw: &RawRow,
        row_number: usize,
    ) -> ImportPipelineResult<MappedRecord>;
}
