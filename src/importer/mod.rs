// ==========================================
// School Import - import pipeline layer
// ==========================================
// File intake: extraction, classification, mapping, validation, and the
// orchestrators that tie them to persistence and scheduling.
// ==========================================

// Module declarations
pub mod batch_coordinator;
pub mod classifier;
pub mod error;
pub mod extractor;
pub mod file_processor;
pub mod pipeline_trait;
pub mod schema;
pub mod schema_mapper;
pub mod validation;

// Re-export core types
pub use batch_coordinator::BatchCoordinator;
pub use classifier::RuleClassifier;
pub use error::{ImportError, ImportPipelineResult};
pub use extractor::{Extraction, FormatRegistry};
pub use file_processor::FileProcessor;
pub use schema::{schema_for, ModuleSchema};
pub use schema_mapper::DictionaryMapper;
pub use validation::ValidationEngine;

// Re-export trait interfaces
pub use pipeline_trait::{Classification, Classifier, Extractor, SchemaMapper};
