// ==========================================
// School Import - repository layer
// ==========================================
// Data access only; no business rules.
// ==========================================

pub mod error;
pub mod import_repo;
pub mod import_repo_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use import_repo::{ClaimOutcome, FileCompletion, FileOutcome, ImportRepository};
pub use import_repo_impl::SqliteImportRepository;
