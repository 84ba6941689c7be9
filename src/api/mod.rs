// ==========================================
// School Import - API layer
// ==========================================
// Business interfaces for a transport layer (HTTP handlers, CLI) to call.
// ==========================================

pub mod error;
pub mod import_api;

// Re-export core types
pub use error::{ApiError, ApiResult};
pub use import_api::{
    CancelBatchResponse, ConfirmBatchResponse, CreateBatchResponse, ImportApi, RecordListResponse,
};
