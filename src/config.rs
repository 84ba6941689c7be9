// ==========================================
// School Import - runtime configuration
// ==========================================
// Tuning knobs for the batch pipeline. Loaded from a JSON file when one
// is present; every field has a default so a missing or partial file
// still yields a working configuration.
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Upper bound on files processed concurrently per coordinator.
    pub max_parallel_files: usize,
    /// Total attempts per file (first run + retries).
    pub attempt_budget: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub backoff_ms: u64,
    /// Per-attempt processing timeout, in seconds.
    pub file_timeout_secs: u64,
    /// Rows handed to the classifier as a preview.
    pub preview_rows: usize,
    /// When set, warning-only records end as NEEDS_REVIEW instead of VALID.
    pub strict_review: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_parallel_files: 4,
            attempt_budget: 3,
            backoff_ms: 500,
            file_timeout_secs: 300,
            preview_rows: 10,
            strict_review: false,
        }
    }
}

impl ImportConfig {
    /// Load configuration from a JSON file. Missing file ⇒ defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.max_parallel_files, 4);
        assert_eq!(config.attempt_budget, 3);
        assert!(!config.strict_review);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{"max_parallel_files": 8}}"#).unwrap();

        let config = ImportConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_parallel_files, 8);
        assert_eq!(config.attempt_budget, 3);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ImportConfig::load(Path::new("/nonexistent/import.json")).unwrap();
        assert_eq!(config.preview_rows, 10);
    }
}
