// ==========================================
// Test helpers
// ==========================================
// Temp database + upload fixtures shared by the integration tests.
// ==========================================

#![allow(dead_code)]

use school_import::config::ImportConfig;
use school_import::domain::import::UploadedFile;
use school_import::ImportApi;
use std::io::Write;
use tempfile::TempDir;

pub const TENANT: &str = "colegio-san-martin";

/// Create an ImportApi backed by a fresh temp database.
///
/// The TempDir must stay alive for the duration of the test; uploaded
/// fixture files are written into the same directory.
pub fn create_test_api() -> (TempDir, ImportApi) {
    create_test_api_with(ImportConfig {
        backoff_ms: 1,
        ..ImportConfig::default()
    })
}

pub fn create_test_api_with(config: ImportConfig) -> (TempDir, ImportApi) {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("import.db");
    let api = ImportApi::new(db_path.to_str().unwrap(), config).expect("api");
    (dir, api)
}

/// Write a fixture file into the test directory and describe it as an
/// upload with the given MIME type.
pub fn write_upload(dir: &TempDir, name: &str, mime: &str, content: &str) -> UploadedFile {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).expect("fixture file");
    f.write_all(content.as_bytes()).expect("fixture write");
    UploadedFile {
        file_name: name.to_string(),
        stored_path: path.to_str().unwrap().to_string(),
        mime_type: mime.to_string(),
    }
}

/// Enrollment CSV with Spanish headers: three clean rows plus one missing
/// the required student name.
pub fn enrollment_csv() -> &'static str {
    "Cédula,Nombre del Alumno,Período,Grado,Fecha de Matrícula\n\
     10000001,Ana Díaz,2026-1,7,15/01/2026\n\
     10000002,Luis Soto,2026-1,8,16/01/2026\n\
     10000003,Marta Vega,2026-1,7,17/01/2026\n\
     10000004,,2026-1,9,18/01/2026\n"
}

pub fn grades_csv() -> &'static str {
    "Cédula,Materia,Período,Nota\n\
     10000001,Matemáticas,2026-1,85\n\
     10000002,Matemáticas,2026-1,\"92,5\"\n\
     10000003,Matemáticas,2026-1,47\n"
}
