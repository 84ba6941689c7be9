// ==========================================
// School Import - row extractors
// ==========================================
// Turns a stored file (path + declared MIME type) into ordered row
// mappings. Readers are registered per MIME type; an unregistered type is
// UnsupportedFormat, a failing parse is CorruptInput. Neither is retried
// at this level — the job scheduler decides whether to retry the file.
// ==========================================

use crate::domain::import::RawRow;
use crate::importer::error::{ImportError, ImportPipelineResult};
use crate::importer::pipeline_trait::Extractor;
use calamine::Reader;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Full extraction result: rows in source order plus the source column
/// order (HashMap rows lose it otherwise).
#[derive(Debug, Clone)]
pub struct Extraction {
    pub rows: Vec<RawRow>,
    pub column_order: Vec<String>,
}

/// One registered file-format reader.
///
/// `limit` bounds the number of data rows read (preview); `None` reads
/// everything.
trait FormatReader: Send + Sync {
    fn read(&self, path: &Path, limit: Option<usize>) -> ImportPipelineResult<Extraction>;
}

fn assemble_rows(
    headers: &[String],
    data_rows: impl Iterator<Item = Vec<String>>,
    limit: Option<usize>,
) -> Vec<RawRow> {
    let mut rows = Vec::new();
    for cells in data_rows {
        if let Some(n) = limit {
            if rows.len() >= n {
                break;
            }
        }
        let mut row = RawRow::new();
        for (idx, value) in cells.iter().enumerate() {
            if let Some(header) = headers.get(idx) {
                row.insert(header.clone(), value.trim().to_string());
            }
        }
        // Skip fully blank rows; they are layout noise, not data.
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    rows
}

// ==========================================
// CSV reader
// ==========================================
struct CsvReader;

impl FormatReader for CsvReader {
    fn read(&self, path: &Path, limit: Option<usize>) -> ImportPipelineResult<Extraction> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        // Stop pulling records once enough non-blank rows are in hand, so
        // a preview never scans the whole file.
        let mut data_rows = Vec::new();
        let mut non_blank = 0usize;
        for result in reader.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            if cells.iter().any(|c| !c.trim().is_empty()) {
                non_blank += 1;
            }
            data_rows.push(cells);
            if limit.is_some_and(|n| non_blank >= n) {
                break;
            }
        }

        Ok(Extraction {
            rows: assemble_rows(&headers, data_rows.into_iter(), limit),
            column_order: headers,
        })
    }
}

// ==========================================
// Spreadsheet reader (.xlsx / .xls via calamine)
// ==========================================
struct SpreadsheetReader;

impl FormatReader for SpreadsheetReader {
    fn read(&self, path: &Path, limit: Option<usize>) -> ImportPipelineResult<Extraction> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = calamine::open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::CorruptInput("workbook has no sheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::CorruptInput(e.to_string()))?;

        let mut rows_iter = range.rows();
        let header_row = rows_iter
            .next()
            .ok_or_else(|| ImportError::CorruptInput("sheet has no header row".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let data_rows = rows_iter
            .map(|cells| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>());

        Ok(Extraction {
            rows: assemble_rows(&headers, data_rows, limit),
            column_order: headers,
        })
    }
}

// ==========================================
// PDF reader (lopdf)
// ==========================================
// Rows are derived from table-like regions: the first text line that
// splits into 2+ columns becomes the header; following lines with the
// same column count become data rows. Anything else (titles, footers)
// is skipped.
struct PdfReader;

/// Split a text line into table cells: tabs, then semicolons or pipes,
/// then runs of two-or-more spaces.
fn split_table_line(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let cells: Vec<String> = if trimmed.contains('\t') {
        trimmed.split('\t').map(|c| c.trim().to_string()).collect()
    } else if trimmed.contains(';') {
        trimmed.split(';').map(|c| c.trim().to_string()).collect()
    } else if trimmed.contains('|') {
        trimmed
            .split('|')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    } else {
        trimmed
            .split("  ")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    };
    cells.into_iter().filter(|c| !c.is_empty()).collect()
}

impl FormatReader for PdfReader {
    fn read(&self, path: &Path, limit: Option<usize>) -> ImportPipelineResult<Extraction> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let doc = lopdf::Document::load(path)?;

        let mut lines: Vec<String> = Vec::new();
        for (page_num, _) in doc.get_pages() {
            let page_text = doc
                .extract_text(&[page_num])
                .map_err(|e| ImportError::CorruptInput(format!("PDF text extraction: {e}")))?;
            lines.extend(page_text.lines().map(|l| l.to_string()));
        }

        // Locate the table header: first line with at least two columns.
        let mut headers: Vec<String> = Vec::new();
        let mut data_rows: Vec<Vec<String>> = Vec::new();
        for line in &lines {
            let cells = split_table_line(line);
            if headers.is_empty() {
                if cells.len() >= 2 {
                    headers = cells;
                }
                continue;
            }
            if cells.len() == headers.len() {
                data_rows.push(cells);
            }
        }

        if headers.is_empty() {
            return Err(ImportError::CorruptInput(
                "no table-like region found in PDF".to_string(),
            ));
        }

        Ok(Extraction {
            rows: assemble_rows(&headers, data_rows.into_iter(), limit),
            column_order: headers,
        })
    }
}

// ==========================================
// FormatRegistry - MIME type → reader dispatch
// ==========================================
pub struct FormatRegistry;

impl FormatRegistry {
    pub fn new() -> Self {
        Self
    }

    fn reader_for(&self, mime_type: &str) -> ImportPipelineResult<Box<dyn FormatReader>> {
        match mime_type.trim().to_ascii_lowercase().as_str() {
            "text/csv" | "application/csv" | "text/plain" => Ok(Box::new(CsvReader)),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Ok(Box::new(SpreadsheetReader)),
            "application/pdf" => Ok(Box::new(PdfReader)),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for FormatRegistry {
    fn preview(&self, path: &Path, mime_type: &str, n: usize) -> ImportPipelineResult<Vec<RawRow>> {
        let reader = self.reader_for(mime_type)?;
        Ok(reader.read(path, Some(n))?.rows)
    }

    fn extract_all(&self, path: &Path, mime_type: &str) -> ImportPipelineResult<Extraction> {
        let reader = self.reader_for(mime_type)?;
        reader.read(path, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(tmp, "{line}").unwrap();
        }
        tmp
    }

    #[test]
    fn test_csv_extract_all() {
        let tmp = write_csv(&[
            "national id,name,period",
            "10000001,Ana Diaz,2026-1",
            "10000002,Luis Rojas,2026-1",
        ]);

        let registry = FormatRegistry::new();
        let extraction = registry
            .extract_all(tmp.path(), "text/csv")
            .expect("extract should succeed");

        assert_eq!(extraction.rows.len(), 2);
        assert_eq!(
            extraction.column_order,
            vec!["national id", "name", "period"]
        );
        assert_eq!(
            extraction.rows[0].get("name"),
            Some(&"Ana Diaz".to_string())
        );
    }

    #[test]
    fn test_csv_preview_is_bounded() {
        let tmp = write_csv(&[
            "national id,name",
            "1,a",
            "2,b",
            "3,c",
            "4,d",
        ]);

        let registry = FormatRegistry::new();
        let rows = registry.preview(tmp.path(), "text/csv", 2).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_csv_preview_does_not_read_past_limit() {
        // Invalid UTF-8 after the preview window: a bounded preview never
        // parses that record, while a full extraction does and fails.
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"national id,name\n1,a\n2,b\n3,\xff\xfe\n")
            .unwrap();

        let registry = FormatRegistry::new();
        let rows = registry.preview(tmp.path(), "text/csv", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(registry.extract_all(tmp.path(), "text/csv").is_err());
    }

    #[test]
    fn test_csv_preview_limit_ignores_blank_rows() {
        let tmp = write_csv(&["national id,name", "1,a", ",", "2,b"]);

        let registry = FormatRegistry::new();
        let rows = registry.preview(tmp.path(), "text/csv", 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("name"), Some(&"b".to_string()));
    }

    #[test]
    fn test_csv_skips_blank_rows() {
        let tmp = write_csv(&["national id,name", "1,a", ",", "2,b"]);

        let registry = FormatRegistry::new();
        let extraction = registry.extract_all(tmp.path(), "text/csv").unwrap();
        assert_eq!(extraction.rows.len(), 2);
    }

    #[test]
    fn test_unregistered_mime_is_unsupported() {
        let tmp = write_csv(&["a,b", "1,2"]);
        let registry = FormatRegistry::new();
        let err = registry.extract_all(tmp.path(), "application/zip");
        assert!(matches!(err, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        let registry = FormatRegistry::new();
        let err = registry.extract_all(Path::new("no_such_file.csv"), "text/csv");
        assert!(matches!(err, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_corrupt_spreadsheet() {
        // A CSV payload declared as a spreadsheet fails the workbook parse.
        let tmp = write_csv(&["a,b", "1,2"]);
        let registry = FormatRegistry::new();
        let err = registry.extract_all(
            tmp.path(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_split_table_line_variants() {
        assert_eq!(split_table_line("a\tb\tc"), vec!["a", "b", "c"]);
        assert_eq!(split_table_line("a; b; c"), vec!["a", "b", "c"]);
        assert_eq!(split_table_line("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_table_line("a   b    c"), vec!["a", "b", "c"]);
        assert!(split_table_line("   ").is_empty());
    }
}
