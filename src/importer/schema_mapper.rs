// ==========================================
// School Import - dictionary-based schema mapper
// ==========================================
// Raw row → canonical mapped record. Alias resolution and type coercion
// come from the module's field dictionary. Missing data never fails here
// (absence is the validation engine's business); only a value that is
// present but uncoercible raises TypeCoercion, which the orchestrator
// turns into a row-level validation error.
// ==========================================

use crate::domain::import::{FieldValue, MappedRecord, RawRow};
use crate::domain::types::ImportModule;
use crate::importer::error::{ImportError, ImportPipelineResult};
use crate::importer::pipeline_trait::SchemaMapper;
use crate::importer::schema::{schema_for, FieldKind, FieldSpec, ModuleSchema};
use chrono::NaiveDate;

pub struct DictionaryMapper;

impl DictionaryMapper {
    pub fn new() -> Self {
        Self
    }

    fn raw_value<'a>(schema: &ModuleSchema, spec: &FieldSpec, raw: &'a RawRow) -> Option<&'a str> {
        for (label, value) in raw {
            if let Some(found) = schema.field_for_label(label) {
                if found.name == spec.name {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed);
                    }
                }
            }
        }
        None
    }

    fn coerce(
        spec: &FieldSpec,
        value: &str,
        row_number: usize,
    ) -> ImportPipelineResult<FieldValue> {
        match spec.kind {
            FieldKind::Text => Ok(FieldValue::Text(value.to_string())),
            FieldKind::Integer => value.parse::<i64>().map(FieldValue::Integer).map_err(|_| {
                ImportError::TypeCoercion {
                    row: row_number,
                    field: spec.name.to_string(),
                    message: format!("cannot parse '{value}' as an integer"),
                }
            }),
            FieldKind::Decimal => {
                // Spanish sources commonly use the comma decimal separator.
                let normalized = if value.contains(',') && !value.contains('.') {
                    value.replace(',', ".")
                } else {
                    value.to_string()
                };
                normalized
                    .parse::<f64>()
                    .map(FieldValue::Decimal)
                    .map_err(|_| ImportError::TypeCoercion {
                        row: row_number,
                        field: spec.name.to_string(),
                        message: format!("cannot parse '{value}' as a number"),
                    })
            }
            FieldKind::Date => NaiveDate::parse_from_str(value, "%d/%m/%Y")
                .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
                .map(FieldValue::Date)
                .map_err(|_| ImportError::TypeCoercion {
                    row: row_number,
                    field: spec.name.to_string(),
                    message: format!("cannot parse '{value}' as a date (DD/MM/YYYY)"),
                }),
            FieldKind::Enum(variants) => {
                let normalized = crate::importer::schema::normalize_label(value);
                for (spellings, canonical) in variants {
                    if spellings
                        .iter()
                        .any(|s| crate::importer::schema::normalize_label(s) == normalized)
                    {
                        return Ok(FieldValue::Text((*canonical).to_string()));
                    }
                }
                Err(ImportError::TypeCoercion {
                    row: row_number,
                    field: spec.name.to_string(),
                    message: format!("'{value}' is not an accepted value"),
                })
            }
        }
    }
}

impl Default for DictionaryMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaMapper for DictionaryMapper {
    fn map_row(
        &self,
        module: ImportModule,
        raw: &RawRow,
        row_number: usize,
    ) -> ImportPipelineResult<MappedRecord> {
        let schema = schema_for(module).ok_or_else(|| {
            ImportError::Internal(format!("no schema registered for module {module}"))
        })?;

        let mut mapped = MappedRecord::new();
        for spec in schema.fields {
            let raw_value = Self::raw_value(schema, spec, raw).or(spec.default);
            let value = match raw_value {
                Some(v) => Self::coerce(spec, v, row_number)?,
                None => FieldValue::Null,
            };
            mapped.insert(spec.name.to_string(), value);
        }
        // Unrecognized raw columns stay on the record's raw form; they are
        // ignored here, not an error.
        Ok(mapped)
    }
}
