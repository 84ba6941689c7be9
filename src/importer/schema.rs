// ==========================================
// School Import - per-module canonical schemas
// ==========================================
// The field dictionaries (aliases, coercions, required fields, rules,
// natural keys) are plain data. Adding an importable module means adding
// a ModuleSchema entry here, not new code paths.
// ==========================================

use crate::domain::import::MappedRecord;
use crate::domain::types::ImportModule;

// ==========================================
// FieldKind - coercion target for a canonical field
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    /// Fixed-locale date: "%d/%m/%Y" first, ISO "%Y-%m-%d" accepted.
    Date,
    /// Enumerated values: (accepted raw spellings, canonical value).
    Enum(&'static [(&'static [&'static str], &'static str)]),
}

// ==========================================
// FieldSpec - one canonical field
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Accepted raw header labels, matched case- and diacritic-insensitively.
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
    pub required: bool,
    /// Raw default applied when the column is missing or empty.
    pub default: Option<&'static str>,
}

// ==========================================
// FieldRule - hard per-field rule (violation ⇒ INVALID)
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    DateNotFuture { field: &'static str },
    DecimalRange { field: &'static str, min: f64, max: f64 },
    IntegerRange { field: &'static str, min: i64, max: i64 },
    EmailFormat { field: &'static str },
}

// ==========================================
// WarningRule - soft rule (attached as warning, state unchanged)
// ==========================================
#[derive(Debug, Clone, Copy)]
pub enum WarningRule {
    /// Value present but statistically implausible.
    ImplausibleDecimal {
        field: &'static str,
        lo: f64,
        hi: f64,
        message: &'static str,
    },
    /// Field present while another field holds a value that makes it odd.
    UnexpectedCombination {
        field: &'static str,
        when_field: &'static str,
        equals: &'static str,
        message: &'static str,
    },
}

// ==========================================
// ModuleSchema
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ModuleSchema {
    pub module: ImportModule,
    pub fields: &'static [FieldSpec],
    /// Canonical fields whose values form the uniqueness key against
    /// persisted data.
    pub natural_key: &'static [&'static str],
    pub rules: &'static [FieldRule],
    pub warnings: &'static [WarningRule],
}

const NATIONAL_ID_ALIASES: &[&str] = &[
    "national id",
    "document",
    "dni",
    "cedula",
    "cédula",
    "documento",
    "identificacion",
    "identificación",
    "nro documento",
];

const PERIOD_ALIASES: &[&str] = &[
    "academic period",
    "period",
    "academic year",
    "periodo",
    "período",
    "ano academico",
    "año académico",
    "ciclo",
];

static ENROLLMENT_SCHEMA: ModuleSchema = ModuleSchema {
    module: ImportModule::Enrollment,
    fields: &[
        FieldSpec {
            name: "national_id",
            aliases: NATIONAL_ID_ALIASES,
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "student_name",
            aliases: &[
                "student name",
                "name",
                "student",
                "nombre",
                "alumno",
                "nombre del alumno",
                "nombre completo",
            ],
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "academic_period",
            aliases: PERIOD_ALIASES,
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "grade_level",
            aliases: &["grade level", "grade", "grado", "curso", "nivel"],
            kind: FieldKind::Integer,
            required: false,
            default: None,
        },
        FieldSpec {
            name: "enrollment_date",
            aliases: &[
                "enrollment date",
                "fecha de matricula",
                "fecha de matrícula",
                "fecha de inscripcion",
                "fecha de inscripción",
                "fecha",
            ],
            kind: FieldKind::Date,
            required: false,
            default: None,
        },
        FieldSpec {
            name: "guardian_name",
            aliases: &["guardian", "apoderado", "tutor", "representante"],
            kind: FieldKind::Text,
            required: false,
            default: None,
        },
        FieldSpec {
            name: "email",
            aliases: &[
                "email",
                "e-mail",
                "correo",
                "correo electronico",
                "correo electrónico",
            ],
            kind: FieldKind::Text,
            required: false,
            default: None,
        },
    ],
    natural_key: &["national_id", "academic_period"],
    rules: &[
        FieldRule::DateNotFuture {
            field: "enrollment_date",
        },
        FieldRule::IntegerRange {
            field: "grade_level",
            min: 1,
            max: 12,
        },
        FieldRule::EmailFormat { field: "email" },
    ],
    warnings: &[],
};

static GRADES_SCHEMA: ModuleSchema = ModuleSchema {
    module: ImportModule::Grades,
    fields: &[
        FieldSpec {
            name: "national_id",
            aliases: NATIONAL_ID_ALIASES,
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "subject",
            aliases: &["subject", "materia", "asignatura"],
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "academic_period",
            aliases: PERIOD_ALIASES,
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "score",
            aliases: &[
                "score",
                "grade",
                "nota",
                "calificacion",
                "calificación",
                "puntaje",
            ],
            kind: FieldKind::Decimal,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "evaluation_date",
            aliases: &[
                "evaluation date",
                "fecha de evaluacion",
                "fecha de evaluación",
                "fecha",
            ],
            kind: FieldKind::Date,
            required: false,
            default: None,
        },
    ],
    natural_key: &["national_id", "subject", "academic_period"],
    rules: &[
        FieldRule::DecimalRange {
            field: "score",
            min: 0.0,
            max: 100.0,
        },
        FieldRule::DateNotFuture {
            field: "evaluation_date",
        },
    ],
    warnings: &[WarningRule::ImplausibleDecimal {
        field: "score",
        lo: 1.0,
        hi: 100.0,
        message: "score of zero; confirm absence was not meant",
    }],
};

static ATTENDANCE_SCHEMA: ModuleSchema = ModuleSchema {
    module: ImportModule::Attendance,
    fields: &[
        FieldSpec {
            name: "national_id",
            aliases: NATIONAL_ID_ALIASES,
            kind: FieldKind::Text,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "date",
            aliases: &[
                "attendance date",
                "date",
                "fecha de asistencia",
                "fecha",
                "dia",
                "día",
            ],
            kind: FieldKind::Date,
            required: true,
            default: None,
        },
        FieldSpec {
            name: "status",
            aliases: &["status", "estado", "asistencia"],
            kind: FieldKind::Enum(&[
                (&["present", "presente", "p", "asistio", "asistió"], "present"),
                (&["absent", "ausente", "a", "falta"], "absent"),
                (&["late", "tarde", "t", "tardanza", "retraso"], "late"),
                (&["excused", "justificado", "j"], "excused"),
            ]),
            required: false,
            // Attendance registers commonly mark exceptions only.
            default: Some("present"),
        },
        FieldSpec {
            name: "justification",
            aliases: &[
                "justification",
                "justificacion",
                "justificación",
                "motivo",
                "observacion",
                "observación",
            ],
            kind: FieldKind::Text,
            required: false,
            default: None,
        },
    ],
    natural_key: &["national_id", "date"],
    rules: &[FieldRule::DateNotFuture { field: "date" }],
    warnings: &[WarningRule::UnexpectedCombination {
        field: "justification",
        when_field: "status",
        equals: "present",
        message: "justification given for a 'present' status",
    }],
};

/// Schema lookup. `Unknown` has no schema by construction.
pub fn schema_for(module: ImportModule) -> Option<&'static ModuleSchema> {
    match module {
        ImportModule::Enrollment => Some(&ENROLLMENT_SCHEMA),
        ImportModule::Grades => Some(&GRADES_SCHEMA),
        ImportModule::Attendance => Some(&ATTENDANCE_SCHEMA),
        ImportModule::Unknown => None,
    }
}

// ==========================================
// Label normalization
// ==========================================
// Headers and aliases are compared case- and diacritic-insensitively;
// separator characters collapse to single spaces.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for ch in raw.trim().to_lowercase().chars() {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            '_' | '-' | '.' | '/' => ' ',
            other => other,
        };
        if folded == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(folded);
            last_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

impl ModuleSchema {
    /// Find the canonical field a raw header label maps to.
    pub fn field_for_label(&self, raw_label: &str) -> Option<&'static FieldSpec> {
        let normalized = normalize_label(raw_label);
        self.fields.iter().find(|spec| {
            spec.aliases
                .iter()
                .any(|alias| normalize_label(alias) == normalized)
                || normalize_label(spec.name) == normalized
        })
    }

    /// Build the natural key for a mapped record, `None` when any key
    /// component is absent (missing data is never invented).
    pub fn natural_key_of(&self, mapped: &MappedRecord) -> Option<String> {
        let mut parts = Vec::with_capacity(self.natural_key.len());
        for field in self.natural_key {
            match mapped.get(*field) {
                Some(value) if !value.is_null() => {
                    let text = value.key_text();
                    if text.is_empty() {
                        return None;
                    }
                    parts.push(text);
                }
                _ => return None,
            }
        }
        Some(parts.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::FieldValue;
    use chrono::NaiveDate;

    #[test]
    fn test_normalize_label_folds_diacritics_and_case() {
        assert_eq!(normalize_label("Año_Académico"), "ano academico");
        assert_eq!(normalize_label("  CÉDULA "), "cedula");
        assert_eq!(normalize_label("Fecha-de--Matrícula"), "fecha de matricula");
    }

    #[test]
    fn test_field_for_label_alias_resolution() {
        let schema = schema_for(ImportModule::Enrollment).unwrap();
        assert_eq!(
            schema.field_for_label("Cédula").map(|f| f.name),
            Some("national_id")
        );
        assert_eq!(
            schema.field_for_label("NOMBRE DEL ALUMNO").map(|f| f.name),
            Some("student_name")
        );
        assert!(schema.field_for_label("columna inventada").is_none());
    }

    #[test]
    fn test_natural_key_requires_all_components() {
        let schema = schema_for(ImportModule::Enrollment).unwrap();
        let mut mapped = MappedRecord::new();
        mapped.insert("national_id".into(), FieldValue::Text("123".into()));
        assert_eq!(schema.natural_key_of(&mapped), None);

        mapped.insert("academic_period".into(), FieldValue::Text("2026-1".into()));
        assert_eq!(schema.natural_key_of(&mapped), Some("123|2026-1".into()));
    }

    #[test]
    fn test_natural_key_uses_stable_date_form() {
        let schema = schema_for(ImportModule::Attendance).unwrap();
        let mut mapped = MappedRecord::new();
        mapped.insert("national_id".into(), FieldValue::Text("9".into()));
        mapped.insert(
            "date".into(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()),
        );
        assert_eq!(schema.natural_key_of(&mapped), Some("9|2026-02-03".into()));
    }
}
