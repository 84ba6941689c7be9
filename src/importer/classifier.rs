// ==========================================
// School Import - document classifier
// ==========================================
// Deterministic, ordered rule set: filename keywords combined with
// header-shape hints. First matching rule wins; confidence grows with the
// number of independent signals that agreed. No match ⇒ Unknown / 0.0,
// which the orchestrator treats as a hard stop for the file.
// ==========================================

use crate::domain::import::RawRow;
use crate::domain::types::ImportModule;
use crate::importer::pipeline_trait::{Classification, Classifier};
use crate::importer::schema::normalize_label;
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// ClassifierRule
// ==========================================
// Hints are the headers distinctive for the module, not the shared ones
// (every module carries a national id column).
struct ClassifierRule {
    module: ImportModule,
    filename_keywords: &'static [&'static str],
    header_hints: &'static [&'static str],
}

/// A rule matches on a filename keyword alone, or on at least this many
/// distinctive headers.
const MIN_HEADER_HITS: usize = 2;

/// Rules in priority order: most distinctive header shapes first.
static RULES: &[ClassifierRule] = &[
    ClassifierRule {
        module: ImportModule::Grades,
        filename_keywords: &[
            "grades", "grade", "notas", "nota", "calificaciones", "calificacion", "scores",
        ],
        header_hints: &[
            "score",
            "nota",
            "calificacion",
            "calificación",
            "puntaje",
            "subject",
            "materia",
            "asignatura",
        ],
    },
    ClassifierRule {
        module: ImportModule::Attendance,
        filename_keywords: &["attendance", "asistencia", "asistencias", "inasistencias"],
        header_hints: &[
            "status",
            "estado",
            "asistencia",
            "justificacion",
            "justificación",
            "motivo",
            "fecha de asistencia",
        ],
    },
    ClassifierRule {
        module: ImportModule::Enrollment,
        filename_keywords: &[
            "enrollment",
            "enrolment",
            "matricula",
            "matrícula",
            "matriculas",
            "inscripcion",
            "inscripciones",
            "alumnos",
            "students",
        ],
        header_hints: &[
            "student name",
            "nombre",
            "alumno",
            "guardian",
            "apoderado",
            "tutor",
            "grade level",
            "grado",
            "email",
            "correo",
        ],
    },
];

// ==========================================
// RuleClassifier
// ==========================================
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn confidence(filename_hit: bool, header_hits: usize) -> f64 {
        let signals = usize::from(filename_hit) + header_hits;
        (0.4 + 0.15 * signals as f64).min(0.95)
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, file_name: &str, preview: &[RawRow]) -> Classification {
        let normalized_name = normalize_label(file_name);
        let headers: HashSet<String> = preview
            .first()
            .map(|row| row.keys().map(|h| normalize_label(h)).collect())
            .unwrap_or_default();

        for rule in RULES {
            let filename_hit = rule
                .filename_keywords
                .iter()
                .any(|kw| normalized_name.contains(&normalize_label(kw)));

            let header_hits = rule
                .header_hints
                .iter()
                .map(|hint| normalize_label(hint))
                .collect::<HashSet<_>>()
                .iter()
                .filter(|hint| headers.contains(hint.as_str()))
                .count();

            if filename_hit || header_hits >= MIN_HEADER_HITS {
                let confidence = Self::confidence(filename_hit, header_hits);
                debug!(
                    module = %rule.module,
                    filename_hit,
                    header_hits,
                    confidence,
                    "document classified"
                );
                return Classification {
                    module: rule.module,
                    confidence,
                };
            }
        }

        debug!(file_name, "no classification rule matched");
        Classification::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(headers: &[&str]) -> RawRow {
        headers
            .iter()
            .map(|h| (h.to_string(), "x".to_string()))
            .collect()
    }

    #[test]
    fn test_classify_by_filename_keyword() {
        let classifier = RuleClassifier::new();
        let c = classifier.classify("notas_2026.xlsx", &[]);
        assert_eq!(c.module, ImportModule::Grades);
        assert!(c.confidence > 0.0);
    }

    #[test]
    fn test_classify_by_header_shape() {
        let classifier = RuleClassifier::new();
        let preview = vec![row(&["Cédula", "Materia", "Nota", "Período"])];
        let c = classifier.classify("archivo_sin_nombre.csv", &preview);
        assert_eq!(c.module, ImportModule::Grades);
    }

    #[test]
    fn test_confidence_monotonic_in_signals() {
        let classifier = RuleClassifier::new();
        let name_only = classifier.classify("asistencia.csv", &[]);
        let name_and_headers = classifier.classify(
            "asistencia.csv",
            &[row(&["Cédula", "Estado", "Justificación"])],
        );
        assert_eq!(name_only.module, ImportModule::Attendance);
        assert_eq!(name_and_headers.module, ImportModule::Attendance);
        assert!(name_and_headers.confidence > name_only.confidence);
    }

    #[test]
    fn test_single_shared_header_does_not_match() {
        let classifier = RuleClassifier::new();
        // A lone generic column must not classify anything.
        let c = classifier.classify("datos.csv", &[row(&["Cédula"])]);
        assert!(c.is_unknown());
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_unknown_for_unrecognized_document() {
        let classifier = RuleClassifier::new();
        let c = classifier.classify("budget_report.bin", &[]);
        assert!(c.is_unknown());
    }

    #[test]
    fn test_deterministic_first_match_wins() {
        let classifier = RuleClassifier::new();
        // Headers hint at grades, filename at enrollment: the grades rule
        // is evaluated first and matches on headers.
        let preview = vec![row(&["Materia", "Nota"])];
        let a = classifier.classify("matricula.csv", &preview);
        let b = classifier.classify("matricula.csv", &preview);
        assert_eq!(a.module, b.module);
        assert_eq!(a.confidence, b.confidence);
    }
}
