/// Validator diagnostics and the report handed to the generation loop.
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong, independent of wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed or dotted header, choice without target, malformed divert.
    SyntaxShape,
    /// `END` or `DONE` used as a knot or stitch name.
    ReservedName,
    /// Undeclared variable or external.
    UndeclaredSymbol,
    ArityMismatch,
    UnresolvedTarget,
    /// Construct that is only legal inside a knot.
    StructuralMisplacement,
    DuplicateDeclaration,
    /// Required entry knot is missing.
    MissingEntry,
    /// Expression the runtime evaluator will refuse.
    RejectedExpression,
    /// Several diverts in one block.
    ShadowedDivert,
    Glue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single finding. `line` is 1-based; 0 marks a document-level finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.line, self.message)
    }
}

/// Result of validating one script.
///
/// The string lists and symbol listings form the JSON surface; the
/// structured `diagnostics` stay in-process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
    pub knots: Vec<String>,
    pub stitches: Vec<String>,
    pub vars: Vec<String>,
    pub externals: Vec<String>,
    pub lists: Vec<String>,
}

impl ValidationReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let rendered = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => self.errors.push(rendered),
            Severity::Warning => self.warnings.push(rendered),
            Severity::Info => self.infos.push(rendered),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic {
            line,
            kind,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic {
            line,
            kind,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn info(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic {
            line,
            kind,
            severity: Severity::Info,
            message: message.into(),
        });
    }

    /// True when the script can be handed to the compiler.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error diagnostics of one kind.
    pub fn errors_of(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error && d.kind == kind)
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_line_prefix() {
        let mut report = ValidationReport::default();
        report.error(4, DiagnosticKind::UndeclaredSymbol, "assignment to undeclared variable 'coins'");
        report.info(9, DiagnosticKind::Glue, "glue '<>' used");
        assert_eq!(report.errors, vec!["[4] assignment to undeclared variable 'coins'"]);
        assert_eq!(report.infos, vec!["[9] glue '<>' used"]);
        assert!(!report.is_ok());
        assert_eq!(report.errors_of(DiagnosticKind::UndeclaredSymbol).len(), 1);
        assert!(report.errors_of(DiagnosticKind::Glue).is_empty());
    }

    #[test]
    fn json_surface_hides_structured_diagnostics() {
        let mut report = ValidationReport::default();
        report.warning(2, DiagnosticKind::ShadowedDivert, "several diverts");
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json.get("diagnostics").is_none());
        assert_eq!(json["warnings"][0], "[2] several diverts");
        for key in ["errors", "infos", "knots", "stitches", "vars", "externals", "lists"] {
            assert!(json[key].is_array(), "missing {}", key);
        }
    }
}
