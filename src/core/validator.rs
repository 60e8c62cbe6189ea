/// Script validator — a read-only pass that re-derives the symbol table and
/// reports every problem it finds.
///
/// The validator never stops at the first error, so a generator can fix a
/// whole script in one round. It builds its own [`SymbolTable`] instead of
/// reusing the compiler's, and resolves links with the same rules the
/// compiler uses.

use crate::core::expr::{identifiers_in, Evaluator};
use crate::core::line::{classify, Line};
use crate::core::normalize::{normalize, LogicalLine};
use crate::core::resolve::{is_reserved_name, is_sentinel, normalize_target, resolve_target};
use crate::core::template::TextTemplate;
use crate::schema::report::{DiagnosticKind, ValidationReport};
use crate::schema::symbols::{count_args, SymbolTable};
use crate::schema::value::Value;

/// Knot every script must declare.
pub const ENTRY_KNOT: &str = "start";

/// A choice or divert target awaiting the final existence check.
#[derive(Debug, Clone)]
struct Link {
    source_knot: String,
    target: String,
    line: usize,
}

/// Validator state for one pass.
#[derive(Debug, Default)]
pub struct Validator {
    symbols: SymbolTable,
    report: ValidationReport,
    links: Vec<Link>,
    current_knot: Option<String>,
    /// Line of the first divert in the open block, if any.
    block_divert: Option<usize>,
    evaluator: Evaluator,
}

/// Validate script text.
pub fn validate(source: &str) -> ValidationReport {
    Validator::default().validate(source)
}

impl Validator {
    pub fn validate(mut self, source: &str) -> ValidationReport {
        for logical in normalize(source) {
            self.check_line(&logical);
        }

        if !self.symbols.has_knot(ENTRY_KNOT) {
            self.report.error(
                0,
                DiagnosticKind::MissingEntry,
                format!("missing required knot '{}'", ENTRY_KNOT),
            );
        }
        self.check_links();

        let SymbolTable {
            knots,
            stitches,
            vars,
            externals: _,
            lists,
        } = &self.symbols;
        self.report.knots = knots.iter().cloned().collect();
        self.report.stitches = stitches.iter().cloned().collect();
        self.report.vars = vars.keys().cloned().collect();
        self.report.lists = lists.keys().cloned().collect();
        self.report.externals = self.symbols.external_signatures();

        tracing::debug!(
            errors = self.report.errors.len(),
            warnings = self.report.warnings.len(),
            "validated script"
        );
        self.report
    }

    fn check_line(&mut self, logical: &LogicalLine) {
        let ln = logical.line;
        let line = classify(&logical.text);

        if logical.glued {
            self.report.info(ln, DiagnosticKind::Glue, "glue '<>' used");
        }

        match line {
            Line::Blank => {}
            Line::KnotHeader(name) => self.knot_header(ln, name),
            Line::MalformedKnotHeader(bad) => {
                if bad.contains('.') {
                    self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        format!(
                            "dot in knot name '{}'; declare '=== knot ===' with '== stitch ==' inside and divert with '-> knot.stitch'",
                            bad
                        ),
                    );
                } else {
                    self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        format!("invalid knot name '{}'; allowed: [A-Za-z_][A-Za-z0-9_]*", bad),
                    );
                }
            }
            Line::StitchHeader(name) => self.stitch_header(ln, name),
            Line::MalformedStitchHeader(bad) => {
                if self.current_knot.is_none() {
                    self.report.error(
                        ln,
                        DiagnosticKind::StructuralMisplacement,
                        format!("stitch '{}' declared outside any knot", bad),
                    );
                } else {
                    self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        format!("invalid stitch name '{}'; allowed: [A-Za-z_][A-Za-z0-9_]*", bad),
                    );
                }
            }
            Line::VarDecl { name, value } => {
                if !self.symbols.declare_var(name, Value::parse_literal(value)) {
                    self.report.error(
                        ln,
                        DiagnosticKind::DuplicateDeclaration,
                        format!("variable '{}' declared again", name),
                    );
                }
            }
            Line::ListDecl { name, items } => {
                if items.is_empty() {
                    self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        format!("LIST '{}' has no items", name),
                    );
                }
                let items = items.into_iter().map(str::to_string).collect();
                if self.symbols.lists.insert(name.to_string(), items).is_some() {
                    self.report.error(
                        ln,
                        DiagnosticKind::DuplicateDeclaration,
                        format!("LIST '{}' declared again", name),
                    );
                }
            }
            Line::ExternalDecl { name, params } => {
                let arity = count_args(params);
                if let Some(previous) = self.symbols.externals.insert(name.to_string(), arity) {
                    if previous != arity {
                        self.report.error(
                            ln,
                            DiagnosticKind::ArityMismatch,
                            format!(
                                "EXTERNAL '{}' redeclared with {} parameters (was {})",
                                name, arity, previous
                            ),
                        );
                    }
                }
            }
            Line::Choice { .. } | Line::Divert(_) | Line::Assignment { .. } | Line::Call { .. }
                if self.current_knot.is_none() =>
            {
                self.report.error(
                    ln,
                    DiagnosticKind::StructuralMisplacement,
                    "choices, diverts and actions are only allowed inside a knot",
                );
            }
            Line::Choice { label, target, .. } => {
                self.check_inline(ln, label);
                match target {
                    Some(target) => self.link(ln, target),
                    None => self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        "choice without '-> target'",
                    ),
                }
            }
            Line::Divert(target) => {
                match self.block_divert {
                    Some(first) => self.report.warning(
                        ln,
                        DiagnosticKind::ShadowedDivert,
                        format!("block already diverts at line {}; only the last divert is kept", first),
                    ),
                    None => self.block_divert = Some(ln),
                }
                if !is_sentinel(target) {
                    self.link(ln, target);
                }
            }
            Line::Assignment { var, expr } => {
                if !self.symbols.has_var(var) {
                    self.report.error(
                        ln,
                        DiagnosticKind::UndeclaredSymbol,
                        format!("assignment to undeclared variable '{}' (declare it with VAR)", var),
                    );
                }
                self.check_expression(ln, expr);
            }
            Line::Call { name, args } => {
                let argc = count_args(args);
                match self.symbols.arity(name) {
                    None => self.report.error(
                        ln,
                        DiagnosticKind::UndeclaredSymbol,
                        format!("call to '{}' without an EXTERNAL declaration", name),
                    ),
                    Some(declared) if declared != argc => self.report.error(
                        ln,
                        DiagnosticKind::ArityMismatch,
                        format!("'{}' called with {} arguments, expected {}", name, argc, declared),
                    ),
                    Some(_) => {}
                }
            }
            Line::Text(text) => {
                if self.current_knot.is_none() {
                    return;
                }
                if text.starts_with("->") {
                    self.report.error(
                        ln,
                        DiagnosticKind::SyntaxShape,
                        format!("malformed divert target '{}'", text[2..].trim()),
                    );
                    return;
                }
                self.check_inline(ln, text);
            }
        }
    }

    fn knot_header(&mut self, ln: usize, name: &str) {
        if is_reserved_name(name) {
            self.report.error(
                ln,
                DiagnosticKind::ReservedName,
                format!("knot name '{}' is reserved; use '-> {}' instead", name, name.to_ascii_uppercase()),
            );
        }
        if !self.symbols.knots.insert(name.to_string()) {
            self.report.error(
                ln,
                DiagnosticKind::DuplicateDeclaration,
                format!("knot '{}' declared again", name),
            );
        }
        self.current_knot = Some(name.to_string());
        self.block_divert = None;
    }

    fn stitch_header(&mut self, ln: usize, name: &str) {
        self.block_divert = None;
        let Some(knot) = self.current_knot.as_deref() else {
            self.report.error(
                ln,
                DiagnosticKind::StructuralMisplacement,
                format!("stitch '{}' declared outside any knot", name),
            );
            return;
        };
        let id = format!("{}.{}", knot, name);
        if is_reserved_name(name) {
            self.report.error(
                ln,
                DiagnosticKind::ReservedName,
                format!("stitch name '{}' is reserved", name),
            );
        }
        if !self.symbols.stitches.insert(id.clone()) {
            self.report.error(
                ln,
                DiagnosticKind::DuplicateDeclaration,
                format!("stitch '{}' declared again", id),
            );
        }
    }

    fn link(&mut self, line: usize, target: &str) {
        if let Some(knot) = &self.current_knot {
            self.links.push(Link {
                source_knot: knot.clone(),
                target: target.to_string(),
                line,
            });
        }
    }

    /// Warn about expressions the runtime evaluator would refuse.
    fn check_expression(&mut self, ln: usize, expr: &str) {
        if let Err(e) = self.evaluator.parse(expr) {
            self.report.warning(
                ln,
                DiagnosticKind::RejectedExpression,
                format!("expression '{}' will be rejected at runtime: {}", expr, e),
            );
        }
    }

    fn check_inline(&mut self, ln: usize, text: &str) {
        let template = TextTemplate::parse(text);

        for name in template.substitutions() {
            if !self.symbols.has_var(name) {
                self.report.error(
                    ln,
                    DiagnosticKind::UndeclaredSymbol,
                    format!("substitution '{{{}}}' has no VAR declaration", name),
                );
            }
        }

        let conditions: Vec<String> = template.conditions().map(str::to_string).collect();
        for cond in conditions {
            for ident in identifiers_in(&cond) {
                if !self.symbols.has_var(&ident) {
                    self.report.error(
                        ln,
                        DiagnosticKind::UndeclaredSymbol,
                        format!("condition uses undeclared variable '{}'", ident),
                    );
                }
            }
            self.check_expression(ln, &cond);
        }
    }

    /// Resolve every recorded link against the final symbol table.
    fn check_links(&mut self) {
        for link in std::mem::take(&mut self.links) {
            let normalized = normalize_target(&link.target, Some(link.source_knot.as_str()), &self.symbols);
            let resolution = resolve_target(&normalized, &link.source_knot, &self.symbols);
            if !resolution.is_resolved() {
                self.report.error(
                    link.line,
                    DiagnosticKind::UnresolvedTarget,
                    format!(
                        "divert from '{}' to missing target '{}'",
                        link.source_knot, link.target
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(report: &ValidationReport) -> Vec<DiagnosticKind> {
        report
            .diagnostics
            .iter()
            .filter(|d| d.severity == crate::schema::report::Severity::Error)
            .map(|d| d.kind)
            .collect()
    }

    #[test]
    fn minimal_script_is_clean() {
        let report = validate("=== start ===\nHello.\n-> END");
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.knots, vec!["start"]);
    }

    #[test]
    fn missing_start_is_document_level() {
        let report = validate("=== intro ===\n-> END");
        assert_eq!(report.errors, vec!["[0] missing required knot 'start'"]);
    }

    #[test]
    fn dotted_and_invalid_headers() {
        let report = validate("=== start ===\n=== seat.one ===\n=== 9lives ===\n== bad name ==");
        assert_eq!(
            kinds(&report),
            vec![
                DiagnosticKind::SyntaxShape,
                DiagnosticKind::SyntaxShape,
                DiagnosticKind::SyntaxShape
            ]
        );
        assert!(report.errors[0].starts_with("[2] dot in knot name 'seat.one'"));
        assert!(report.errors[1].starts_with("[3] invalid knot name"));
        assert!(report.errors[2].starts_with("[4] invalid stitch name"));
    }

    #[test]
    fn reserved_names() {
        let report = validate("=== start ===\n== DONE ==\n=== end ===");
        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::ReservedName, DiagnosticKind::ReservedName]
        );
    }

    #[test]
    fn duplicates() {
        let report = validate(
            "VAR x = 1\nVAR x = 2\n=== start ===\n== a ==\n== a ==\n=== start ===",
        );
        assert_eq!(
            kinds(&report),
            vec![
                DiagnosticKind::DuplicateDeclaration,
                DiagnosticKind::DuplicateDeclaration,
                DiagnosticKind::DuplicateDeclaration
            ]
        );
    }

    #[test]
    fn misplaced_constructs() {
        let report = validate("== early ==\n-> start\n+ go -> start\n~ x = 1\nIntro text is fine.\n=== start ===\n-> END");
        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::StructuralMisplacement; 4]
        );
    }

    #[test]
    fn externals_and_arity() {
        let report = validate(
            "EXTERNAL play(sound, volume)\n=== start ===\n~ play(\"bell\")\n~ play(\"bell\", 2)\n~ beep()\n-> END",
        );
        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::ArityMismatch, DiagnosticKind::UndeclaredSymbol]
        );
        assert!(report.errors[0].starts_with("[3]"));
        assert_eq!(report.externals, vec!["play/2"]);
    }

    #[test]
    fn inline_references() {
        let report = validate(
            "VAR coins = 0\n=== start ===\nYou have {coins} and {gems}. {coins > 0 && rich ? Yes | No} {true ? a | b}\n-> END",
        );
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("'{gems}'"));
        assert!(report.errors[1].contains("'rich'"));
    }

    #[test]
    fn choice_labels_are_checked() {
        let report = validate(
            "VAR coins = 1\n=== start ===\nHi.\n+ Pay {gold} coins -> END\n+ {coins > 0 and rich ? Tip | Nod} -> END\n+ Keep {coins} -> END",
        );
        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::UndeclaredSymbol, DiagnosticKind::UndeclaredSymbol]
        );
        assert!(report.errors[0].starts_with("[4] substitution '{gold}'"));
        assert!(report.errors[1].starts_with("[5] condition uses undeclared variable 'rich'"));
    }

    #[test]
    fn quoted_commas_are_one_argument() {
        let report = validate(
            "EXTERNAL say(line)\n=== start ===\n~ say(\"Hello, world\")\n~ say('a, b', \"c\")\n-> END",
        );
        assert_eq!(kinds(&report), vec![DiagnosticKind::ArityMismatch]);
        assert!(report.errors[0].starts_with("[4] 'say' called with 2 arguments, expected 1"));
    }

    #[test]
    fn glue_is_informational() {
        let report = validate("=== start ===\nHello <>\nthere.\n-> END");
        assert!(report.is_ok());
        assert_eq!(report.infos, vec!["[2] glue '<>' used"]);
    }

    #[test]
    fn choice_without_target_and_malformed_divert() {
        let report = validate("=== start ===\n+ Wander\n-> a.b.c");
        assert_eq!(
            kinds(&report),
            vec![DiagnosticKind::SyntaxShape, DiagnosticKind::SyntaxShape]
        );
    }

    #[test]
    fn forward_and_relative_links_resolve() {
        let report = validate(
            "=== start ===\n+ Shop -> shop\n+ Side -> side\n-> shop.counter\n== side ==\n-> END\n=== shop ===\n== counter ==\n-> start",
        );
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.stitches, vec!["shop.counter", "start.side"]);
    }

    #[test]
    fn several_diverts_warn() {
        let report = validate("=== start ===\n-> END\n-> DONE");
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("[3]"));
    }

    #[test]
    fn rejected_expression_warns() {
        let report = validate("VAR x = 0\n=== start ===\n~ x = x % 2\n-> END");
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("rejected at runtime"));
    }

    #[test]
    fn listings_are_sorted() {
        let report = validate(
            "VAR b = 1\nVAR a = 2\nLIST z = one\nLIST y = two\n=== start ===\n-> END\n=== alpha ===\n-> END",
        );
        assert_eq!(report.vars, vec!["a", "b"]);
        assert_eq!(report.lists, vec!["y", "z"]);
        assert_eq!(report.knots, vec!["alpha", "start"]);
    }
}
