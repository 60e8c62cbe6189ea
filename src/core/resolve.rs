/// Navigation targets — sentinels, normalisation and late resolution.
///
/// Resolution is deferred until every knot and stitch of a document is
/// known, because a target may name a knot declared further down. The
/// compiler and the validator both resolve through [`resolve_target`], each
/// against its own [`TargetIndex`].

use rustc_hash::FxHashSet;

use crate::schema::ir::knot_of;
use crate::schema::symbols::SymbolTable;

/// Terminal sentinel: end of the story.
pub const END: &str = "END";
/// Terminal sentinel: end of the current flow; ends the session here.
pub const DONE: &str = "DONE";

pub fn is_sentinel(target: &str) -> bool {
    target == END || target == DONE
}

/// Sentinel names may not be used as knot or stitch names in any letter case.
pub fn is_reserved_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(END) || name.eq_ignore_ascii_case(DONE)
}

/// Lookup surface a target is resolved against.
pub trait TargetIndex {
    /// A knot or `knot.stitch` id exists.
    fn has_step(&self, id: &str) -> bool;
    /// A top-level knot with this name exists.
    fn has_knot(&self, name: &str) -> bool;
}

impl TargetIndex for SymbolTable {
    fn has_step(&self, id: &str) -> bool {
        self.has_knot(id) || self.has_stitch(id)
    }

    fn has_knot(&self, name: &str) -> bool {
        SymbolTable::has_knot(self, name)
    }
}

/// Set of compiled step ids.
#[derive(Debug, Default)]
pub struct StepIds(FxHashSet<String>);

impl StepIds {
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self(ids.into_iter().map(str::to_string).collect())
    }
}

impl TargetIndex for StepIds {
    fn has_step(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    fn has_knot(&self, name: &str) -> bool {
        !name.contains('.') && self.0.contains(name)
    }
}

/// Outcome of resolving one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Sentinel(String),
    Step(String),
    /// Nothing matched; the target is kept exactly as written.
    Unresolved(String),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved(_))
    }

    pub fn into_target(self) -> String {
        match self {
            Resolution::Sentinel(t) | Resolution::Step(t) | Resolution::Unresolved(t) => t,
        }
    }
}

/// Tentatively qualify a raw target against the knot it appears in.
///
/// Sentinels and dotted targets pass through. A bare name that is already a
/// known knot stays a knot reference; otherwise it is read as a stitch of the
/// current knot.
pub fn normalize_target(
    raw: &str,
    current_knot: Option<&str>,
    index: &impl TargetIndex,
) -> String {
    if is_sentinel(raw) || raw.contains('.') || index.has_knot(raw) {
        return raw.to_string();
    }
    match current_knot {
        Some(knot) => format!("{}.{}", knot, raw),
        None => raw.to_string(),
    }
}

/// Resolve a target referenced from `source_step` once all steps are known.
///
/// Rules, first match wins:
/// 1. exact id;
/// 2. `x.knot` where `knot` is a top-level knot becomes `knot`;
/// 3. a bare name that is a knot;
/// 4. `source_knot.target`;
/// 5. otherwise unresolved, verbatim.
pub fn resolve_target(target: &str, source_step: &str, index: &impl TargetIndex) -> Resolution {
    if is_sentinel(target) {
        return Resolution::Sentinel(target.to_string());
    }
    if index.has_step(target) {
        return Resolution::Step(target.to_string());
    }
    if let Some((_, right)) = target.split_once('.') {
        if index.has_knot(right) {
            return Resolution::Step(right.to_string());
        }
    } else if index.has_knot(target) {
        return Resolution::Step(target.to_string());
    }
    let relative = format!("{}.{}", knot_of(source_step), target);
    if index.has_step(&relative) {
        return Resolution::Step(relative);
    }
    Resolution::Unresolved(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> StepIds {
        StepIds::new(["start", "start.intro", "shop", "shop.counter", "intro"])
    }

    #[test]
    fn sentinels_and_reserved_names() {
        assert!(is_sentinel("END"));
        assert!(is_sentinel("DONE"));
        assert!(!is_sentinel("end"));
        assert!(is_reserved_name("end"));
        assert!(is_reserved_name("Done"));
        assert!(!is_reserved_name("ending"));
    }

    #[test]
    fn normalisation_prefers_known_knot() {
        let ids = ids();
        assert_eq!(normalize_target("shop", Some("start"), &ids), "shop");
        assert_eq!(normalize_target("counter", Some("shop"), &ids), "shop.counter");
        assert_eq!(normalize_target("later", Some("start"), &ids), "start.later");
        assert_eq!(normalize_target("x.y", Some("start"), &ids), "x.y");
        assert_eq!(normalize_target("END", Some("start"), &ids), "END");
        assert_eq!(normalize_target("orphan", None, &ids), "orphan");
    }

    #[test]
    fn exact_match_wins() {
        let r = resolve_target("start.intro", "shop", &ids());
        assert_eq!(r, Resolution::Step("start.intro".to_string()));
    }

    #[test]
    fn dotted_knot_reference_is_rewritten() {
        // `-> shop` written inside `start` before `shop` was declared.
        let r = resolve_target("start.shop", "start", &ids());
        assert_eq!(r, Resolution::Step("shop".to_string()));
    }

    #[test]
    fn knot_beats_same_named_stitch() {
        let r = resolve_target("intro", "start", &ids());
        assert_eq!(r, Resolution::Step("intro".to_string()));
    }

    #[test]
    fn relative_stitch() {
        let r = resolve_target("counter", "shop.counter", &ids());
        assert_eq!(r, Resolution::Step("shop.counter".to_string()));
    }

    #[test]
    fn unresolved_is_verbatim() {
        let r = resolve_target("nowhere", "start", &ids());
        assert!(!r.is_resolved());
        assert_eq!(r.into_target(), "nowhere");
    }

    #[test]
    fn symbol_table_index() {
        let mut table = SymbolTable::new();
        table.knots.insert("start".to_string());
        table.stitches.insert("start.intro".to_string());
        assert!(TargetIndex::has_step(&table, "start.intro"));
        assert!(TargetIndex::has_knot(&table, "start"));
        assert!(!TargetIndex::has_knot(&table, "start.intro"));
        assert_eq!(
            resolve_target("intro", "start", &table),
            Resolution::Step("start.intro".to_string())
        );
    }
}
