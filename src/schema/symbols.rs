use std::collections::{BTreeMap, BTreeSet};

use super::value::{Value, Variables};
use crate::core::expr::skip_string;

/// Names declared by one compile or validate pass.
///
/// Each pass builds and owns its own table; nothing is shared between passes.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub knots: BTreeSet<String>,
    /// Fully qualified `knot.stitch` ids.
    pub stitches: BTreeSet<String>,
    pub vars: Variables,
    /// External function name to declared parameter count.
    pub externals: BTreeMap<String, usize>,
    pub lists: BTreeMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_knot(&self, name: &str) -> bool {
        self.knots.contains(name)
    }

    pub fn has_stitch(&self, id: &str) -> bool {
        self.stitches.contains(id)
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn declare_var(&mut self, name: &str, initial: Value) -> bool {
        self.vars.insert(name.to_string(), initial).is_none()
    }

    pub fn arity(&self, external: &str) -> Option<usize> {
        self.externals.get(external).copied()
    }

    /// Externals rendered as `name/arity`, sorted by name.
    pub fn external_signatures(&self) -> Vec<String> {
        self.externals
            .iter()
            .map(|(name, arity)| format!("{}/{}", name, arity))
            .collect()
    }
}

/// Number of non-blank entries in a parameter or argument list.
///
/// Only top-level commas separate entries: commas inside string literals or
/// nested brackets do not.
pub fn count_args(args: &str) -> usize {
    let mut count = 0;
    let mut depth = 0usize;
    let mut entry = false;
    let mut chars = args.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                entry = true;
                if skip_string(&mut chars, c).is_err() {
                    break;
                }
            }
            '(' | '[' => {
                depth += 1;
                entry = true;
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                entry = true;
            }
            ',' if depth == 0 => {
                if entry {
                    count += 1;
                }
                entry = false;
            }
            c if c.is_whitespace() => {}
            _ => entry = true,
        }
    }
    if entry {
        count += 1;
    }
    count
}
