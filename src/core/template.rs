/// Inline text templates — `{var}` substitutions and `{cond ? A | B}`
/// conditionals inside rendered text.

use crate::core::line::is_name;

/// A segment of a parsed text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// Variable substitution: `{name}`.
    Var(String),
    /// Inline conditional: `{cond ? then | otherwise}`.
    Conditional {
        cond: String,
        then: String,
        otherwise: String,
    },
}

/// A parsed text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    pub segments: Vec<TextSegment>,
}

impl TextTemplate {
    /// Parse a text block. Never fails: braces that do not form a
    /// substitution or a conditional stay literal text, and nested braces are
    /// not supported.
    pub fn parse(input: &str) -> TextTemplate {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}');
            let nested = after.find('{');
            match close {
                Some(close) if nested.map_or(true, |n| n > close) => {
                    let content = &after[..close];
                    match Self::parse_segment(content) {
                        Some(segment) => {
                            if !literal.is_empty() {
                                segments.push(TextSegment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(segment);
                        }
                        None => {
                            literal.push('{');
                            literal.push_str(content);
                            literal.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                _ => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);

        if !literal.is_empty() {
            segments.push(TextSegment::Literal(literal));
        }
        TextTemplate { segments }
    }

    fn parse_segment(content: &str) -> Option<TextSegment> {
        if is_name(content) {
            return Some(TextSegment::Var(content.to_string()));
        }

        let (cond, branches) = content.split_once('?')?;
        let (then, otherwise) = branches.split_once('|')?;
        let (cond, then, otherwise) = (cond.trim(), then.trim(), otherwise.trim());
        if cond.is_empty() || then.is_empty() || otherwise.is_empty() {
            return None;
        }
        Some(TextSegment::Conditional {
            cond: cond.to_string(),
            then: then.to_string(),
            otherwise: otherwise.to_string(),
        })
    }

    /// Variable names referenced by `{name}` substitutions.
    pub fn substitutions(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TextSegment::Var(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Condition expressions of inline conditionals.
    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TextSegment::Conditional { cond, .. } => Some(cond.as_str()),
            _ => None,
        })
    }

    /// Render with caller-supplied lookups for variables and conditions.
    ///
    /// An unbound variable is left as its literal `{name}` placeholder.
    pub fn render(
        &self,
        mut lookup: impl FnMut(&str) -> Option<String>,
        mut test: impl FnMut(&str) -> bool,
    ) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TextSegment::Literal(text) => out.push_str(text),
                TextSegment::Var(name) => match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
                TextSegment::Conditional {
                    cond,
                    then,
                    otherwise,
                } => out.push_str(if test(cond) { then } else { otherwise }),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only() {
        let t = TextTemplate::parse("Hello, world.");
        assert_eq!(t.segments, vec![TextSegment::Literal("Hello, world.".to_string())]);
    }

    #[test]
    fn var_and_conditional() {
        let t = TextTemplate::parse("You have {coins} coins. {coins > 0 ? Rich | Broke}!");
        assert_eq!(t.segments.len(), 5);
        assert_eq!(t.segments[1], TextSegment::Var("coins".to_string()));
        assert_eq!(
            t.segments[3],
            TextSegment::Conditional {
                cond: "coins > 0".to_string(),
                then: "Rich".to_string(),
                otherwise: "Broke".to_string(),
            }
        );
        assert_eq!(t.substitutions().collect::<Vec<_>>(), vec!["coins"]);
        assert_eq!(t.conditions().collect::<Vec<_>>(), vec!["coins > 0"]);
    }

    #[test]
    fn logical_operators_in_condition() {
        let t = TextTemplate::parse("{a || b ? yes | no}");
        assert!(matches!(
            &t.segments[0],
            TextSegment::Conditional { cond, then, otherwise }
                if cond == "a || b" && then == "yes" && otherwise == "no"
        ));
    }

    #[test]
    fn unrecognised_braces_stay_literal() {
        let t = TextTemplate::parse("A {not a var} and {unclosed");
        let rendered = t.render(|_| None, |_| false);
        assert_eq!(rendered, "A {not a var} and {unclosed");
    }

    #[test]
    fn nested_braces_are_not_supported() {
        let t = TextTemplate::parse("{outer {inner}}");
        let rendered = t.render(|name| Some(format!("<{}>", name)), |_| true);
        assert_eq!(rendered, "{outer <inner>}");
    }

    #[test]
    fn render_unbound_keeps_placeholder() {
        let t = TextTemplate::parse("Hi {name}, {mood}.");
        let rendered = t.render(
            |name| (name == "name").then(|| "Ann".to_string()),
            |_| false,
        );
        assert_eq!(rendered, "Hi Ann, {mood}.");
    }

    #[test]
    fn render_conditional_branch() {
        let t = TextTemplate::parse("{ok ? up | down}");
        assert_eq!(t.render(|_| None, |_| true), "up");
        assert_eq!(t.render(|_| None, |_| false), "down");
    }
}
