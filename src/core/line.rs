/// Line classification — one ordered set of shape matchers shared by the
/// compiler and the validator.
///
/// Classifiers run in a fixed priority: headers, then declarations, then
/// choice / divert / assignment / call, and finally plain text. The first
/// match wins, so a line that fits several shapes is always read the same
/// way.

use crate::core::resolve::is_sentinel;

/// A classified logical line. Borrowed slices point into the trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// `=== name ===`
    KnotHeader(&'a str),
    /// `== name ==`
    StitchHeader(&'a str),
    /// `=== ... ===` whose name is not a valid identifier.
    MalformedKnotHeader(&'a str),
    /// `== ... ==` whose name is not a valid identifier.
    MalformedStitchHeader(&'a str),
    /// `VAR name = value`
    VarDecl { name: &'a str, value: &'a str },
    /// `LIST name = a, b, c`
    ListDecl { name: &'a str, items: Vec<&'a str> },
    /// `EXTERNAL name(a, b)`
    ExternalDecl { name: &'a str, params: &'a str },
    /// `+ label -> target` (single-use) or `* label -> target` (repeatable).
    Choice {
        repeatable: bool,
        label: &'a str,
        target: Option<&'a str>,
    },
    /// `-> target`
    Divert(&'a str),
    /// `~ var = expr`
    Assignment { var: &'a str, expr: &'a str },
    /// `~ name(args)`
    Call { name: &'a str, args: &'a str },
    Text(&'a str),
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True for a sentinel, `name` or `name.name`.
pub fn is_target(s: &str) -> bool {
    if is_sentinel(s) {
        return true;
    }
    match s.split_once('.') {
        Some((knot, stitch)) => is_name(knot) && is_name(stitch),
        None => is_name(s),
    }
}

/// Classify one logical line.
pub fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }

    const CLASSIFIERS: &[for<'a> fn(&'a str) -> Option<Line<'a>>] = &[
        knot_header,
        stitch_header,
        var_decl,
        list_decl,
        external_decl,
        choice,
        divert,
        assignment,
        call,
    ];

    CLASSIFIERS
        .iter()
        .find_map(|classifier| classifier(line))
        .unwrap_or(Line::Text(line))
}

/// Inner text of `<marker> inner <marker>`, where the marker run is exactly
/// `width` `=` characters on both sides.
fn fenced(line: &str, width: usize) -> Option<&str> {
    let leading = line.bytes().take_while(|b| *b == b'=').count();
    let trailing = line.bytes().rev().take_while(|b| *b == b'=').count();
    if leading != width || trailing != width || line.len() < width * 2 {
        return None;
    }
    let inner = line[width..line.len() - width].trim();
    if inner.is_empty() || inner.starts_with('=') || inner.ends_with('=') {
        return None;
    }
    Some(inner)
}

fn knot_header(line: &str) -> Option<Line<'_>> {
    let name = fenced(line, 3)?;
    Some(if is_name(name) {
        Line::KnotHeader(name)
    } else {
        Line::MalformedKnotHeader(name)
    })
}

fn stitch_header(line: &str) -> Option<Line<'_>> {
    let name = fenced(line, 2)?;
    Some(if is_name(name) {
        Line::StitchHeader(name)
    } else {
        Line::MalformedStitchHeader(name)
    })
}

/// Split `KEYWORD name = rest` into `(name, rest)`.
fn keyword_binding<'a>(line: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, value) = rest.split_once('=')?;
    let name = name.trim();
    let value = value.trim();
    if !is_name(name) || value.is_empty() {
        return None;
    }
    Some((name, value))
}

fn var_decl(line: &str) -> Option<Line<'_>> {
    let (name, value) = keyword_binding(line, "VAR")?;
    Some(Line::VarDecl { name, value })
}

fn list_decl(line: &str) -> Option<Line<'_>> {
    let (name, value) = keyword_binding(line, "LIST")?;
    let items = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    Some(Line::ListDecl { name, items })
}

/// Split `name(args)` into `(name, args)`; the line must end at the closing
/// `)`, and `args` runs from the first `(` to it.
fn invocation(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let open = s.find('(')?;
    let inner = s.strip_suffix(')')?.get(open + 1..)?;
    let name = s[..open].trim();
    if !is_name(name) {
        return None;
    }
    Some((name, inner.trim()))
}

fn external_decl(line: &str) -> Option<Line<'_>> {
    let rest = line.strip_prefix("EXTERNAL")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, params) = invocation(rest)?;
    Some(Line::ExternalDecl { name, params })
}

fn choice(line: &str) -> Option<Line<'_>> {
    let repeatable = match line.as_bytes().first()? {
        b'+' => false,
        b'*' => true,
        _ => return None,
    };
    let body = line[1..].trim();
    if let Some(arrow) = body.rfind("->") {
        let target = body[arrow + 2..].trim();
        if is_target(target) {
            return Some(Line::Choice {
                repeatable,
                label: body[..arrow].trim(),
                target: Some(target),
            });
        }
    }
    Some(Line::Choice {
        repeatable,
        label: body,
        target: None,
    })
}

fn divert(line: &str) -> Option<Line<'_>> {
    let target = line.strip_prefix("->")?.trim();
    is_target(target).then_some(Line::Divert(target))
}

fn assignment(line: &str) -> Option<Line<'_>> {
    let rest = line.strip_prefix('~')?;
    let (var, expr) = rest.split_once('=')?;
    let var = var.trim();
    let expr = expr.trim();
    if !is_name(var) || expr.is_empty() {
        return None;
    }
    Some(Line::Assignment { var, expr })
}

fn call(line: &str) -> Option<Line<'_>> {
    let rest = line.strip_prefix('~')?;
    let (name, args) = invocation(rest)?;
    Some(Line::Call { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_targets() {
        assert!(is_name("start"));
        assert!(is_name("_x9"));
        assert!(!is_name("9x"));
        assert!(!is_name("seat.one"));
        assert!(!is_name(""));
        assert!(is_target("seat.one"));
        assert!(is_target("END"));
        assert!(!is_target("a.b.c"));
        assert!(!is_target("a."));
    }

    #[test]
    fn headers() {
        assert_eq!(classify("=== start ==="), Line::KnotHeader("start"));
        assert_eq!(classify("===start==="), Line::KnotHeader("start"));
        assert_eq!(classify("== intro =="), Line::StitchHeader("intro"));
        assert_eq!(classify("=== seat.one ==="), Line::MalformedKnotHeader("seat.one"));
        assert_eq!(classify("== two words =="), Line::MalformedStitchHeader("two words"));
    }

    #[test]
    fn unbalanced_fences_are_text() {
        assert_eq!(classify("=== start =="), Line::Text("=== start =="));
        assert_eq!(classify("==== start ===="), Line::Text("==== start ===="));
    }

    #[test]
    fn declarations() {
        assert_eq!(
            classify("VAR coins = 0"),
            Line::VarDecl {
                name: "coins",
                value: "0"
            }
        );
        assert_eq!(
            classify("LIST mood = calm, angry ,"),
            Line::ListDecl {
                name: "mood",
                items: vec!["calm", "angry"]
            }
        );
        assert_eq!(
            classify("EXTERNAL play(sound, volume)"),
            Line::ExternalDecl {
                name: "play",
                params: "sound, volume"
            }
        );
        assert_eq!(classify("VARIABLE x = 1"), Line::Text("VARIABLE x = 1"));
    }

    #[test]
    fn choices() {
        assert_eq!(
            classify("+ Buy a coffee -> buy"),
            Line::Choice {
                repeatable: false,
                label: "Buy a coffee",
                target: Some("buy")
            }
        );
        assert_eq!(
            classify("* Look around -> room.desk"),
            Line::Choice {
                repeatable: true,
                label: "Look around",
                target: Some("room.desk")
            }
        );
        assert_eq!(
            classify("+ Wander off"),
            Line::Choice {
                repeatable: false,
                label: "Wander off",
                target: None
            }
        );
        assert_eq!(
            classify("+ Bad -> a.b.c"),
            Line::Choice {
                repeatable: false,
                label: "Bad -> a.b.c",
                target: None
            }
        );
    }

    #[test]
    fn divert_assignment_call() {
        assert_eq!(classify("-> END"), Line::Divert("END"));
        assert_eq!(classify("->  hall.door "), Line::Divert("hall.door"));
        assert_eq!(classify("-> a.b.c"), Line::Text("-> a.b.c"));
        assert_eq!(
            classify("~ coins = coins + 1"),
            Line::Assignment {
                var: "coins",
                expr: "coins + 1"
            }
        );
        assert_eq!(
            classify("~ play(\"bell\", 3)"),
            Line::Call {
                name: "play",
                args: "\"bell\", 3"
            }
        );
    }

    #[test]
    fn speaker_line_is_text() {
        assert_eq!(classify("Barista: Hi there!"), Line::Text("Barista: Hi there!"));
        assert_eq!(classify("   "), Line::Blank);
    }
}
