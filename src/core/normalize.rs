/// Normalizer — comment stripping and glue merging.

use std::borrow::Cow;

/// Line comment marker.
pub const COMMENT_MARKER: &str = "//";
/// Glue marker: joins a line with the next without a line break.
pub const GLUE_MARKER: &str = "<>";

/// A logical line after comment removal and glue merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line it was built from.
    pub line: usize,
    pub text: String,
    /// At least one glue marker was consumed while building this line.
    pub glued: bool,
}

impl LogicalLine {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Remove a line comment: everything from the first `//` not preceded by a
/// backslash. The backslash of an escaped `\//` is dropped.
///
/// String literals are not recognised, so a `//` inside quotes also starts a
/// comment.
pub fn strip_comment(line: &str) -> Cow<'_, str> {
    let mut kept = String::new();
    let mut rest = line;
    while let Some(at) = rest.find(COMMENT_MARKER) {
        if at > 0 && rest.as_bytes()[at - 1] == b'\\' {
            kept.push_str(&rest[..at - 1]);
            kept.push_str(COMMENT_MARKER);
            rest = &rest[at + COMMENT_MARKER.len()..];
            continue;
        }
        rest = &rest[..at];
        break;
    }
    if kept.is_empty() {
        Cow::Borrowed(rest)
    } else {
        kept.push_str(rest);
        Cow::Owned(kept)
    }
}

/// Turn source text into logical lines.
///
/// Blank lines flush any pending glue buffer and are kept as empty lines so
/// paragraph breaks survive.
pub fn normalize(source: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let stripped = strip_comment(raw);
        let line = stripped.trim_end();

        if line.trim().is_empty() {
            if let Some(buf) = pending.take() {
                out.push(buf);
            }
            out.push(LogicalLine {
                line: number,
                text: String::new(),
                glued: false,
            });
            continue;
        }

        let buf = pending.get_or_insert_with(|| LogicalLine {
            line: number,
            text: String::new(),
            glued: false,
        });

        if let Some(head) = line.strip_suffix(GLUE_MARKER) {
            buf.text.push_str(head);
            buf.glued = true;
        } else {
            buf.text.push_str(line);
            if let Some(done) = pending.take() {
                out.push(done);
            }
        }
    }

    if let Some(buf) = pending {
        out.push(buf);
    }
    out
}
