//! Raw-text scanning of inline link destinations.
//!
//! The parser reports where a link starts and ends, and an unescaped
//! destination. Rewriting needs the exact bytes of the destination as they
//! appear in the file, so the link source is re-scanned here.

use std::ops::Range;

/// Where the destination of an inline link sits in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Destination {
    /// `[text](<target>)`: left alone.
    Angle,
    /// `[text]()`.
    Empty,
    /// Byte range of the destination (exclusive end).
    Raw(Range<usize>),
}

/// Locate the destination of the inline link or image occupying `range`.
///
/// Returns `None` when the source does not have the `[..](..)` shape.
pub(crate) fn inline_destination(text: &str, range: Range<usize>) -> Option<Destination> {
    let bytes = text.as_bytes();
    let end = range.end.min(bytes.len());
    let mut i = range.start;

    if bytes.get(i) == Some(&b'!') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'[') {
        return None;
    }

    let close = matching_bracket(bytes, i, end)?;
    i = close + 1;
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i += 1;

    while i < end && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'<') => return Some(Destination::Angle),
        Some(b')') => return Some(Destination::Empty),
        None => return None,
        _ => {}
    }

    let start = i;
    let mut depth = 0usize;
    while i < end {
        match bytes[i] {
            b'\\' if i + 1 < end && bytes[i + 1].is_ascii_punctuation() => {
                i += 2;
                continue;
            }
            b' ' | b'\t' | b'\n' | b'\r' => break,
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    if i == start {
        Some(Destination::Empty)
    } else {
        Some(Destination::Raw(start..i))
    }
}

/// Index of the `]` closing the `[` at `open`, skipping escapes and code spans.
fn matching_bracket(bytes: &[u8], open: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < end {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'`' => {
                let run = count_run(bytes, i, end, b'`');
                if let Some(after) = closing_backticks(bytes, i + run, end, run) {
                    i = after;
                    continue;
                }
                i += run;
                continue;
            }
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn count_run(bytes: &[u8], from: usize, end: usize, byte: u8) -> usize {
    bytes[from..end].iter().take_while(|&&b| b == byte).count()
}

/// Position just past a backtick run of exactly `len`, searching from `from`.
fn closing_backticks(bytes: &[u8], mut from: usize, end: usize, len: usize) -> Option<usize> {
    while from < end {
        if bytes[from] == b'`' {
            let run = count_run(bytes, from, end, b'`');
            if run == len {
                return Some(from + run);
            }
            from += run;
        } else {
            from += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest(text: &str) -> Option<Destination> {
        inline_destination(text, 0..text.len())
    }

    fn raw(text: &str) -> &str {
        match dest(text) {
            Some(Destination::Raw(r)) => &text[r],
            other => panic!("expected raw destination, got {other:?}"),
        }
    }

    #[test]
    fn plain_link() {
        assert_eq!(raw("[Guide](guide/setup.md)"), "guide/setup.md");
        assert_eq!(raw("![Logo](img/logo.png \"title\")"), "img/logo.png");
    }

    #[test]
    fn nested_brackets_and_images() {
        assert_eq!(raw("[![badge](b.svg)](docs/a.md)"), "docs/a.md");
        assert_eq!(raw("[a [b] c](x.md)"), "x.md");
    }

    #[test]
    fn escapes_and_code_spans_in_text() {
        assert_eq!(raw(r"[a \] b](x.md)"), "x.md");
        assert_eq!(raw("[`a]`](x.md)"), "x.md");
    }

    #[test]
    fn balanced_parens_in_destination() {
        assert_eq!(raw("[x](file(1).md)"), "file(1).md");
    }

    #[test]
    fn backslash_paths_are_kept_verbatim() {
        assert_eq!(raw(r"[x](..\docs\a.md)"), r"..\docs\a.md");
    }

    #[test]
    fn angle_and_empty_destinations() {
        assert_eq!(dest("[x](<my file.md>)"), Some(Destination::Angle));
        assert_eq!(dest("[x]()"), Some(Destination::Empty));
        assert_eq!(dest("[x][ref]"), None);
    }
}
