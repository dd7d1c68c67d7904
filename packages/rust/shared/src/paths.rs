//! Slash-normalized path strings.
//!
//! Every path the pipeline compares is an absolute string with `/` separators,
//! lexically normalized (no `.`, `..`, or doubled separators). Lookups between
//! source paths, link targets, and destination paths are plain ordinal string
//! comparisons on this form, so all normalization goes through here.

/// Replace Windows directory separators with `/`.
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether the path is rooted (`/x` or a drive-letter `C:/x`).
pub fn is_absolute(path: &str) -> bool {
    !root_of(&to_slash(path)).is_empty()
}

/// Lexically normalize a path: slash separators, `.` dropped, `..` folded.
///
/// `..` never climbs above the root of an absolute path; on a relative path
/// leading `..` segments are kept.
pub fn normalize(path: &str) -> String {
    let slashed = to_slash(path);
    let root = root_of(&slashed);
    let rest = &slashed[root.len()..];

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if !root.is_empty() => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut out = root.to_string();
    out.push_str(&segments.join("/"));
    out
}

/// Join `rel` onto `base` and normalize. A rooted `rel` replaces `base`.
pub fn join(base: &str, rel: &str) -> String {
    if is_absolute(rel) {
        return normalize(rel);
    }
    if base.is_empty() {
        return normalize(rel);
    }
    normalize(&format!("{base}/{rel}"))
}

/// The directory part of a normalized path (`/a/b/c.md` → `/a/b`).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) if path[..idx].ends_with(':') => &path[..=idx],
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The final segment of a path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether the file name ends with the given extension (case-insensitive, no dot).
pub fn has_extension(path: &str, ext: &str) -> bool {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx + 1..].eq_ignore_ascii_case(ext),
        _ => false,
    }
}

/// Strip a directory prefix, segment-aware (`/a/bc` is not under `/a/b`).
///
/// Returns the remainder without a leading `/`, or `None` when `path` is
/// not inside `dir`.
pub fn strip_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return path.strip_prefix('/');
    }
    let rest = path.strip_prefix(dir)?;
    if rest.is_empty() {
        // `path` is the directory itself.
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// Case-insensitive, segment-aware variant of [`strip_dir`].
pub fn strip_dir_ignore_case<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let dir = dir.trim_end_matches('/');
    if path.len() < dir.len() || !path.is_char_boundary(dir.len()) {
        return None;
    }
    let (head, rest) = path.split_at(dir.len());
    if !head.eq_ignore_ascii_case(dir) {
        return None;
    }
    if rest.is_empty() && !dir.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// The path from directory `from_dir` to `to`, with `/` separators.
///
/// Both inputs must be absolute and normalized. Segments compare ordinally.
pub fn relative(from_dir: &str, to: &str) -> String {
    let from_root = root_of(from_dir);
    let to_root = root_of(to);
    if from_root != to_root {
        return to.to_string();
    }

    let from: Vec<&str> = segments(&from_dir[from_root.len()..]);
    let target: Vec<&str> = segments(&to[to_root.len()..]);

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + target.len() - common);
    parts.extend(std::iter::repeat_n("..", from.len() - common));
    parts.extend_from_slice(&target[common..]);

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// The root prefix of a slash path: `/`, `C:/`, or empty when relative.
fn root_of(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.first() == Some(&b'/') {
        return "/";
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.get(2) == Some(&b'/') {
            return &path[..3];
        }
        return &path[..2];
    }
    ""
}
