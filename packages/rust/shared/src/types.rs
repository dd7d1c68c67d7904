//! Core domain types for the documentation assembly pipeline.

use std::borrow::Cow;

use percent_encoding::percent_encode_byte;
use serde::Serialize;

// ---------------------------------------------------------------------------
// ReturnCode
// ---------------------------------------------------------------------------

/// Outcome of a pipeline stage, ordered from best to worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ReturnCode {
    /// The stage completed without findings.
    #[default]
    Normal,
    /// The stage completed, but something was skipped (e.g. a bad user pattern).
    Warning,
    /// The stage failed; downstream stages that depend on it must not run.
    Error,
}

impl ReturnCode {
    /// Keep the worse of two codes.
    pub fn worst(self, other: ReturnCode) -> ReturnCode {
        self.max(other)
    }

    /// Raise `self` to `other` if `other` is worse.
    pub fn escalate(&mut self, other: ReturnCode) {
        *self = self.worst(other);
    }

    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            ReturnCode::Normal => 0,
            ReturnCode::Warning => 1,
            ReturnCode::Error => 2,
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReturnCode::Normal => "normal",
            ReturnCode::Warning => "warning",
            ReturnCode::Error => "error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// LinkType
// ---------------------------------------------------------------------------

/// Classification of a hyperlink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkType {
    /// A Markdown file (or a heading inside the current file).
    Local,
    /// Any other local file: images, PDFs, source files.
    Resource,
    /// `http://` or `https://`.
    Webpage,
    /// `ftp://` or `ftps://`.
    Ftp,
    /// `mailto:`.
    Mail,
    /// DocFX `xref:` cross reference.
    CrossReference,
    /// A link with no target at all.
    Empty,
}

impl LinkType {
    /// Whether links of this type point into the local file tree.
    pub fn is_local(self) -> bool {
        matches!(self, LinkType::Local | LinkType::Resource)
    }
}

// ---------------------------------------------------------------------------
// LinkRecord
// ---------------------------------------------------------------------------

/// A single hyperlink extracted from a Markdown file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    /// Verbatim URL text from the source file (diagnostics and change detection).
    pub original_url: String,
    /// Working copy of the URL, percent-decoded.
    pub url: String,
    /// Target classification.
    pub link_type: LinkType,
    /// Byte offset of the first URL byte in the source text.
    pub span_start: usize,
    /// Byte offset of the last URL byte in the source text (inclusive).
    pub span_end: usize,
    /// 1-based line of `span_start`.
    pub line: usize,
    /// 1-based column (in bytes) of `span_start`.
    pub column: usize,
    /// Fragment or query suffix including its delimiter (`#usage`), or empty.
    pub url_topic: String,
    /// Absolute normalized target path without topic; empty for same-file headings.
    pub url_full_path: String,
    /// Resolved absolute target (destination path or external URL).
    pub resolved_full_url: Option<String>,
    /// Resolved target relative to the owning file's destination directory.
    pub resolved_relative_url: Option<String>,
}

impl LinkRecord {
    /// Whether this link only points at a heading in its own file.
    pub fn is_same_file_reference(&self) -> bool {
        self.url_full_path.is_empty()
    }

    /// The text to write into the output, preferring the relative form.
    ///
    /// The relative form is a plain path. It is escaped the way the original
    /// destination was written, so a target that did not move reproduces the
    /// original text exactly.
    pub fn replacement(&self) -> Option<Cow<'_, str>> {
        let Some(relative) = self.resolved_relative_url.as_deref() else {
            return self.resolved_full_url.as_deref().map(Cow::Borrowed);
        };
        let path = relative
            .strip_suffix(self.url_topic.as_str())
            .unwrap_or(relative);
        let topic = &relative[path.len()..];
        let original = self
            .original_url
            .strip_suffix(self.url_topic.as_str())
            .unwrap_or(&self.original_url);
        Some(Cow::Owned(format!("{}{topic}", escape_like(path, original))))
    }

    /// Whether writing this link would change the source text.
    pub fn needs_rewrite(&self) -> bool {
        self.replacement()
            .is_some_and(|replacement| replacement.as_ref() != self.original_url.as_str())
    }
}

/// Bytes that can never appear raw in an inline link destination path.
const ALWAYS_ESCAPED: &[u8] = b" <>#?";

/// Percent-escape `path` for a link destination, following `original`.
///
/// A byte is escaped when it cannot appear raw or when `original` wrote it as
/// `%XX`. Non-ASCII characters are escaped only if `original` escaped any.
fn escape_like(path: &str, original: &str) -> String {
    let escaped = escaped_bytes(original);
    let escape_non_ascii = escaped.iter().any(|b| !b.is_ascii());

    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        let mut buf = [0u8; 4];
        let bytes = c.encode_utf8(&mut buf).as_bytes();
        let escape = match bytes {
            [b] if b.is_ascii() => {
                b.is_ascii_control() || ALWAYS_ESCAPED.contains(b) || escaped.contains(b)
            }
            _ => escape_non_ascii,
        };
        if escape {
            bytes.iter().for_each(|&b| out.push_str(percent_encode_byte(b)));
        } else {
            out.push(c);
        }
    }
    out
}

/// The bytes written as `%XX` in `text`.
fn escaped_bytes(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    for (i, _) in text.match_indices('%') {
        let Some(hex) = bytes.get(i + 1..i + 3) else {
            continue;
        };
        let parsed = std::str::from_utf8(hex)
            .ok()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        if let Some(byte) = parsed {
            found.push(byte);
        }
    }
    found
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// One file of the manifest: where it comes from, where it goes, and its links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Absolute, slash-normalized source path.
    pub source_path: String,
    /// Absolute, slash-normalized destination path.
    pub destination_path: String,
    /// Index of the originating group in `AssembleConfig::content`.
    pub group: usize,
    /// Local links in ascending `span_start` order.
    pub links: Vec<LinkRecord>,
}

impl FileRecord {
    /// Create a record with no links yet.
    pub fn new(source_path: impl Into<String>, destination_path: impl Into<String>, group: usize) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            group,
            links: Vec::new(),
        }
    }
}
