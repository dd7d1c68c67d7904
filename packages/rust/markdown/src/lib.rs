//! Local hyperlink extraction from Markdown files.
//!
//! Parses a file with `pulldown-cmark` (tables and the other common extensions
//! enabled) and returns every inline link or image that points into the local
//! file tree, together with the exact byte span of its destination. The spans
//! are what the assembler later splices rewritten URLs into, so they always
//! refer to the raw source text, never to the parser's unescaped view of it.

mod scan;

use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, LinkType as MdLinkType, Options, Parser, Tag};
use tracing::{debug, instrument, trace};
use url::Url;

use docassembler_catalog::FileCatalog;
use docassembler_shared::{DocAssemblerError, LinkRecord, LinkType, Result, paths};

use crate::scan::Destination;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract the local links of `file_path`, ordered by `span_start`.
///
/// `base_path` is the documentation root: `~/x.md` and `/x.md` resolve
/// against it. Fails with `FileNotFound` when the file does not exist.
#[instrument(skip(catalog))]
pub fn extract_local_links(
    catalog: &dyn FileCatalog,
    base_path: &str,
    file_path: &str,
) -> Result<Vec<LinkRecord>> {
    if !catalog.exists(file_path) {
        return Err(DocAssemblerError::not_found(file_path));
    }
    let text = catalog.read_text(file_path)?;
    let links = parse_local_links(&text, base_path, file_path);
    debug!(count = links.len(), "extracted local links");
    Ok(links)
}

/// Extract local links from already-loaded Markdown text.
pub fn parse_local_links(text: &str, base_path: &str, file_path: &str) -> Vec<LinkRecord> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES;

    let lines = LineIndex::new(text);
    let file_dir = paths::parent(file_path);
    let mut links = Vec::new();

    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        let (md_type, dest_url) = match event {
            Event::Start(
                Tag::Link {
                    link_type,
                    dest_url,
                    ..
                }
                | Tag::Image {
                    link_type,
                    dest_url,
                    ..
                },
            ) => (link_type, dest_url),
            _ => continue,
        };

        // Autolinks are always absolute; reference links live in their definition.
        if md_type != MdLinkType::Inline {
            continue;
        }

        let span = match scan::inline_destination(text, range.clone()) {
            Some(Destination::Raw(span)) => span,
            Some(Destination::Angle) => {
                trace!(offset = range.start, "skipping angle-bracket destination");
                continue;
            }
            Some(Destination::Empty) | None => continue,
        };

        let raw = &text[span.clone()];
        if dest_url.as_ref() != raw {
            // The parser unescapes `\_` and friends; Windows paths must stay as written.
            trace!(parsed = %dest_url, raw, "using raw destination text");
        }

        let link_type = classify(raw);
        if !link_type.is_local() {
            continue;
        }

        let (line, column) = lines.position(span.start);
        links.push(build_record(
            raw,
            link_type,
            span.start,
            span.end - 1,
            (line, column),
            base_path,
            file_dir,
        ));
    }

    links.sort_by_key(|link| link.span_start);
    links
}

/// Classify a link target by its scheme or, for local targets, its extension.
pub fn classify(url: &str) -> LinkType {
    let url = url.trim();
    if url.is_empty() {
        return LinkType::Empty;
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return LinkType::Webpage;
    }
    if lower.starts_with("ftp://") || lower.starts_with("ftps://") {
        return LinkType::Ftp;
    }
    if lower.starts_with("mailto:") {
        return LinkType::Mail;
    }
    if lower.starts_with("xref:") {
        return LinkType::CrossReference;
    }
    // Any other scheme (`tel:`, `data:`) is external; a drive letter is not a scheme.
    if let Ok(parsed) = Url::parse(url) {
        if parsed.scheme().len() > 1 {
            return LinkType::Webpage;
        }
    }

    let (path, _) = split_topic(url);
    if path.is_empty() || paths::has_extension(&paths::to_slash(path), "md") {
        LinkType::Local
    } else {
        LinkType::Resource
    }
}

/// Split a URL into its path and its `#fragment` (or, failing that, `?query`) suffix.
pub fn split_topic(url: &str) -> (&str, &str) {
    match url.find('#').or_else(|| url.find('?')) {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_record(
    raw: &str,
    link_type: LinkType,
    span_start: usize,
    span_end: usize,
    (line, column): (usize, usize),
    base_path: &str,
    file_dir: &str,
) -> LinkRecord {
    let (path, topic) = split_topic(raw);
    let url_full_path = if path.is_empty() {
        String::new()
    } else {
        resolve_target(&decode(&unescape_path(path)), base_path, file_dir)
    };

    LinkRecord {
        original_url: raw.to_string(),
        url: decode(raw),
        link_type,
        span_start,
        span_end,
        line,
        column,
        url_topic: topic.to_string(),
        url_full_path,
        resolved_full_url: None,
        resolved_relative_url: None,
    }
}

/// Absolute target path of a link written in a file located in `file_dir`.
fn resolve_target(path: &str, base_path: &str, file_dir: &str) -> String {
    let path = paths::to_slash(path);
    if let Some(rest) = path.strip_prefix('~') {
        return paths::join(base_path, rest.trim_start_matches('/'));
    }
    if let Some(rest) = path.strip_prefix('/') {
        return paths::join(base_path, rest);
    }
    paths::join(file_dir, &path)
}

/// Drop CommonMark backslash escapes from a destination path.
///
/// Any other backslash is a Windows separator. `\.` counts as a separator too,
/// since `..\..\x.md` is far more common than an escaped dot.
fn unescape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next) if next.is_ascii_punctuation() && !matches!(next, '.' | '/' | '\\') => {
                out.push(next);
                chars.next();
            }
            _ => out.push('/'),
        }
    }
    out
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Maps byte offsets to 1-based line and column numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let line_start = self.starts[line.saturating_sub(1)];
        (line, offset - line_start + 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docassembler_catalog::MemoryCatalog;

    const ROOT: &str = "/repo";
    const FILE: &str = "/repo/docs/getting-started/README.md";

    fn links(text: &str) -> Vec<LinkRecord> {
        parse_local_links(text, ROOT, FILE)
    }

    #[test]
    fn relative_link_resolves_against_file_directory() {
        let text = "See [usage](../../tools/system-copilot/docs/README.md#usage).\n";
        let found = links(text);
        assert_eq!(found.len(), 1);

        let link = &found[0];
        assert_eq!(link.original_url, "../../tools/system-copilot/docs/README.md#usage");
        assert_eq!(link.link_type, LinkType::Local);
        assert_eq!(link.url_topic, "#usage");
        assert_eq!(link.url_full_path, "/repo/tools/system-copilot/docs/README.md");
        assert_eq!(&text[link.span_start..=link.span_end], link.original_url);
    }

    #[test]
    fn external_and_special_links_are_skipped() {
        let text = "\
[web](https://example.com/a.md)
[ftp](ftp://files.example.com/x)
[mail](mailto:someone@example.com)
[xref](xref:System.String)
<https://auto.example.com>
[angle](<my file.md>)
[empty]()
";
        assert!(links(text).is_empty());
    }

    #[test]
    fn same_file_heading_has_empty_full_path() {
        let found = links("Jump to [setup](#setup).\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url_full_path, "");
        assert_eq!(found[0].url_topic, "#setup");
        assert!(found[0].is_same_file_reference());
    }

    #[test]
    fn query_is_a_topic_when_no_fragment() {
        let found = links("[a](other.md?view=raw)\n");
        assert_eq!(found[0].url_topic, "?view=raw");
        assert_eq!(found[0].url_full_path, "/repo/docs/getting-started/other.md");
    }

    #[test]
    fn images_are_resources() {
        let found = links("![diagram](images/flow.png)\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].link_type, LinkType::Resource);
        assert_eq!(found[0].url_full_path, "/repo/docs/getting-started/images/flow.png");
    }

    #[test]
    fn tilde_and_rooted_links_resolve_against_base() {
        let found = links("[a](~/docs/a.md) [b](/tools/b.md)\n");
        assert_eq!(found[0].url_full_path, "/repo/docs/a.md");
        assert_eq!(found[1].url_full_path, "/repo/tools/b.md");
    }

    #[test]
    fn backslash_paths_use_raw_text() {
        let text = r"[win](..\shared\my\_file.md)";
        let found = links(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_url, r"..\shared\my\_file.md");
        assert_eq!(&text[found[0].span_start..=found[0].span_end], found[0].original_url);
    }

    #[test]
    fn backslash_escapes_are_not_separators() {
        let found = links(r"[a](file\(1\).md) [b](..\shared\my\_file.md) [c](..\..\x.md)");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].url_full_path, "/repo/docs/getting-started/file(1).md");
        assert_eq!(found[1].url_full_path, "/repo/docs/shared/my_file.md");
        assert_eq!(found[2].url_full_path, "/repo/x.md");
    }

    #[test]
    fn percent_encoding_is_decoded_for_lookup() {
        let found = links("[a](my%20page.md)\n");
        assert_eq!(found[0].original_url, "my%20page.md");
        assert_eq!(found[0].url, "my page.md");
        assert_eq!(found[0].url_full_path, "/repo/docs/getting-started/my page.md");
    }

    #[test]
    fn links_in_code_are_ignored() {
        let text = "```md\n[a](a.md)\n```\n\n`[b](b.md)`\n\n[c](c.md)\n";
        let found = links(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_url, "c.md");
    }

    #[test]
    fn links_in_tables_are_found_in_order() {
        let text = "\
| Name | Link |
| ---- | ---- |
| one  | [1](one.md) |
| two  | [2](two.md) |

[three](three.md)
";
        let found = links(text);
        let urls: Vec<_> = found.iter().map(|l| l.original_url.as_str()).collect();
        assert_eq!(urls, vec!["one.md", "two.md", "three.md"]);
        assert!(found.windows(2).all(|w| w[0].span_start < w[1].span_start));
    }

    #[test]
    fn line_and_column_are_one_based() {
        let found = links("# Title\n\nText [x](x.md)\n");
        assert_eq!(found[0].line, 3);
        assert_eq!(found[0].column, 10);
    }

    #[test]
    fn classify_schemes_and_extensions() {
        assert_eq!(classify("HTTPS://x"), LinkType::Webpage);
        assert_eq!(classify("ftps://x"), LinkType::Ftp);
        assert_eq!(classify("mailto:a@b"), LinkType::Mail);
        assert_eq!(classify("xref:a.b"), LinkType::CrossReference);
        assert_eq!(classify("tel:+123"), LinkType::Webpage);
        assert_eq!(classify(""), LinkType::Empty);
        assert_eq!(classify("a/b.MD#x"), LinkType::Local);
        assert_eq!(classify(r"C:\docs\a.md"), LinkType::Local);
        assert_eq!(classify("a/b.yaml"), LinkType::Resource);
    }

    #[test]
    fn extract_missing_file_fails() {
        let catalog = MemoryCatalog::new();
        let err = extract_local_links(&catalog, ROOT, FILE).unwrap_err();
        assert!(matches!(err, DocAssemblerError::FileNotFound { .. }));
    }

    #[test]
    fn extract_reads_through_catalog() {
        let catalog = MemoryCatalog::new().with_file(FILE, "[a](a.md)\n");
        let found = extract_local_links(&catalog, ROOT, FILE).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span_start, 4);
        assert_eq!(found[0].span_end, 7);
    }
}
