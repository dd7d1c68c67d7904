//! Write stage: copy every manifest file into the output tree.
//!
//! Files whose links all stay the same (and whose text the content rules do
//! not touch) are copied byte for byte. Everything else is read once and
//! rebuilt in a single left-to-right pass that splices the resolved URLs
//! into the link spans.
//!
//! The stage is not transactional: the first failure stops it, and files
//! written before that point stay on disk.

use std::collections::HashMap;

use tracing::{debug, error, info, instrument, trace};

use docassembler_catalog::FileCatalog;
use docassembler_shared::{
    AssembleConfig, DocAssemblerError, FileRecord, LinkRecord, Result, ReturnCode, paths,
};

use crate::pipeline::ProgressReporter;
use crate::replace::RuleSet;

/// Output of the write stage.
#[derive(Debug, Clone, Default)]
pub struct AssembleResult {
    pub code: ReturnCode,
    /// Files copied unchanged.
    pub copied: usize,
    /// Files written with rewritten content.
    pub rewritten: usize,
    /// Link spans replaced across all files.
    pub links_rewritten: usize,
}

/// How a single file ended up in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Written {
    Copied,
    Rewritten { links: usize },
}

/// Write every file of the manifest. Stops at the first failure.
#[instrument(skip_all, fields(files = files.len()))]
pub fn assemble(
    files: &[FileRecord],
    config: &AssembleConfig,
    catalog: &dyn FileCatalog,
    progress: &dyn ProgressReporter,
) -> AssembleResult {
    let mut result = AssembleResult::default();
    let mut content_rules: HashMap<usize, RuleSet> = HashMap::new();
    let no_rules = RuleSet::default();
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        let rules = content_rules.entry(file.group).or_insert_with(|| {
            let Some(group) = config.content.get(file.group) else {
                return RuleSet::default();
            };
            if group.raw_copy {
                return RuleSet::default();
            }
            let (rules, code) = RuleSet::compile(config.content_rules_for(group));
            result.code.escalate(code);
            rules
        });

        let rules = if paths::has_extension(&file.source_path, "md") {
            &*rules
        } else {
            &no_rules
        };

        match write_file(file, rules, catalog) {
            Ok(Written::Copied) => result.copied += 1,
            Ok(Written::Rewritten { links }) => {
                result.rewritten += 1;
                result.links_rewritten += links;
            }
            Err(e) => {
                error!(
                    source = %file.source_path,
                    destination = %file.destination_path,
                    error = %e,
                    "failed to write file, stopping"
                );
                result.code = ReturnCode::Error;
                break;
            }
        }

        progress.file_written(&file.destination_path, i + 1, total);
    }

    info!(
        copied = result.copied,
        rewritten = result.rewritten,
        links = result.links_rewritten,
        code = %result.code,
        "assembly complete"
    );

    result
}

/// Copy or rewrite a single file.
fn write_file(file: &FileRecord, rules: &RuleSet, catalog: &dyn FileCatalog) -> Result<Written> {
    let mut updates: Vec<&LinkRecord> = file.links.iter().filter(|l| l.needs_rewrite()).collect();
    updates.sort_by_key(|l| l.span_start);

    if updates.is_empty() && rules.is_empty() {
        catalog.copy(&file.source_path, &file.destination_path)?;
        debug!(destination = %file.destination_path, "copied");
        return Ok(Written::Copied);
    }

    let source = catalog.read_text(&file.source_path)?;
    let mut text = splice_links(&source, &updates)?;
    if !rules.is_empty() {
        text = rules.apply(&text);
    }

    if updates.is_empty() && text == source {
        catalog.copy(&file.source_path, &file.destination_path)?;
        debug!(destination = %file.destination_path, "copied");
        return Ok(Written::Copied);
    }

    catalog.write_text(&file.destination_path, &text)?;
    debug!(
        destination = %file.destination_path,
        links = updates.len(),
        "rewritten"
    );
    Ok(Written::Rewritten {
        links: updates.len(),
    })
}

/// Rebuild `source` with each link's span replaced by its resolved URL.
///
/// `updates` must be sorted by `span_start` and must not overlap. Spans are
/// inclusive, so the cursor resumes at `span_end + 1`.
pub fn splice_links(source: &str, updates: &[&LinkRecord]) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;

    for link in updates {
        let replacement = link.replacement();
        let replacement = replacement.as_deref().unwrap_or(&link.original_url);
        let head = source.get(cursor..link.span_start).ok_or_else(|| {
            DocAssemblerError::validation(format!(
                "link span {}..={} at line {} is out of order or out of range",
                link.span_start, link.span_end, link.line
            ))
        })?;

        trace!(cursor, span_start = link.span_start, span_end = link.span_end, "splice");
        out.push_str(head);
        out.push_str(replacement);
        cursor = link.span_end + 1;
    }

    let tail = source.get(cursor..).ok_or_else(|| {
        DocAssemblerError::validation(format!("link span ends past the text ({cursor})"))
    })?;
    out.push_str(tail);

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
