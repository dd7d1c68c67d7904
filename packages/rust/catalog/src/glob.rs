//! Include/exclude glob matching shared by both catalogs.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use docassembler_shared::{DocAssemblerError, Result};

/// Compiled include and exclude patterns for one listing.
///
/// `*` and `?` never cross a `/`; `**` spans any number of directories,
/// so `**` alone selects everything and `**/*.md` also matches `a.md`.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    includes: GlobSet,
    excludes: GlobSet,
}

impl GlobFilter {
    /// Compile the pattern lists. A malformed pattern is a `Pattern` error.
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(Self {
            includes: build_set(includes)?,
            excludes: build_set(excludes)?,
        })
    }

    /// Whether a root-relative, `/`-separated path is selected.
    pub fn matches(&self, relative: &str) -> bool {
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
    }
    builder.build().map_err(|e| DocAssemblerError::Pattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

fn compile(pattern: &str) -> Result<Glob> {
    let normalized = pattern.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()
        .map_err(|e| DocAssemblerError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}
