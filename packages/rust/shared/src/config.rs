//! Assembly configuration for DocAssembler.
//!
//! The configuration lives next to the documentation, by default at
//! `<working folder>/.docassembler.json`. A `.toml` file with the same schema
//! is accepted as well. CLI flags override config file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocAssemblerError, Result};

/// Default configuration file name, looked up in the working folder.
pub const CONFIG_FILE_NAME: &str = ".docassembler.json";

// ---------------------------------------------------------------------------
// Config structs (matching .docassembler.json schema)
// ---------------------------------------------------------------------------

/// Top-level assembly config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleConfig {
    /// Output folder, relative to the working folder unless absolute.
    #[serde(rename = "dest", default)]
    pub destination_folder: String,

    /// URL prefix for links that point outside the assembled tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file_prefix: Option<String>,

    /// Global destination-path replacement rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url_replacements: Vec<ReplacementRule>,

    /// Global Markdown text replacement rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_replacements: Vec<ReplacementRule>,

    /// Content groups, processed in declared order.
    #[serde(default)]
    pub content: Vec<ContentGroup>,
}

/// `content[]` entry: one source folder mapped into the output tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentGroup {
    /// Source folder, relative to the working folder unless absolute.
    #[serde(rename = "src")]
    pub source_folder: String,

    /// Folder under the output root; `None` writes straight into the root.
    #[serde(rename = "dest", default, skip_serializing_if = "Option::is_none")]
    pub destination_folder: Option<String>,

    /// Include globs, relative to `source_folder`.
    #[serde(rename = "files", default)]
    pub include_globs: Vec<String>,

    /// Exclude globs, relative to `source_folder`.
    #[serde(rename = "exclude", default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_globs: Vec<String>,

    /// Copy files untouched: no Markdown parsing, no link or content rewrites.
    #[serde(default)]
    pub raw_copy: bool,

    /// Replaces the global URL rules when present, even when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_replacements: Option<Vec<ReplacementRule>>,

    /// Replaces the global content rules when present, even when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_replacements: Option<Vec<ReplacementRule>>,

    /// Overrides the global external file prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_file_prefix: Option<String>,
}

/// A regex substitution: `expression` is replaced by `value` (`$1`, `${name}` allowed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub expression: String,
    #[serde(default)]
    pub value: String,
}

impl ReplacementRule {
    pub fn new(expression: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            value: value.into(),
        }
    }
}

impl ContentGroup {
    /// Short identity used in diagnostics.
    pub fn label(&self, index: usize) -> String {
        match &self.destination_folder {
            Some(dest) => format!("#{index} ({} -> {dest})", self.source_folder),
            None => format!("#{index} ({})", self.source_folder),
        }
    }
}

impl AssembleConfig {
    /// The URL rules in force for a group: its own list if set, else the global list.
    pub fn url_rules_for<'a>(&'a self, group: &'a ContentGroup) -> &'a [ReplacementRule] {
        group
            .url_replacements
            .as_deref()
            .unwrap_or(&self.url_replacements)
    }

    /// The content rules in force for a group: its own list if set, else the global list.
    pub fn content_rules_for<'a>(&'a self, group: &'a ContentGroup) -> &'a [ReplacementRule] {
        group
            .content_replacements
            .as_deref()
            .unwrap_or(&self.content_replacements)
    }

    /// The external file prefix for a group: its own if set, else the global one.
    pub fn external_prefix_for<'a>(&'a self, group: &'a ContentGroup) -> Option<&'a str> {
        group
            .external_file_prefix
            .as_deref()
            .or(self.external_file_prefix.as_deref())
            .filter(|prefix| !prefix.is_empty())
    }

    /// Reject configurations the pipeline cannot do anything useful with.
    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() {
            return Err(DocAssemblerError::config("no content groups defined"));
        }
        for (index, group) in self.content.iter().enumerate() {
            if group.source_folder.trim().is_empty() {
                return Err(DocAssemblerError::config(format!(
                    "content group #{index} has an empty 'src'"
                )));
            }
            if group.include_globs.is_empty() {
                return Err(DocAssemblerError::config(format!(
                    "content group {} has no 'files' patterns",
                    group.label(index)
                )));
            }
        }
        Ok(())
    }

    /// The starter configuration written by `init`.
    pub fn sample() -> Self {
        Self {
            destination_folder: "out".into(),
            external_file_prefix: None,
            url_replacements: vec![ReplacementRule::new("/[Dd]ocs/", "/")],
            content_replacements: Vec::new(),
            content: vec![
                ContentGroup {
                    source_folder: ".docfx".into(),
                    include_globs: vec!["**".into()],
                    raw_copy: true,
                    ..ContentGroup::default()
                },
                ContentGroup {
                    source_folder: "docs".into(),
                    include_globs: vec!["**".into()],
                    ..ContentGroup::default()
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the default config file inside a working folder.
pub fn default_config_path(working_folder: &Path) -> PathBuf {
    working_folder.join(CONFIG_FILE_NAME)
}

/// Load the assembly config from a specific file path (`.toml` or JSON).
pub fn load_config_from(path: &Path) -> Result<AssembleConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocAssemblerError::io(path, e))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config: AssembleConfig = if is_toml {
        toml::from_str(&content).map_err(|e| {
            DocAssemblerError::config(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        serde_json::from_str(&content).map_err(|e| {
            DocAssemblerError::config(format!("failed to parse {}: {e}", path.display()))
        })?
    };

    tracing::debug!(?path, groups = config.content.len(), "loaded config");
    Ok(config)
}

/// Write the starter config into `working_folder`. Returns the path to the created file.
pub fn init_config(working_folder: &Path) -> Result<PathBuf> {
    let path = default_config_path(working_folder);
    if path.exists() {
        return Err(DocAssemblerError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    std::fs::create_dir_all(working_folder)
        .map_err(|e| DocAssemblerError::io(working_folder, e))?;

    let content = serde_json::to_string_pretty(&AssembleConfig::sample())
        .map_err(|e| DocAssemblerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocAssemblerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
