//! Inventory stage: expand content groups into the file manifest.
//!
//! For each group, in declared order, the matching source files are listed,
//! given a destination path (group destination folder + path relative to the
//! group source folder, then the effective URL replacement rules), and, for
//! Markdown files outside raw-copy groups, their local links are extracted.

use tracing::{debug, info, instrument};

use docassembler_catalog::FileCatalog;
use docassembler_shared::{AssembleConfig, ContentGroup, FileRecord, Result, ReturnCode, paths};

use crate::replace::RuleSet;

/// The manifest produced by the inventory stage.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Every file to be written, in group order then listing order.
    pub files: Vec<FileRecord>,
    /// `Warning` when a replacement rule had to be skipped.
    pub code: ReturnCode,
}

impl Inventory {
    /// Total number of extracted links across the manifest.
    pub fn link_count(&self) -> usize {
        self.files.iter().map(|f| f.links.len()).sum()
    }
}

/// Build the manifest for all content groups.
///
/// `working_folder` and `output_folder` must be absolute and normalized.
/// I/O failures abort the stage with `Err`; callers turn them into `Error`.
#[instrument(skip_all, fields(groups = config.content.len(), output = %output_folder))]
pub fn build_inventory(
    config: &AssembleConfig,
    working_folder: &str,
    output_folder: &str,
    catalog: &dyn FileCatalog,
) -> Result<Inventory> {
    let mut inventory = Inventory::default();

    for (index, group) in config.content.iter().enumerate() {
        let (rules, code) = RuleSet::compile(config.url_rules_for(group));
        inventory.code.escalate(code);

        let before = inventory.files.len();
        inventory_group(
            index,
            group,
            &rules,
            working_folder,
            output_folder,
            catalog,
            &mut inventory.files,
        )?;

        debug!(
            group = %group.label(index),
            files = inventory.files.len() - before,
            "group inventoried"
        );
    }

    info!(
        files = inventory.files.len(),
        links = inventory.link_count(),
        code = %inventory.code,
        "inventory complete"
    );

    Ok(inventory)
}

/// Absolute source and destination folders of a group.
pub fn group_folders(group: &ContentGroup, working_folder: &str, output_folder: &str) -> (String, String) {
    let source = paths::join(working_folder, &group.source_folder);
    let destination = match group.destination_folder.as_deref() {
        Some(dest) => paths::join(output_folder, dest),
        None => paths::normalize(output_folder),
    };
    (source, destination)
}

fn inventory_group(
    index: usize,
    group: &ContentGroup,
    rules: &RuleSet,
    working_folder: &str,
    output_folder: &str,
    catalog: &dyn FileCatalog,
    files: &mut Vec<FileRecord>,
) -> Result<()> {
    let (source_folder, destination_folder) = group_folders(group, working_folder, output_folder);

    let sources = catalog.list_files(&source_folder, &group.include_globs, &group.exclude_globs)?;

    for source in sources {
        let relative = paths::strip_dir(&source, &source_folder).unwrap_or(&source);
        let destination = paths::join(&destination_folder, relative);
        let destination = paths::normalize(&rules.apply(&destination));

        let mut record = FileRecord::new(source, destination, index);
        if !group.raw_copy && paths::has_extension(&record.source_path, "md") {
            record.links = docassembler_markdown::extract_local_links(
                catalog,
                working_folder,
                &record.source_path,
            )?;
        }

        files.push(record);
    }

    Ok(())
}
