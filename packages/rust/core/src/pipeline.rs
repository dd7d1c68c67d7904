//! End-to-end assembly: inventory → validate → resolve → write.

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use docassembler_catalog::FileCatalog;
use docassembler_shared::{AssembleConfig, DocAssemblerError, Result, ReturnCode, paths};

use crate::assembler;
use crate::inventory;
use crate::resolve::{self, UnresolvedLink};
use crate::validate::{self, Collision};

/// Options for a single assembly run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Folder that content group sources and link roots are relative to.
    pub working_folder: String,
    /// Output folder override (otherwise `dest` from the config).
    pub output_folder: Option<String>,
    /// Delete the output folder before writing.
    pub cleanup: bool,
}

/// Summary of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub code: ReturnCode,
    /// Absolute output folder.
    pub output_folder: String,
    /// Files in the manifest.
    pub files: usize,
    /// Local links extracted.
    pub links: usize,
    /// Link spans rewritten in the output.
    pub links_rewritten: usize,
    /// Files written to the output tree.
    pub written: usize,
    pub collisions: Vec<Collision>,
    pub unresolved: Vec<UnresolvedLink>,
    pub elapsed_ms: u64,
}

/// Observer for pipeline progress. Library code never prints; it reports here.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each file lands in the output tree.
    fn file_written(&self, path: &str, current: usize, total: usize);
    /// Called once when the run finishes, whatever its outcome.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run the full assembly pipeline.
///
/// 1. Cleanup (optional): remove the output folder
/// 2. Inventory: build the manifest and extract links
/// 3. Validation: stop on destination collisions
/// 4. Resolution: stop on unresolved links, after collecting all of them
/// 5. Assembly: copy or rewrite every file
///
/// Stage failures come back as `Ok` with `ReturnCode::Error`. Only invalid
/// configuration and a source file vanishing mid-run are returned as `Err`.
#[instrument(skip_all, fields(working_folder = %options.working_folder))]
pub fn run(
    config: &AssembleConfig,
    options: &RunOptions,
    catalog: &dyn FileCatalog,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    config.validate()?;

    let working_folder = catalog.full_path(&options.working_folder);
    let output = options
        .output_folder
        .as_deref()
        .unwrap_or(&config.destination_folder);
    if output.trim().is_empty() {
        return Err(DocAssemblerError::config("no output folder configured"));
    }
    let output_folder = paths::join(&working_folder, output);

    let mut report = RunReport {
        output_folder: output_folder.clone(),
        ..RunReport::default()
    };

    info!(working = %working_folder, output = %output_folder, "starting assembly");

    // --- Phase 1: Cleanup ---
    if options.cleanup {
        progress.phase("Cleaning output folder");
        if let Err(e) = catalog.delete_directory(&output_folder) {
            stage_failed("cleanup", e)?;
            return Ok(finish(report, ReturnCode::Error, start, progress));
        }
    }

    // --- Phase 2: Inventory ---
    progress.phase("Building inventory");
    let mut inventory =
        match inventory::build_inventory(config, &working_folder, &output_folder, catalog) {
            Ok(inventory) => inventory,
            Err(e) => {
                stage_failed("inventory", e)?;
                return Ok(finish(report, ReturnCode::Error, start, progress));
            }
        };
    report.code.escalate(inventory.code);
    report.files = inventory.files.len();
    report.links = inventory.link_count();

    // --- Phase 3: Validation ---
    progress.phase("Checking for destination collisions");
    let validation = validate::validate_manifest(&inventory.files, config);
    report.collisions = validation.collisions;
    if validation.code == ReturnCode::Error {
        return Ok(finish(report, ReturnCode::Error, start, progress));
    }

    // --- Phase 4: Resolution ---
    progress.phase("Resolving links");
    let resolution = resolve::resolve_links(&mut inventory.files, config, &working_folder);
    report.unresolved = resolution.unresolved;
    if resolution.code == ReturnCode::Error {
        return Ok(finish(report, ReturnCode::Error, start, progress));
    }

    // --- Phase 5: Assembly ---
    progress.phase("Writing output");
    let assembled = assembler::assemble(&inventory.files, config, catalog, progress);
    report.written = assembled.copied + assembled.rewritten;
    report.links_rewritten = assembled.links_rewritten;

    let code = assembled.code;
    Ok(finish(report, code, start, progress))
}

/// Log a failed stage. A vanished source file propagates; anything else becomes `Error`.
fn stage_failed(stage: &str, e: DocAssemblerError) -> Result<()> {
    if let DocAssemblerError::FileNotFound { .. } = e {
        return Err(e);
    }
    error!(stage, error = %e, "stage failed");
    Ok(())
}

fn finish(
    mut report: RunReport,
    code: ReturnCode,
    start: Instant,
    progress: &dyn ProgressReporter,
) -> RunReport {
    report.code.escalate(code);
    report.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    progress.done(&report);

    match report.code {
        ReturnCode::Error => error!(
            files = report.files,
            collisions = report.collisions.len(),
            unresolved = report.unresolved.len(),
            "run failed"
        ),
        ReturnCode::Warning => warn!(
            files = report.files,
            written = report.written,
            "run finished with warnings"
        ),
        ReturnCode::Normal => info!(
            files = report.files,
            written = report.written,
            links_rewritten = report.links_rewritten,
            elapsed_ms = report.elapsed_ms,
            "run complete"
        ),
    }

    report
}
