//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use docassembler_catalog::DiskCatalog;
use docassembler_core::{ProgressReporter, RunOptions, RunReport};
use docassembler_shared::{ReturnCode, default_config_path, init_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocAssembler: build one documentation site out of many folders.
#[derive(Parser)]
#[command(
    name = "docassembler",
    version,
    about = "Assemble scattered Markdown and assets into one documentation tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble the documentation tree.
    Build {
        /// Folder that content groups are relative to (defaults to the current directory).
        #[arg(long = "workingfolder", env = "DOCASSEMBLER_WORKING_FOLDER")]
        working_folder: Option<PathBuf>,

        /// Config file (defaults to .docassembler.json in the working folder).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output folder, overriding `dest` from the config.
        #[arg(long = "outfolder")]
        out_folder: Option<String>,

        /// Delete the output folder before assembling.
        #[arg(long)]
        cleanup: bool,

        /// Write the run report as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Write a starter config file.
    Init {
        /// Folder to create the config in (defaults to the current directory).
        #[arg(long = "workingfolder")]
        working_folder: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docassembler=info",
        1 => "docassembler=debug",
        _ => "docassembler=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command and return the outcome for the process exit code.
pub(crate) fn run(cli: Cli) -> Result<ReturnCode> {
    match cli.command {
        Command::Build {
            working_folder,
            config,
            out_folder,
            cleanup,
            report,
        } => cmd_build(
            working_folder,
            config.as_deref(),
            out_folder,
            cleanup,
            report.as_deref(),
        ),
        Command::Init { working_folder } => cmd_init(working_folder),
    }
}

fn working_folder_or_cwd(folder: Option<PathBuf>) -> Result<PathBuf> {
    match folder {
        Some(folder) => Ok(folder),
        None => std::env::current_dir().wrap_err("cannot determine working directory"),
    }
}

fn cmd_build(
    working_folder: Option<PathBuf>,
    config_path: Option<&Path>,
    out_folder: Option<String>,
    cleanup: bool,
    report_path: Option<&Path>,
) -> Result<ReturnCode> {
    let working_folder = working_folder_or_cwd(working_folder)?;
    if !working_folder.is_dir() {
        return Err(eyre!(
            "working folder '{}' does not exist",
            working_folder.display()
        ));
    }

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(&working_folder));
    let config = load_config_from(&config_path)?;

    info!(
        config = %config_path.display(),
        groups = config.content.len(),
        "building documentation"
    );

    let options = RunOptions {
        working_folder: working_folder.to_string_lossy().into_owned(),
        output_folder: out_folder,
        cleanup,
    };

    let reporter = CliProgress::new();
    let report = docassembler_core::run(&config, &options, &DiskCatalog::new(), &reporter)?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
    }

    print_summary(&report);
    Ok(report.code)
}

fn print_summary(report: &RunReport) {
    println!();
    match report.code {
        ReturnCode::Error => println!("  Assembly failed."),
        ReturnCode::Warning => println!("  Assembly finished with warnings."),
        ReturnCode::Normal => println!("  Assembly finished."),
    }
    println!("  Output:      {}", report.output_folder);
    println!("  Files:       {} ({} written)", report.files, report.written);
    println!(
        "  Links:       {} ({} rewritten)",
        report.links, report.links_rewritten
    );

    if !report.collisions.is_empty() {
        println!("  Collisions:  {}", report.collisions.len());
        for collision in &report.collisions {
            println!("    {}", collision.destination_path);
            for member in &collision.members {
                println!("      <- {} (group #{})", member.source_path, member.group);
            }
        }
    }

    if !report.unresolved.is_empty() {
        println!("  Unresolved:  {}", report.unresolved.len());
        for link in &report.unresolved {
            println!(
                "    {}:{}:{} {} ({})",
                link.source_path, link.line, link.column, link.url, link.reason
            );
        }
    }

    println!(
        "  Time:        {:.1}s",
        report.elapsed_ms as f64 / 1000.0
    );
    println!();
}

fn cmd_init(working_folder: Option<PathBuf>) -> Result<ReturnCode> {
    let working_folder = working_folder_or_cwd(working_folder)?;
    let path = init_config(&working_folder)?;
    println!("Config initialized at: {}", path.display());
    Ok(ReturnCode::Normal)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flags_parse() {
        let cli = Cli::try_parse_from([
            "docassembler",
            "-vv",
            "build",
            "--workingfolder",
            "/repo",
            "--outfolder",
            "site",
            "--cleanup",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Build {
                working_folder,
                out_folder,
                cleanup,
                config,
                report,
            } => {
                assert_eq!(working_folder, Some(PathBuf::from("/repo")));
                assert_eq!(out_folder.as_deref(), Some("site"));
                assert!(cleanup);
                assert!(config.is_none());
                assert!(report.is_none());
            }
            Command::Init { .. } => panic!("expected build"),
        }
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["docassembler", "init", "--log-format", "json"]).unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
