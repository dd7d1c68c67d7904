//! DocAssembler CLI: assemble a documentation tree from scattered sources.
//!
//! Gathers Markdown and assets from content groups into one output folder,
//! rewriting relative links so they keep working after the move.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    let code = commands::run(cli)?;
    std::process::exit(code.exit_code());
}
