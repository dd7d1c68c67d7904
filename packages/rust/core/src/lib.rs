//! Documentation assembly pipeline for DocAssembler.
//!
//! This crate turns a set of content groups into an assembled documentation
//! tree: inventory → validation → link resolution → write. See [`pipeline::run`].

pub mod assembler;
pub mod inventory;
pub mod pipeline;
pub mod replace;
pub mod resolve;
pub mod validate;

pub use pipeline::{ProgressReporter, RunOptions, RunReport, SilentProgress, run};
