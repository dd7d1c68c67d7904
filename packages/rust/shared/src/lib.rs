//! Shared types, error model, and configuration for DocAssembler.
//!
//! This crate is the foundation depended on by all other DocAssembler crates.
//! It provides:
//! - [`DocAssemblerError`]: the unified error type
//! - Domain types ([`FileRecord`], [`LinkRecord`], [`LinkType`], [`ReturnCode`])
//! - Configuration ([`AssembleConfig`], [`ContentGroup`], [`ReplacementRule`], config loading)
//! - Slash-normalized path helpers ([`paths`])

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AssembleConfig, CONFIG_FILE_NAME, ContentGroup, ReplacementRule, default_config_path,
    init_config, load_config_from,
};
pub use error::{DocAssemblerError, Result};
pub use types::{FileRecord, LinkRecord, LinkType, ReturnCode};
