//! File catalog: the only way the pipeline touches a filesystem.
//!
//! The [`FileCatalog`] trait covers glob listing, text and byte I/O, existence
//! checks and copies. Two implementations ship with it:
//! - [`DiskCatalog`]: the real filesystem (`walkdir` + `globset`)
//! - [`MemoryCatalog`]: an in-memory tree for tests and dry runs
//!
//! Every path crossing this boundary is an absolute, `/`-separated string as
//! produced by [`docassembler_shared::paths::normalize`].

mod disk;
mod glob;
mod memory;

use docassembler_shared::Result;

pub use disk::DiskCatalog;
pub use glob::GlobFilter;
pub use memory::MemoryCatalog;

/// Filesystem operations used by every pipeline stage.
pub trait FileCatalog: Send + Sync {
    /// Absolute, normalized form of `path` (relative paths resolve against the current directory).
    fn full_path(&self, path: &str) -> String;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Files under `root` matching any include glob and no exclude glob, sorted.
    ///
    /// Globs are matched against the path relative to `root`.
    fn list_files(&self, root: &str, includes: &[String], excludes: &[String])
    -> Result<Vec<String>>;

    /// Immediate and nested directories under `root`, sorted.
    fn list_directories(&self, root: &str) -> Result<Vec<String>>;

    /// Read a whole file as raw bytes. Fails with `FileNotFound` when absent.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Read a whole file as UTF-8 text. Fails with `FileNotFound` when absent.
    fn read_text(&self, path: &str) -> Result<String>;

    /// Write text, replacing any existing file and creating parent directories.
    fn write_text(&self, path: &str, content: &str) -> Result<()>;

    /// Copy `src` to `dst`, creating parent directories. Fails if `dst` exists.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Remove a directory and everything below it. Missing directories are fine.
    fn delete_directory(&self, path: &str) -> Result<()>;
}

/// Read all lines of a text file, without line terminators.
pub fn read_lines(catalog: &dyn FileCatalog, path: &str) -> Result<Vec<String>> {
    Ok(catalog
        .read_text(path)?
        .lines()
        .map(str::to_string)
        .collect())
}
