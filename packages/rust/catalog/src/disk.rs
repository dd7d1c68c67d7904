//! [`FileCatalog`] over the real filesystem.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use docassembler_shared::{DocAssemblerError, Result, paths};

use crate::FileCatalog;
use crate::glob::GlobFilter;

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskCatalog;

impl DiskCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl FileCatalog for DiskCatalog {
    fn full_path(&self, path: &str) -> String {
        if paths::is_absolute(path) {
            return paths::normalize(path);
        }
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        paths::join(&cwd, path)
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn list_files(
        &self,
        root: &str,
        includes: &[String],
        excludes: &[String],
    ) -> Result<Vec<String>> {
        let root = paths::normalize(root);
        if !Path::new(&root).is_dir() {
            return Err(DocAssemblerError::io(
                &root,
                std::io::Error::new(ErrorKind::NotFound, "source folder does not exist"),
            ));
        }

        let filter = GlobFilter::new(includes, excludes)?;
        let mut files = Vec::new();

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone().into());
                DocAssemblerError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let full = paths::normalize(&entry.path().to_string_lossy());
            let Some(relative) = paths::strip_dir(&full, &root) else {
                continue;
            };
            if filter.matches(relative) {
                files.push(full);
            }
        }

        files.sort();
        debug!(root = %root, count = files.len(), "listed files");
        Ok(files)
    }

    fn list_directories(&self, root: &str) -> Result<Vec<String>> {
        let root = paths::normalize(root);
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| DocAssemblerError::io(&root, e.into()))?;
            if entry.file_type().is_dir() {
                dirs.push(paths::normalize(&entry.path().to_string_lossy()));
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| map_read_error(path, e))
    }

    fn read_text(&self, path: &str) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| map_read_error(path, e))
    }

    fn write_text(&self, path: &str, content: &str) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, content).map_err(|e| DocAssemblerError::io(path, e))
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        if Path::new(dst).exists() {
            return Err(DocAssemblerError::io(
                dst,
                std::io::Error::new(ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }
        ensure_parent(dst)?;
        std::fs::copy(src, dst).map_err(|e| map_read_error(src, e))?;
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocAssemblerError::io(path, e)),
        }
    }
}

/// Create the parent directory of `path` if missing (idempotent).
fn ensure_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocAssemblerError::io(parent, e))?;
    }
    Ok(())
}

fn map_read_error(path: &str, e: std::io::Error) -> DocAssemblerError {
    if e.kind() == ErrorKind::NotFound {
        DocAssemblerError::not_found(path)
    } else {
        DocAssemblerError::io(path, e)
    }
}
