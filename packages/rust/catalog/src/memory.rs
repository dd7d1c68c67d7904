//! In-memory [`FileCatalog`] for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use docassembler_shared::{DocAssemblerError, Result, paths};

use crate::FileCatalog;
use crate::glob::GlobFilter;

/// A flat map of absolute paths to file contents. Directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a text file.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert(path, content.as_bytes().to_vec());
        self
    }

    /// Insert or replace a file.
    pub fn insert(&self, path: &str, content: Vec<u8>) {
        self.lock().insert(paths::normalize(path), content);
    }

    /// Text content of a file, if present and valid UTF-8.
    pub fn text(&self, path: &str) -> Option<String> {
        self.lock()
            .get(&paths::normalize(path))
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
    }

    /// All file paths currently stored, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map; keep serving it.
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileCatalog for MemoryCatalog {
    fn full_path(&self, path: &str) -> String {
        paths::join("/", path)
    }

    fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        let files = self.lock();
        files.contains_key(&path) || files.keys().any(|k| paths::strip_dir(k, &path).is_some())
    }

    fn list_files(
        &self,
        root: &str,
        includes: &[String],
        excludes: &[String],
    ) -> Result<Vec<String>> {
        let root = paths::normalize(root);
        if !self.exists(&root) {
            return Err(DocAssemblerError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source folder does not exist"),
            ));
        }

        let filter = GlobFilter::new(includes, excludes)?;
        Ok(self
            .lock()
            .keys()
            .filter(|path| {
                paths::strip_dir(path, &root)
                    .is_some_and(|relative| !relative.is_empty() && filter.matches(relative))
            })
            .cloned()
            .collect())
    }

    fn list_directories(&self, root: &str) -> Result<Vec<String>> {
        let root = paths::normalize(root);
        let mut dirs = BTreeSet::new();
        for path in self.lock().keys() {
            let mut dir = paths::parent(path);
            while let Some(relative) = paths::strip_dir(dir, &root) {
                if relative.is_empty() {
                    break;
                }
                dirs.insert(dir.to_string());
                dir = paths::parent(dir);
            }
        }
        Ok(dirs.into_iter().collect())
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(&paths::normalize(path))
            .cloned()
            .ok_or_else(|| DocAssemblerError::not_found(path))
    }

    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| {
            DocAssemblerError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn write_text(&self, path: &str, content: &str) -> Result<()> {
        self.insert(path, content.as_bytes().to_vec());
        Ok(())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let dst = paths::normalize(dst);
        let mut files = self.lock();
        if files.contains_key(&dst) {
            return Err(DocAssemblerError::io(
                &dst,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "destination already exists",
                ),
            ));
        }
        let content = files
            .get(&paths::normalize(src))
            .cloned()
            .ok_or_else(|| DocAssemblerError::not_found(src))?;
        files.insert(dst, content);
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> Result<()> {
        let path = paths::normalize(path);
        self.lock()
            .retain(|key, _| paths::strip_dir(key, &path).is_none());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_file("/repo/docs/README.md", "# Docs")
            .with_file("/repo/docs/guide/setup.md", "# Setup")
            .with_file("/repo/docs/guide/img/shot.png", "png")
            .with_file("/repo/docsx/other.md", "# Other")
    }

    #[test]
    fn list_files_is_scoped_to_root() {
        let files = catalog()
            .list_files("/repo/docs", &["**/*.md".into()], &[])
            .unwrap();
        assert_eq!(files, vec!["/repo/docs/README.md", "/repo/docs/guide/setup.md"]);
    }

    #[test]
    fn list_directories_walks_nested() {
        let dirs = catalog().list_directories("/repo/docs").unwrap();
        assert_eq!(dirs, vec!["/repo/docs/guide", "/repo/docs/guide/img"]);
    }

    #[test]
    fn exists_covers_implied_directories() {
        let c = catalog();
        assert!(c.exists("/repo/docs/guide"));
        assert!(c.exists("/repo/docs/README.md"));
        assert!(!c.exists("/repo/doc"));
    }

    #[test]
    fn copy_and_delete() {
        let c = catalog();
        c.copy("/repo/docs/README.md", "/out/README.md").unwrap();
        assert_eq!(c.text("/out/README.md").as_deref(), Some("# Docs"));
        assert!(c.copy("/repo/docs/README.md", "/out/README.md").is_err());

        c.delete_directory("/out").unwrap();
        assert!(!c.exists("/out/README.md"));
        assert!(c.exists("/repo/docs/README.md"));
    }

    #[test]
    fn read_missing_is_not_found() {
        let err = catalog().read_text("/repo/missing.md").unwrap_err();
        assert!(matches!(err, DocAssemblerError::FileNotFound { .. }));
    }
}
