//! Content file storage abstraction.
//!
//! The engine reads and writes content files through [`FileStore`] so the
//! pipeline never touches the filesystem directly. [`LocalFileStore`] is the
//! production backend; [`MemoryFileStore`] backs the pure pipeline tests.
//!
//! Paths are `/`-separated and relative to the store root, always including
//! the content-type directory (`pages/guides/index.md`).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

/// Abstract file storage: list, read, write.
pub trait FileStore {
    /// All files under `dir`, recursive, as store-relative paths.
    fn list_files(&self, dir: &str) -> Result<Vec<String>>;

    fn read(&self, path: &str) -> Result<String>;

    fn write(&self, path: &str, contents: &str) -> Result<()>;
}

/// Local-disk backend rooted at the configured content directory.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for LocalFileStore {
    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let base = self.root.join(dir);
        if !base.is_dir() {
            bail!("content directory does not exist: {}", base.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&base) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
        Ok(files)
    }

    fn read(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read content file: {}", full.display()))
    }

    fn write(&self, path: &str, contents: &str) -> Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, contents)
            .with_context(|| format!("Failed to write content file: {}", full.display()))
    }
}

/// In-memory backend for tests and dry pipelines.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), contents.into());
        }
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.read().ok()?.get(path).cloned()
    }
}

impl FileStore for MemoryFileStore {
    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir);
        let files = match self.files.read() {
            Ok(files) => files,
            Err(_) => bail!("memory store lock poisoned"),
        };
        Ok(files
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn read(&self, path: &str) -> Result<String> {
        match self.get(path) {
            Some(contents) => Ok(contents),
            None => bail!("no such file in memory store: {}", path),
        }
    }

    fn write(&self, path: &str, contents: &str) -> Result<()> {
        self.insert(path, contents);
        Ok(())
    }
}
