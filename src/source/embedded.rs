//! In-memory file set for defaults shipped inside the binary

use super::{compile_pattern, FileSource};
use crate::utils::normalize_path;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Read-only virtual filesystem.
///
/// Typically built from `include_bytes!` so the defaults travel with the
/// executable:
///
/// ```
/// use stratacfg::EmbeddedFs;
///
/// static FILES: &[(&str, &[u8])] = &[
///     ("embeds/envs/.env", b"APP_MODE=prod\n"),
///     ("embeds/params/app.toml", b"[db]\nport = 5432\n"),
/// ];
/// let fs = EmbeddedFs::from_static(FILES);
/// assert_eq!(fs.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedFs {
    files: BTreeMap<String, Cow<'static, [u8]>>,
}

impl EmbeddedFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_static(files: &'static [(&'static str, &'static [u8])]) -> Self {
        let files = files
            .iter()
            .map(|(path, bytes)| (normalize_path(path), Cow::Borrowed(*bytes)))
            .collect();
        Self { files }
    }

    /// Snapshot every regular file under `root`, keyed by its path relative to `root`.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut fs = Self::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed walking {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("Failed reading {}", entry.path().display()))?;
            fs.insert(&rel.to_string_lossy(), bytes);
        }
        Ok(fs)
    }

    /// Add or replace a file, builder style.
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), Cow::Owned(bytes.into()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FileSource for EmbeddedFs {
    fn label(&self) -> &str {
        "embedded"
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, globset::Error> {
        let matcher = compile_pattern(&normalize_path(pattern))?;
        // BTreeMap keys iterate in sorted order already
        Ok(self.files.keys().filter(|path| matcher.is_match(path.as_str())).cloned().collect())
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files.get(&normalize_path(path)).map(|bytes| bytes.to_vec()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("embedded file not found: {path}"))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }
}
