//! File sources feeding the env loader and the config merger
//!
//! Two implementations exist: [`EmbeddedFs`], an in-memory read-only file set
//! compiled into the binary, and [`DiskFs`], the filesystem rooted at the
//! resolved work dir.

use globset::{GlobBuilder, GlobMatcher};
use std::io;

pub mod disk;
pub mod embedded;

pub use disk::DiskFs;
pub use embedded::EmbeddedFs;

/// A read-only file tree that supports glob expansion.
///
/// Paths are `/`-separated strings as returned by [`FileSource::glob`].
pub trait FileSource {
    /// Short label used in log output (e.g. `embedded`, `disk`).
    fn label(&self) -> &str;

    /// Expand `pattern` into the sorted list of matching file paths.
    ///
    /// `*` and `?` never match `/`; `**` spans directories.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, globset::Error>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;
}

/// Compile a pattern with path-aware `*` semantics.
pub(crate) fn compile_pattern(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern).literal_separator(true).build()?.compile_matcher())
}
