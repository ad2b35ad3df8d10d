//! Path normalization and work dir resolution

use std::path::PathBuf;

pub fn normalize_path(path: &str) -> String {
    // Convert backslashes to forward slashes and drop a leading "./"
    let path = path.replace('\\', "/");
    match path.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Resolve the base directory used to locate on-disk override files.
///
/// Prefers the directory containing the current executable, then the user's
/// home directory, then `.`. The result is not checked for existence.
pub fn resolve_work_dir() -> PathBuf {
    if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(PathBuf::from)) {
        return dir;
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
