//! Filesystem source rooted at the work dir

use super::{compile_pattern, FileSource};
use crate::utils::normalize_path;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// On-disk file tree.
///
/// Relative paths and patterns resolve against `root`; absolute ones are used
/// as-is, so callers may point a search pattern anywhere on the host.
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Split a pattern into its literal directory prefix and the walk depth
/// needed below it (`None` when `**` makes the depth unbounded).
fn literal_base(pattern: &str) -> (String, Option<usize>) {
    let parts: Vec<&str> = pattern.split('/').collect();
    let split = parts.iter().position(|p| p.contains(GLOB_META)).unwrap_or(parts.len());
    let rest = &parts[split..];
    let depth = if rest.iter().any(|p| p.contains("**")) { None } else { Some(rest.len()) };

    let base = parts[..split].join("/");
    if base.is_empty() && pattern.starts_with('/') {
        return ("/".to_string(), depth);
    }
    (base, depth)
}

impl FileSource for DiskFs {
    fn label(&self) -> &str {
        "disk"
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, globset::Error> {
        let pattern = normalize_path(pattern);
        let matcher = compile_pattern(&pattern)?;
        let absolute = Path::new(&pattern).is_absolute();

        let (base, depth) = literal_base(&pattern);
        let start = self.resolve(&base);
        if !start.exists() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(&start).follow_links(true);
        if let Some(depth) = depth {
            walker = walker.max_depth(depth);
        }

        let mut matches = Vec::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let candidate = if absolute {
                entry.path().to_path_buf()
            } else {
                match entry.path().strip_prefix(&self.root) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => continue,
                }
            };
            let candidate = normalize_path(&candidate.to_string_lossy());
            if matcher.is_match(&candidate) {
                matches.push(candidate);
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let tmp = TempDir::new().expect("tmp");
        let params = tmp.path().join("params");
        fs::create_dir_all(params.join("nested")).expect("mkdir");
        fs::write(params.join("z.toml"), "z = 1").expect("write");
        fs::write(params.join("a.toml"), "a = 1").expect("write");
        fs::write(params.join(".env"), "A=1").expect("write");
        fs::write(params.join("nested/deep.toml"), "d = 1").expect("write");
        tmp
    }

    #[test]
    fn literal_base_stops_at_first_glob_component() {
        assert_eq!(literal_base("params/*"), ("params".to_string(), Some(1)));
        assert_eq!(literal_base("params/**/*.toml"), ("params".to_string(), None));
        assert_eq!(literal_base("params/.env"), ("params/.env".to_string(), Some(0)));
        assert_eq!(literal_base("/*.toml"), ("/".to_string(), Some(1)));
    }

    #[test]
    fn glob_relative_pattern_returns_sorted_files_only() {
        let tmp = tree();
        let fs = DiskFs::new(tmp.path());
        let matches = fs.glob("params/*.toml").expect("glob");
        assert_eq!(matches, vec!["params/a.toml", "params/z.toml"]);

        let all = fs.glob("params/*").expect("glob");
        assert_eq!(all, vec!["params/.env", "params/a.toml", "params/z.toml"]);
    }

    #[test]
    fn glob_double_star_descends() {
        let tmp = tree();
        let matches = DiskFs::new(tmp.path()).glob("params/**/*.toml").expect("glob");
        assert!(matches.contains(&"params/nested/deep.toml".to_string()));
    }

    #[test]
    fn glob_absolute_pattern_returns_absolute_paths() {
        let tmp = tree();
        let pattern = format!("{}/params/a.*", normalize_path(&tmp.path().to_string_lossy()));
        let matches = DiskFs::new("/nonexistent-root").glob(&pattern).expect("glob");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ends_with("params/a.toml"));
        assert!(Path::new(&matches[0]).is_absolute());
    }

    #[test]
    fn glob_missing_directory_is_empty() {
        let tmp = TempDir::new().expect("tmp");
        let matches = DiskFs::new(tmp.path()).glob("params/*").expect("glob");
        assert!(matches.is_empty());
    }

    #[test]
    fn exists_only_for_regular_files() {
        let tmp = tree();
        let fs = DiskFs::new(tmp.path());
        assert!(fs.exists("params/.env"));
        assert!(!fs.exists("params"));
        assert!(!fs.exists("params/missing.toml"));
        assert_eq!(fs.read("params/a.toml").expect("read"), b"a = 1");
    }
}
