//! File-set scanning and denylist filtering.
//!
//! A file set is produced by expanding a glob (with `**` recursion) and then
//! dropping every file whose extension or full path is denylisted. Both
//! comparisons are case-insensitive and full paths are compared in a
//! slash-normalised form, so the same denylist behaves identically on every
//! platform.

use glob::{glob_with, MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::DeployError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// `path` without its `.` components. `glob` drops a leading `./` from the
/// paths it yields, so anything compared against a scan result goes through
/// here first.
pub fn clean_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Lowercase, forward-slash form of a path used for denylist comparison.
pub fn normalize_path(path: &Path) -> String {
    clean_path(path)
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
}

/// Builds a glob pattern for `tail` under `dir`, escaping any glob
/// metacharacters that happen to appear in the directory name.
pub fn pattern_under(dir: &Path, tail: &str) -> String {
    let dir = clean_path(dir);
    if dir.as_os_str().is_empty() {
        return tail.to_string();
    }
    let dir = Pattern::escape(&dir.to_string_lossy().replace('\\', "/"));
    format!("{}/{}", dir.trim_end_matches('/'), tail)
}

/// Case-insensitive substring test used for name-based exclusions.
pub fn contains_any(name: &str, patterns: &[&str]) -> bool {
    let name = name.to_lowercase();
    patterns.iter().any(|p| name.contains(&p.to_lowercase()))
}

/// Expands `pattern` to the regular files it matches.
pub fn scan(pattern: &str) -> Result<BTreeSet<PathBuf>, DeployError> {
    let entries = glob_with(pattern, MATCH_OPTIONS).map_err(|source| DeployError::Glob {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut files = BTreeSet::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(DeployError::io(path, std::io::Error::from(e)));
            }
        };
        if path.is_file() {
            files.insert(path);
        }
    }
    debug!(pattern, count = files.len(), "Scanned file set");
    Ok(files)
}

/// Expands `pattern` to matching directories.
pub fn scan_dirs(pattern: &str) -> Result<BTreeSet<PathBuf>, DeployError> {
    let entries = glob_with(pattern, MATCH_OPTIONS).map_err(|source| DeployError::Glob {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut dirs = BTreeSet::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_dir() => {
                dirs.insert(path);
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(DeployError::io(path, std::io::Error::from(e)));
            }
        }
    }
    Ok(dirs)
}

/// Drops denylisted entries from an existing set of paths.
///
/// `excluded_extensions` are written with their leading dot (`.dll`); a
/// missing dot is tolerated. `excluded_full_paths` are compared after
/// [`normalize_path`].
pub fn filter_paths<I, S, P>(
    paths: I,
    excluded_extensions: &[S],
    excluded_full_paths: &[P],
) -> BTreeSet<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let extensions: BTreeSet<String> = excluded_extensions
        .iter()
        .map(|e| {
            let e = e.as_ref().to_lowercase();
            if e.starts_with('.') {
                e
            } else {
                format!(".{e}")
            }
        })
        .collect();
    let full_paths: BTreeSet<String> = excluded_full_paths
        .iter()
        .map(|p| normalize_path(p.as_ref()))
        .collect();

    paths
        .into_iter()
        .filter(|path| {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));
            if extension.is_some_and(|e| extensions.contains(&e)) {
                return false;
            }
            !full_paths.contains(&normalize_path(path))
        })
        .collect()
}

/// Scans `source_glob` and filters the result against both denylists.
pub fn filter<S, P>(
    source_glob: &str,
    excluded_extensions: &[S],
    excluded_full_paths: &[P],
) -> Result<BTreeSet<PathBuf>, DeployError>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let scanned = scan(source_glob)?;
    let total = scanned.len();
    let kept = filter_paths(scanned, excluded_extensions, excluded_full_paths);
    debug!(
        source_glob,
        total,
        kept = kept.len(),
        "Filtered file set against denylists"
    );
    Ok(kept)
}
