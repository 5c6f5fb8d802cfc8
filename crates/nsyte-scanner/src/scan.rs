//! Local File Scanner — spec 4.A.

use std::path::Path;

use anyhow::{Context, Result};
use nsyte_types::{content_type_for_path, FileEntry};

/// The ignore-rule matcher is an external collaborator (spec §1): the
/// real implementation reads `.nsyteignore`/`.gitignore`-style files and
/// is out of scope here. This trait is the narrow interface the scanner
/// consumes, so tests can substitute a trivial closure-backed matcher.
pub trait IgnoreMatcher {
    /// Whether `path` (POSIX-style, leading `/`) should be excluded.
    /// Called once with the bare path for files, and once with a
    /// trailing `/` appended for directories, so directory-prefix rules
    /// match (spec 4.A: "as-file and, for directories, with trailing
    /// slash").
    fn is_ignored(&self, path: &str) -> bool;
}

impl<F: Fn(&str) -> bool> IgnoreMatcher for F {
    fn is_ignored(&self, path: &str) -> bool {
        self(path)
    }
}

/// A matcher that never excludes anything, for callers with no ignore
/// rules configured.
pub struct NoopMatcher;

impl IgnoreMatcher for NoopMatcher {
    fn is_ignored(&self, _path: &str) -> bool {
        false
    }
}

/// Result of one scan: the entries to include, and the paths that were
/// excluded by the ignore matcher (both sorted by path).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub included: Vec<FileEntry>,
    pub ignored: Vec<String>,
}

/// Walk `root` depth-first, normalize every candidate path to
/// POSIX-with-leading-slash, and classify it via `matcher`. No digests
/// are computed here (spec 4.A); content type is derived from extension.
///
/// Fails only if `root` itself, or a directory found while walking, is
/// unreadable.
pub fn scan(root: &Path, matcher: &impl IgnoreMatcher) -> Result<ScanResult> {
    let mut included = Vec::new();
    let mut ignored = Vec::new();

    walk(root, root, matcher, &mut included, &mut ignored)?;

    included.sort_by(|a, b| a.path.cmp(&b.path));
    ignored.sort();

    Ok(ScanResult { included, ignored })
}

fn walk(
    root: &Path,
    dir: &Path,
    matcher: &impl IgnoreMatcher,
    included: &mut Vec<FileEntry>,
    ignored: &mut Vec<String>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let site_path = to_site_path(root, &path);
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", path.display()))?;

        if file_type.is_dir() {
            let dir_probe = format!("{site_path}/");
            if matcher.is_ignored(&site_path) || matcher.is_ignored(&dir_probe) {
                ignored.push(site_path);
                continue;
            }
            walk(root, &path, matcher, included, ignored)?;
        } else if file_type.is_file() {
            if matcher.is_ignored(&site_path) {
                ignored.push(site_path);
                continue;
            }
            let content_type = content_type_for_path(&site_path).to_string();
            included.push(FileEntry::from_scan(site_path, content_type));
        }
        // Symlinks and other file types are neither files nor directories
        // here and are silently skipped: the spec names no behavior for
        // them.
    }

    Ok(())
}

/// Normalize a filesystem path under `root` to a POSIX-style,
/// leading-slash site path.
fn to_site_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let posix = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{posix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scans_nested_files_sorted_by_path() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        fs::write(dir.path().join("assets/style.css"), b"body{}").unwrap();

        let result = scan(dir.path(), &NoopMatcher).expect("scan");
        let paths: Vec<&str> = result.included.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/assets/style.css", "/index.html"]);
        assert!(result.ignored.is_empty());
    }

    #[test]
    fn content_type_is_derived_from_extension() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("app.js"), b"console.log(1)").unwrap();

        let result = scan(dir.path(), &NoopMatcher).expect("scan");
        assert_eq!(result.included[0].content_type, "application/javascript");
        assert!(result.included[0].digest.is_none());
        assert!(result.included[0].size.is_none());
    }

    #[test]
    fn ignore_matcher_excludes_matched_files_and_dirs() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/dep.js"), b"x").unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        fs::write(dir.path().join(".secret"), b"shh").unwrap();

        let matcher = |path: &str| path.starts_with("/node_modules/") || path == "/.secret";
        let result = scan(dir.path(), &matcher).expect("scan");

        let paths: Vec<&str> = result.included.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/index.html"]);
        assert!(result.ignored.contains(&"/node_modules".to_string()));
        assert!(result.ignored.contains(&"/.secret".to_string()));
    }

    #[test]
    fn ignored_directory_prunes_descent() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("build/nested")).unwrap();
        fs::write(dir.path().join("build/nested/deep.txt"), b"x").unwrap();

        let matcher = |path: &str| path == "/build/";
        let result = scan(dir.path(), &matcher).expect("scan");
        assert!(result.included.is_empty());
        assert_eq!(result.ignored, vec!["/build".to_string()]);
    }

    #[test]
    fn bare_name_directory_rule_also_prunes_descent() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("build/nested")).unwrap();
        fs::write(dir.path().join("build/nested/deep.txt"), b"x").unwrap();

        let matcher = |path: &str| path == "/build";
        let result = scan(dir.path(), &matcher).expect("scan");
        assert!(result.included.is_empty());
        assert_eq!(result.ignored, vec!["/build".to_string()]);
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist");
        assert!(scan(&missing, &NoopMatcher).is_err());
    }
}
