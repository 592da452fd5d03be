//! File collection & exclusion (spec §2 component 2, §6, §9).
//!
//! Walks a root directory and filters by the fixed exclusion semantics:
//! exact match, single-segment `*` glob, and the narrow `prefix/**` suffix
//! form (matches `prefix` itself and everything below it).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recursively collect file paths under `root`, honouring `exclude_patterns`.
///
/// Returned paths are relative to `root`, sorted for deterministic
/// downstream ordering (scanners emit findings in file-walk order, spec §5).
#[must_use]
pub fn collect_files(root: &Path, exclude_patterns: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|rel| !is_excluded(rel, exclude_patterns))
        .collect();

    files.sort();
    files
}

/// Test a single relative path against the exclusion pattern list.
#[must_use]
pub fn is_excluded(rel_path: &Path, patterns: &[String]) -> bool {
    let path_str = normalize(rel_path);
    patterns.iter().any(|pattern| matches_pattern(&path_str, pattern))
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn matches_pattern(path_str: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/**") {
        return path_str == prefix || path_str.starts_with(&format!("{prefix}/"));
    }

    if pattern == "**" {
        return true;
    }

    if pattern == path_str {
        return true;
    }

    // Single-segment `*` glob: match the whole path with the host's glob
    // semantics (no implicit path-separator crossing for a bare `*`).
    glob::Pattern::new(pattern)
        .map(|p| p.matches(path_str))
        .unwrap_or(false)
}

/// Like [`collect_files`], but surfaces a failure to even start the walk
/// (missing or unreadable `root`) instead of silently returning an empty
/// list. Per-entry errors deeper in the tree are still skipped, matching the
/// "per-file I/O failure" recovery semantics scanners use (spec §7.2); only
/// the root entry itself is treated as fatal, since the prioritiser's own
/// failure mode is "could not walk the tree at all" (spec §7.5), not
/// "one file among many was unreadable".
pub fn collect_files_checked(root: &Path, exclude_patterns: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(root).follow_links(false).into_iter();
    let mut files = Vec::new();

    match walker.next() {
        Some(Err(err)) => return Err(err.into()),
        Some(Ok(entry)) => push_if_included(&mut files, &entry, root, exclude_patterns),
        None => {}
    }

    for entry in walker.filter_map(std::result::Result::ok) {
        push_if_included(&mut files, &entry, root, exclude_patterns);
    }

    files.sort();
    Ok(files)
}

fn push_if_included(files: &mut Vec<PathBuf>, entry: &walkdir::DirEntry, root: &Path, exclude_patterns: &[String]) {
    if !entry.file_type().is_file() {
        return;
    }
    let Ok(rel) = entry.path().strip_prefix(root) else {
        return;
    };
    if !is_excluded(rel, exclude_patterns) {
        files.push(rel.to_path_buf());
    }
}

/// Merge caller-supplied and engine-level exclude patterns, caller first
/// (spec §4.5 step 2: "append-only; caller's list comes first").
#[must_use]
pub fn merge_excludes(target_patterns: &[String], engine_patterns: &[String]) -> Vec<String> {
    let mut merged = target_patterns.to_vec();
    merged.extend(engine_patterns.iter().cloned());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn exact_match_excludes() {
        assert!(is_excluded(Path::new("secrets.env"), &["secrets.env".to_string()]));
        assert!(!is_excluded(Path::new("other.env"), &["secrets.env".to_string()]));
    }

    #[test]
    fn single_segment_glob_does_not_cross_separators() {
        let patterns = vec!["*.log".to_string()];
        assert!(is_excluded(Path::new("app.log"), &patterns));
        assert!(!is_excluded(Path::new("nested/app.log"), &patterns));
    }

    #[test]
    fn double_star_suffix_matches_prefix_and_everything_below() {
        let patterns = vec!["node_modules/**".to_string()];
        assert!(is_excluded(Path::new("node_modules"), &patterns));
        assert!(is_excluded(Path::new("node_modules/foo/bar.js"), &patterns));
        assert!(!is_excluded(Path::new("src/node_modules_helper.js"), &patterns));
    }

    #[test]
    fn merge_excludes_preserves_caller_first_order() {
        let merged = merge_excludes(
            &["a".to_string(), "b".to_string()],
            &["c".to_string()],
        );
        assert_eq!(merged, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn collect_files_checked_errors_on_missing_root() {
        let missing = Path::new("/nonexistent/definitely-not-here-xyz");
        assert!(collect_files_checked(missing, &[]).is_err());
    }

    #[test]
    fn collect_files_checked_matches_collect_files_on_success() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        let checked = collect_files_checked(dir.path(), &[]).unwrap();
        let plain = collect_files(dir.path(), &[]);
        assert_eq!(checked, plain);
    }

    #[test]
    fn collect_files_walks_and_sorts_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/c.rs"), "fn main() {}").unwrap();

        let files = collect_files(dir.path(), &["vendor/**".to_string()]);
        assert_eq!(files, vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]);
    }
}
