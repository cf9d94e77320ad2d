//! General utility functions for gcpstudio
//!
//! This module contains common helper functions used across the library.

use anyhow::Context;
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// Format a file size in human-readable form (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Create a glob matcher from a pattern string
///
/// Plain text without wildcards becomes `*text*` (substring search).
pub fn create_glob_matcher(pattern: &str) -> anyhow::Result<GlobMatcher> {
    let pattern = if !pattern.contains('*') && !pattern.contains('?') {
        format!("*{}*", pattern)
    } else {
        pattern.to_string()
    };

    let glob = Glob::new(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// Check if a name matches the optional filter
pub fn matches_filter(name: &str, matcher: Option<&GlobMatcher>) -> bool {
    match matcher {
        Some(m) => m.is_match(name),
        None => true,
    }
}

/// List regular files directly inside `dir`, sorted by name
///
/// A missing directory yields an empty list. Subdirectories are skipped with
/// a warning; packs only hold flat category directories.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();
            if path.is_file() {
                files.push(path);
            } else if path.is_dir() {
                warn!("Skipping nested directory {}", path.display());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively copy a directory tree
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).map_err(|e| Error::io(&target, e))?;
        }
    }
    Ok(())
}

/// Replace the extension of `path` in place on disk and return the new path
pub fn rename_extension(path: &Path, ext: &str) -> Result<PathBuf> {
    let new_path = path.with_extension(ext);
    fs::rename(path, &new_path).map_err(|e| Error::io(path, e))?;
    Ok(new_path)
}

/// Extension of a path as a `&str`, if any
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_glob_matcher_substring() {
        let m = create_glob_matcher("d1").unwrap();
        assert!(matches_filter("deck/d1.gcd", Some(&m)));
        assert!(!matches_filter("deck/d2.gcd", Some(&m)));
        assert!(matches_filter("anything", None));
    }

    #[test]
    fn test_list_files_sorted_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.png"), b"b").unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        assert!(list_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("deck")).unwrap();
        fs::write(src.path().join("deck/d1.json"), b"{}").unwrap();
        fs::write(src.path().join("info.json"), b"{}").unwrap();

        let target = dst.path().join("copy");
        copy_dir_recursive(src.path(), &target).unwrap();
        assert!(target.join("deck/d1.json").is_file());
        assert!(target.join("info.json").is_file());
    }

    #[test]
    fn test_rename_extension_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.json");
        match rename_extension(&missing, "gcd").unwrap_err() {
            Error::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
