use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;

/// A candidate source file found under a scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub absolute_path: PathBuf,

    /// `/`-separated path relative to the scan root
    pub relative_path: String,
}

/// Walks a directory tree yielding PHP files outside dependency and test folders
pub struct SourceEnumerator {
    extensions: HashSet<String>,
    excluded_dirs: HashSet<String>,
}

impl SourceEnumerator {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extensions: config.extensions.iter().cloned().collect(),
            excluded_dirs: config
                .dependency_dirs
                .iter()
                .chain(config.test_dirs.iter())
                .cloned()
                .collect(),
        }
    }

    /// Lazily walk `root`. Each call starts a fresh walk.
    ///
    /// Unreadable subtrees are logged and skipped.
    pub fn enumerate<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = SourceFile> + 'a {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded_dir(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!("Skipping unreadable path {}: {}", path, e);
                    None
                }
            })
            .filter(move |entry| {
                entry.file_type().is_file() && self.has_source_extension(entry.path())
            })
            .filter_map(move |entry| {
                let relative = entry.path().strip_prefix(root).ok()?;
                Some(SourceFile {
                    relative_path: to_slash_path(relative),
                    absolute_path: entry.into_path(),
                })
            })
    }

    /// Excluded names match whole directory segments below the root only
    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excluded_dirs.contains(name))
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext))
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use assert_fs::prelude::*;

    fn relative_paths(root: &Path) -> Vec<String> {
        let config = Config::default();
        let enumerator = SourceEnumerator::new(&config.scan);
        enumerator.enumerate(root).map(|f| f.relative_path).collect()
    }

    #[test]
    fn test_yields_php_files_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("plugin.php").write_str("<?php").unwrap();
        temp.child("readme.txt").write_str("hi").unwrap();
        temp.child("includes/class-a.php").write_str("<?php").unwrap();
        temp.child("assets/app.js").write_str("").unwrap();

        assert_eq!(
            relative_paths(temp.path()),
            vec!["includes/class-a.php", "plugin.php"]
        );
    }

    #[test]
    fn test_excludes_dependency_and_test_segments() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("vendor/autoload.php").write_str("<?php").unwrap();
        temp.child("tests/bootstrap.php").write_str("<?php").unwrap();
        temp.child("lib/test/helper.php").write_str("<?php").unwrap();
        temp.child("lib/core.php").write_str("<?php").unwrap();

        assert_eq!(relative_paths(temp.path()), vec!["lib/core.php"]);
    }

    #[test]
    fn test_exclusion_matches_whole_segments_not_substrings() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("testimonials/widget.php").write_str("<?php").unwrap();
        temp.child("vendors-admin/page.php").write_str("<?php").unwrap();
        temp.child("test.php").write_str("<?php").unwrap();

        assert_eq!(
            relative_paths(temp.path()),
            vec!["test.php", "testimonials/widget.php", "vendors-admin/page.php"]
        );
    }

    #[test]
    fn test_root_named_like_excluded_dir_is_still_scanned() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("tests/suite.php").write_str("<?php").unwrap();

        assert_eq!(relative_paths(&temp.path().join("tests")), vec!["suite.php"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subtree_is_skipped() {
        use std::fs::{self, Permissions};
        use std::os::unix::fs::PermissionsExt;

        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.php").write_str("<?php").unwrap();
        temp.child("locked/hidden.php").write_str("<?php").unwrap();
        temp.child("z/after.php").write_str("<?php").unwrap();

        let locked = temp.path().join("locked");
        fs::set_permissions(&locked, Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory anyway
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let paths = relative_paths(temp.path());
        fs::set_permissions(&locked, Permissions::from_mode(0o755)).unwrap();

        assert_eq!(paths, vec!["a.php", "z/after.php"]);
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.php").write_str("<?php").unwrap();

        let config = Config::default();
        let enumerator = SourceEnumerator::new(&config.scan);
        assert_eq!(enumerator.enumerate(temp.path()).count(), 1);
        assert_eq!(enumerator.enumerate(temp.path()).count(), 1);
    }
}
