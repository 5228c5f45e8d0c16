use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::common::error::SyncError;
use crate::common::result::SyncReposResult;
use crate::domain::value_objects::ScmType;

/// A working copy found on disk, before its remotes are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRepository {
    pub path: PathBuf,
    pub datadir: PathBuf,
    pub kind: ScmType,
}

/// Find every Git and Subversion working copy under `root`.
///
/// Metadata directories themselves are never descended into. A `.git`
/// that is a symbolic link (a relocated data directory) is skipped, as is a
/// `.git` file. Results come in path order.
pub fn discover_repositories(root: &Path) -> SyncReposResult<Vec<DiscoveredRepository>> {
    if !root.is_dir() {
        return Err(SyncError::config_error(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }

    let mut found = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        let Some(kind) = entry.file_name().to_str().and_then(ScmType::from_metadata_dir) else {
            continue;
        };
        let Some(parent) = entry.path().parent() else {
            continue;
        };

        if entry.path_is_symlink() {
            info!(
                "{} is a symbolic link - skipping relocated working copy",
                entry.path().display()
            );
            continue;
        }
        if !entry.file_type().is_dir() {
            continue;
        }

        walker.skip_current_dir();
        debug!("Found {} working copy at {}", kind, parent.display());
        found.push(DiscoveredRepository {
            path: parent.to_path_buf(),
            datadir: entry.path().to_path_buf(),
            kind,
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discovers_nested_working_copies() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/.git/objects")).unwrap();
        fs::create_dir_all(root.join("a/vendor/lib/.git")).unwrap();
        fs::create_dir_all(root.join("b/.svn")).unwrap();
        fs::create_dir_all(root.join("c/src")).unwrap();

        let found = discover_repositories(root).unwrap();
        let summary: Vec<(PathBuf, ScmType)> =
            found.iter().map(|r| (r.path.clone(), r.kind)).collect();

        assert_eq!(
            summary,
            vec![
                (root.join("a"), ScmType::Git),
                (root.join("a/vendor/lib"), ScmType::Git),
                (root.join("b"), ScmType::Svn),
            ]
        );
        assert_eq!(found[0].datadir, root.join("a/.git"));
    }

    #[test]
    fn test_gitfile_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("worktree")).unwrap();
        fs::write(temp.path().join("worktree/.git"), "gitdir: /elsewhere").unwrap();

        assert!(discover_repositories(temp.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_metadata_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("store/data")).unwrap();
        fs::create_dir_all(temp.path().join("module")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("store/data"), temp.path().join("module/.git"))
            .unwrap();

        assert!(discover_repositories(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            discover_repositories(&file),
            Err(SyncError::ConfigError { .. })
        ));
    }
}
