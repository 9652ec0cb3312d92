//! Tree walking and relative path utilities.

use std::fs;
use std::io;
use std::path::{Component, Path};

/// Counters collected during a tree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files: usize,
    pub dirs: usize,
    pub errors: usize,
}

/// Converts an absolute path under `root` to the slash-separated key used by
/// the index.
///
/// Returns `None` for the root itself and for paths outside it.
pub fn relative_asset_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Walks `root` recursively, calling `visit` for every entry including the
/// root itself. The boolean passed to `visit` is true for directories.
///
/// Symlinks are reported as non-directories and never followed. Unreadable
/// subdirectories are counted in `WalkStats::errors` and skipped; only a
/// failure to read the root aborts the walk.
pub fn walk_tree(root: &Path, visit: &mut dyn FnMut(&Path, bool)) -> io::Result<WalkStats> {
    let mut stats = WalkStats::default();
    visit(root, true);
    stats.dirs += 1;

    let entries = fs::read_dir(root)?;
    walk_entries(entries, visit, &mut stats);
    Ok(stats)
}

fn walk_entries(entries: fs::ReadDir, visit: &mut dyn FnMut(&Path, bool), stats: &mut WalkStats) {
    // Sort children so walks are deterministic
    let mut children: Vec<_> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                log::debug!("skipping unreadable directory entry: {error}");
                stats.errors += 1;
                None
            }
        })
        .collect();
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let path = child.path();
        let is_dir = child
            .file_type()
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);

        visit(&path, is_dir);
        if !is_dir {
            stats.files += 1;
            continue;
        }

        stats.dirs += 1;
        match fs::read_dir(&path) {
            Ok(entries) => walk_entries(entries, visit, stats),
            Err(error) => {
                log::warn!("unable to read directory {}: {error}", path.display());
                stats.errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn relative_key_uses_forward_slashes() {
        let root = PathBuf::from("/srv/assets");
        let path = root.join("css").join("site.css");
        assert_eq!(
            relative_asset_key(&root, &path),
            Some("css/site.css".to_string())
        );
    }

    #[test]
    fn relative_key_rejects_root_and_outside_paths() {
        let root = PathBuf::from("/srv/assets");
        assert_eq!(relative_asset_key(&root, &root), None);
        assert_eq!(relative_asset_key(&root, Path::new("/srv/other/a")), None);
        assert_eq!(
            relative_asset_key(&root, Path::new("/srv/assets-old/a")),
            None
        );
    }

    #[test]
    fn walk_visits_root_dirs_and_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a"), b"a").expect("write a");
        fs::create_dir(dir.path().join("b")).expect("mkdir b");
        fs::write(dir.path().join("b").join("c"), b"c").expect("write c");

        let mut seen = Vec::new();
        let stats = walk_tree(dir.path(), &mut |path: &Path, is_dir: bool| {
            seen.push((relative_asset_key(dir.path(), path), is_dir));
        })
        .expect("walk");

        assert_eq!(
            seen,
            vec![
                (None, true),
                (Some("a".to_string()), false),
                (Some("b".to_string()), true),
                (Some("b/c".to_string()), false),
            ]
        );
        assert_eq!(stats.files, 2);
        assert_eq!(stats.dirs, 2);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn walk_fails_when_root_is_missing() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing");
        let result = walk_tree(&missing, &mut |_: &Path, _: bool| {});
        assert!(result.is_err());
    }
}
