// src/watch/path_utils.rs

//! Utility functions for path handling in the resolver and watcher.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `cwd` and normalize it lexically.
///
/// Relative paths are joined onto `cwd`; absolute paths are kept. No
/// filesystem access happens here, so the result is stable for paths that do
/// not exist yet (a literal watch target is allowed to be missing).
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding normal component.
///
/// `..` above the root is discarded, the same way the OS treats `/..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a path with forward slashes, which is what glob matching expects.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
