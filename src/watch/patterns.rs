// src/watch/patterns.rs

//! Pattern resolution: glob or literal path -> watch root, matcher and the
//! list of files that currently match.
//!
//! Patterns are written relative to the engine's working directory (or as
//! absolute paths) using `/` as separator. A pattern containing any of
//! [`GLOB_METACHARS`] is a glob; everything else is a literal path.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::{Result, RulewatchError};
use crate::fs::FileSystem;
use crate::watch::path_utils::{absolutize, to_slash};

/// Characters that turn a pattern into a glob.
pub const GLOB_METACHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// True if the pattern contains glob metacharacters.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(GLOB_METACHARS)
}

/// Split a glob into its literal leading segments and the remainder,
/// starting at the first segment that contains a wildcard.
fn split_glob(pattern: &str) -> (PathBuf, String) {
    let slashed = pattern.replace('\\', "/");
    let segments: Vec<&str> = slashed.split('/').collect();

    let mut prefix = PathBuf::new();
    let mut first_wild = segments.len();
    for (i, segment) in segments.iter().enumerate() {
        if has_wildcard(segment) {
            first_wild = i;
            break;
        }
        if i == 0 && segment.is_empty() {
            prefix.push("/");
        } else if !segment.is_empty() {
            prefix.push(segment);
        }
    }

    (prefix, segments[first_wild..].join("/"))
}

/// Directory (or file) to watch so that every path the pattern can match is
/// observed, including files created later.
///
/// - literal pattern: its own absolute path
/// - glob: the nearest ancestor without wildcards (the glob parent)
pub fn watch_root_of(pattern: &str, cwd: &Path) -> PathBuf {
    if !has_wildcard(pattern) {
        return absolutize(cwd, Path::new(pattern));
    }
    let (prefix, _) = split_glob(pattern);
    absolutize(cwd, &prefix)
}

/// Compiled predicate for a single pattern.
///
/// Candidates passed to [`Matcher::matches`] must already be absolute; use
/// [`ResolvedWatch::matches`] for relative input.
#[derive(Clone)]
pub enum Matcher {
    Glob { pattern: String, matcher: GlobMatcher },
    Literal(PathBuf),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Glob { pattern, .. } => f.debug_tuple("Glob").field(pattern).finish(),
            Matcher::Literal(path) => f.debug_tuple("Literal").field(path).finish(),
        }
    }
}

impl Matcher {
    pub fn matches(&self, abs_path: &Path) -> bool {
        match self {
            Matcher::Glob { matcher, .. } => matcher.is_match(to_slash(abs_path)),
            Matcher::Literal(expected) => expected == abs_path,
        }
    }
}

/// Build the matcher for one pattern.
///
/// Globs are anchored at their absolute glob parent, match case-insensitively
/// and match dotfiles. `*` stays within one path segment; `**` crosses
/// directories.
pub fn matcher_for(pattern: &str, cwd: &Path) -> Result<Matcher> {
    if !has_wildcard(pattern) {
        return Ok(Matcher::Literal(absolutize(cwd, Path::new(pattern))));
    }

    let (prefix, rest) = split_glob(pattern);
    let root = to_slash(&absolutize(cwd, &prefix));
    let mut anchored = globset::escape(&root);
    if !anchored.ends_with('/') {
        anchored.push('/');
    }
    anchored.push_str(&rest);

    let matcher = GlobBuilder::new(&anchored)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|source| RulewatchError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    Ok(Matcher::Glob {
        pattern: pattern.to_string(),
        matcher,
    })
}

/// Enumerate what the pattern matches right now.
///
/// - literal pattern: exactly its absolute path, whether or not it exists
/// - glob: every existing non-directory file under the glob parent that
///   matches, sorted
pub fn expand(pattern: &str, cwd: &Path, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
    if !has_wildcard(pattern) {
        return Ok(vec![absolutize(cwd, Path::new(pattern))]);
    }

    let matcher = matcher_for(pattern, cwd)?;
    let root = watch_root_of(pattern, cwd);
    if !fs.is_dir(&root) {
        debug!(pattern, root = ?root, "glob parent does not exist; nothing to expand");
        return Ok(Vec::new());
    }

    let mut files = collect_matching_files(fs, &root, &matcher)?;
    files.sort();
    Ok(files)
}

/// Walk `root` and collect files accepted by `matcher`.
///
/// Symlinked subdirectories are not descended into, so link cycles cannot
/// repeat files. Unreadable subdirectories are skipped; failing to read
/// `root` itself is an error.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &Matcher,
) -> AnyResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir == root => return Err(err),
            Err(err) => {
                debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                continue;
            }
        };
        for path in entries {
            if fs.is_dir(&path) {
                if fs.is_symlink(&path) {
                    debug!(dir = ?path, "not following symlinked directory");
                    continue;
                }
                stack.push(path);
            } else if fs.is_file(&path) && matcher.matches(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Where to place an OS-level watch for one resolved root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub recursive: bool,
}

/// Watch roots and matchers derived from one rule's patterns.
#[derive(Debug, Clone)]
pub struct ResolvedWatch {
    cwd: PathBuf,
    roots: Vec<PathBuf>,
    /// Parallel to `roots`: the root is a glob parent, so it can only ever be
    /// a directory.
    glob_roots: Vec<bool>,
    matchers: Vec<Matcher>,
}

impl ResolvedWatch {
    /// Resolve every pattern; an invalid glob fails the whole rule.
    pub fn resolve<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> Result<Self> {
        let mut roots: Vec<PathBuf> = Vec::new();
        let mut glob_roots: Vec<bool> = Vec::new();
        let mut matchers = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref();
            matchers.push(matcher_for(pattern, cwd)?);
            let root = watch_root_of(pattern, cwd);
            let is_glob = has_wildcard(pattern);
            match roots.iter().position(|r| *r == root) {
                Some(idx) => glob_roots[idx] |= is_glob,
                None => {
                    roots.push(root);
                    glob_roots.push(is_glob);
                }
            }
        }

        Ok(Self {
            cwd: cwd.to_path_buf(),
            roots,
            glob_roots,
            matchers,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// True if at least one pattern accepts `path` (relative paths are
    /// resolved against the working directory first).
    pub fn matches(&self, path: &Path) -> bool {
        let abs = absolutize(&self.cwd, path);
        self.matchers.iter().any(|m| m.matches(&abs))
    }

    /// OS watch placements covering every root.
    ///
    /// notify cannot watch a path that does not exist, and a watch on a single
    /// file is lost when editors replace it, so:
    /// - existing directory: watched recursively
    /// - existing file: its parent, non-recursively
    /// - missing glob parent: nearest existing ancestor, recursively
    /// - missing literal path: nearest existing ancestor, recursively unless
    ///   it is the direct parent
    ///
    /// Targets already covered by a recursive ancestor target are dropped.
    pub fn subscription_targets(&self, fs: &dyn FileSystem) -> Vec<WatchTarget> {
        let mut targets: Vec<WatchTarget> = Vec::new();
        for (root, &glob_root) in self.roots.iter().zip(&self.glob_roots) {
            let target = target_for_root(fs, root, glob_root);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        let all = targets.clone();
        targets.retain(|t| {
            !all.iter().any(|other| {
                other != t
                    && other.recursive
                    && t.path.starts_with(&other.path)
                    && (other.path != t.path || !t.recursive)
            })
        });
        targets
    }
}

fn target_for_root(fs: &dyn FileSystem, root: &Path, glob_root: bool) -> WatchTarget {
    if fs.is_dir(root) {
        return WatchTarget {
            path: root.to_path_buf(),
            recursive: true,
        };
    }
    if fs.is_file(root) {
        let parent = root.parent().unwrap_or(root);
        return WatchTarget {
            path: parent.to_path_buf(),
            recursive: false,
        };
    }

    let mut depth = 0;
    let mut current = root;
    while let Some(parent) = current.parent() {
        depth += 1;
        if fs.is_dir(parent) {
            return WatchTarget {
                path: parent.to_path_buf(),
                recursive: glob_root || depth > 1,
            };
        }
        current = parent;
    }

    WatchTarget {
        path: root.to_path_buf(),
        recursive: true,
    }
}
