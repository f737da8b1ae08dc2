// src/watch/patterns.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

/// Compiled task pattern.
///
/// Patterns are relative to the task's base directory and matched against
/// relative paths with forward slashes (e.g. `"styles/main.css"`). `*` does
/// not cross a `/`; `**` does.
#[derive(Clone)]
pub struct PatternMatcher {
    pattern: String,
    matcher: GlobMatcher,
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PatternMatcher").field(&self.pattern).finish()
    }
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            anyhow::bail!("empty glob pattern");
        }
        let normalised = trimmed.strip_prefix("./").unwrap_or(trimmed);

        let glob = GlobBuilder::new(normalised)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?;

        Ok(Self {
            pattern: normalised.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// `rel_path` must be relative to the base directory.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Leading directories of the pattern that contain no glob syntax.
    ///
    /// `"styles/**/*.css"` gives `styles`, `"*.test"` gives an empty path.
    pub fn literal_prefix(&self) -> PathBuf {
        let mut prefix = PathBuf::new();
        let mut parts = self.pattern.split('/').peekable();
        while let Some(part) = parts.next() {
            // The last segment names files, never a directory to descend into.
            if parts.peek().is_none() || part.contains(['*', '?', '[', '{']) {
                break;
            }
            prefix.push(part);
        }
        prefix
    }
}

/// Collect every file under `root` that `matcher` accepts, sorted.
///
/// Only the pattern's literal prefix is walked. A missing root yields an
/// empty list.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &PatternMatcher,
) -> Result<Vec<PathBuf>> {
    let start = root.join(matcher.literal_prefix());
    if !fs.is_dir(&start) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![start];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel) = relative(root, &path) {
                    if matcher.matches(&rel) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}
