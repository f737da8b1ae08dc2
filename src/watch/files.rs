// src/watch/files.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Flatten a `directory -> entry names` listing into full paths.
///
/// Directories are visited in the order given and entries in each directory
/// keep their order.
pub fn flatten_watched<I, D, N, E>(listing: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = (D, N)>,
    D: AsRef<Path>,
    N: IntoIterator<Item = E>,
    E: AsRef<Path>,
{
    let mut out = Vec::new();
    for (dir, names) in listing {
        let dir = dir.as_ref();
        out.extend(names.into_iter().map(|name| dir.join(name)));
    }
    out
}

/// Set of watched files grouped by directory.
#[derive(Debug, Clone, Default)]
pub struct WatchedFiles {
    dirs: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl WatchedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the file was not known yet.
    pub fn insert(&mut self, path: &Path) -> bool {
        let Some((dir, name)) = split(path) else {
            return false;
        };
        self.dirs.entry(dir).or_default().insert(name)
    }

    /// Returns `true` if the file was known.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some((dir, name)) = split(path) else {
            return false;
        };
        let Some(names) = self.dirs.get_mut(&dir) else {
            return false;
        };
        let removed = names.remove(&name);
        if names.is_empty() {
            self.dirs.remove(&dir);
        }
        removed
    }

    pub fn contains(&self, path: &Path) -> bool {
        split(path)
            .and_then(|(dir, name)| self.dirs.get(&dir).map(|names| names.contains(&name)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.dirs.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        flatten_watched(&self.dirs)
    }
}

impl<'a> FromIterator<&'a PathBuf> for WatchedFiles {
    fn from_iter<T: IntoIterator<Item = &'a PathBuf>>(iter: T) -> Self {
        let mut set = Self::new();
        for path in iter {
            set.insert(path);
        }
        set
    }
}

fn split(path: &Path) -> Option<(PathBuf, String)> {
    let dir = path.parent()?.to_path_buf();
    let name = path.file_name()?.to_string_lossy().into_owned();
    Some((dir, name))
}
